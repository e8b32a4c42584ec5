use crate::error::SinkError;
use crate::sink::{RawConnection, ResponseSink};
use bytes::{Bytes, BytesMut};
use http::{HeaderMap, HeaderValue, StatusCode, header};

/// Whether the header metadata has been finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HeaderState {
    /// Nothing has been written yet.
    NotCommitted,
    /// Headers were rewritten and the status captured.
    Committed {
        backend: StatusCode,
        effective: StatusCode,
    },
}

/// What the backend produced, as seen through the interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captured {
    /// The status the backend asked for.
    pub backend_status: StatusCode,
    /// The status that will be sent to the client.
    pub effective_status: StatusCode,
    /// Every body byte the backend wrote.
    pub body: Bytes,
    /// The backend body carried a `Content-Encoding`, so its bytes are not
    /// plain text and cannot be spliced.
    pub encoded: bool,
}

/// A sink that stands in for the real one while the backend runs.
///
/// Body writes are buffered instead of forwarded and the status is held back
/// so that the composed body can replace the backend's. Header rewrites are
/// applied directly to the wrapped sink's header map. Flushing and connection
/// takeover go straight to the wrapped sink.
#[derive(Debug)]
pub struct Interceptor<S> {
    sink: S,
    preserve_last_modified: bool,
    state: HeaderState,
    encoded: bool,
    body: BytesMut,
}

impl<S: ResponseSink> Interceptor<S> {
    /// Wraps `sink` for the duration of one request.
    pub fn new(sink: S, preserve_last_modified: bool) -> Self {
        Self {
            sink,
            preserve_last_modified,
            state: HeaderState::NotCommitted,
            encoded: false,
            body: BytesMut::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> HeaderState {
        self.state
    }

    /// The only transition out of [`HeaderState::NotCommitted`].
    fn commit(&mut self, status: StatusCode) -> (StatusCode, StatusCode) {
        if let HeaderState::Committed { backend, effective } = self.state {
            return (backend, effective);
        }

        let effective = if status == StatusCode::NOT_FOUND {
            StatusCode::OK
        } else {
            status
        };

        let headers = self.sink.headers_mut();
        if !self.preserve_last_modified {
            headers.remove(header::LAST_MODIFIED);
        }
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        // The composed body is always sent as identity.
        if let Some(encoding) = headers.remove(header::CONTENT_ENCODING) {
            self.encoded = !encoding.as_bytes().eq_ignore_ascii_case(b"identity");
        }
        // The real length is only known once the body has been composed.
        headers.remove(header::CONTENT_LENGTH);

        self.state = HeaderState::Committed {
            backend: status,
            effective,
        };
        (status, effective)
    }

    /// Releases the wrapped sink together with what was captured.
    ///
    /// A backend that never wrote anything counts as an implicit `200 OK`.
    pub fn into_parts(mut self) -> (S, Captured) {
        let (backend, effective) = self.commit(StatusCode::OK);

        let captured = Captured {
            backend_status: backend,
            effective_status: effective,
            body: self.body.freeze(),
            encoded: self.encoded,
        };
        (self.sink, captured)
    }
}

impl<S: ResponseSink> ResponseSink for Interceptor<S> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.sink.headers_mut()
    }

    fn write_header(&mut self, status: StatusCode) {
        self.commit(status);
    }

    fn write(&mut self, data: &[u8]) {
        self.commit(StatusCode::OK);
        self.body.extend_from_slice(data);
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.sink.flush()
    }

    fn take_over(&mut self) -> Result<Box<dyn RawConnection>, SinkError> {
        self.sink.take_over()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::ResponseAssembler;

    /// A sink that supports every capability and records their use.
    #[derive(Default)]
    struct UpgradableSink {
        headers: HeaderMap,
        flushes: usize,
    }

    impl ResponseSink for UpgradableSink {
        fn headers_mut(&mut self) -> &mut HeaderMap {
            &mut self.headers
        }

        fn write_header(&mut self, _status: StatusCode) {
            panic!("the interceptor must not commit the real status");
        }

        fn write(&mut self, _data: &[u8]) {
            panic!("the interceptor must not forward body bytes");
        }

        fn flush(&mut self) -> Result<(), SinkError> {
            self.flushes += 1;
            Ok(())
        }

        fn take_over(&mut self) -> Result<Box<dyn RawConnection>, SinkError> {
            let (conn, _peer) = tokio::io::duplex(64);
            Ok(Box::new(conn))
        }
    }

    fn backend_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("42"));
        headers.insert(
            header::LAST_MODIFIED,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        headers.insert("x-backend", HeaderValue::from_static("yes"));
        headers
    }

    fn backend_sink() -> ResponseAssembler {
        let mut response = http::Response::new(());
        *response.headers_mut() = backend_headers();
        ResponseAssembler::from_parts(response.into_parts().0)
    }

    #[test]
    fn test_commit_rewrites_headers() {
        let sink = backend_sink();
        let mut interceptor = Interceptor::new(sink, false);
        interceptor.write_header(StatusCode::OK);

        let headers = interceptor.headers_mut();
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "text/plain");
        assert!(headers.get(header::CONTENT_LENGTH).is_none());
        assert!(headers.get(header::LAST_MODIFIED).is_none());
        assert_eq!(headers.get("x-backend").unwrap(), "yes");
    }

    #[test]
    fn test_content_encoding_is_stripped() {
        let mut sink = backend_sink();
        sink.headers_mut()
            .insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        let mut interceptor = Interceptor::new(sink, false);
        interceptor.write_header(StatusCode::OK);
        interceptor.write(&[0x1f, 0x8b, 0x08, 0x00]);

        assert!(interceptor.headers_mut().get(header::CONTENT_ENCODING).is_none());
        let (_, captured) = interceptor.into_parts();
        assert!(captured.encoded);
        assert_eq!(captured.body, Bytes::from_static(&[0x1f, 0x8b, 0x08, 0x00]));
    }

    #[test]
    fn test_identity_encoding_is_plain() {
        let mut sink = backend_sink();
        sink.headers_mut()
            .insert(header::CONTENT_ENCODING, HeaderValue::from_static("identity"));
        let mut interceptor = Interceptor::new(sink, false);
        interceptor.write(b"User-agent: *\n");

        assert!(interceptor.headers_mut().get(header::CONTENT_ENCODING).is_none());
        let (_, captured) = interceptor.into_parts();
        assert!(!captured.encoded);
    }

    #[test]
    fn test_last_modified_preserved() {
        let sink = backend_sink();
        let mut interceptor = Interceptor::new(sink, true);
        interceptor.write_header(StatusCode::OK);

        assert!(interceptor.headers_mut().get(header::LAST_MODIFIED).is_some());
    }

    #[test]
    fn test_not_found_is_normalized() {
        let mut interceptor = Interceptor::new(ResponseAssembler::new(), false);
        interceptor.write_header(StatusCode::NOT_FOUND);
        interceptor.write(b"not found");

        assert_eq!(
            interceptor.state(),
            HeaderState::Committed {
                backend: StatusCode::NOT_FOUND,
                effective: StatusCode::OK,
            }
        );

        let (sink, captured) = interceptor.into_parts();
        assert_eq!(captured.backend_status, StatusCode::NOT_FOUND);
        assert_eq!(captured.effective_status, StatusCode::OK);
        assert_eq!(captured.body, Bytes::from("not found"));
        // Nothing reached the real sink.
        assert_eq!(sink.status(), None);
    }

    #[test]
    fn test_write_implies_ok() {
        let mut interceptor = Interceptor::new(ResponseAssembler::new(), false);
        assert_eq!(interceptor.state(), HeaderState::NotCommitted);

        interceptor.write(b"User-agent: *\n");
        interceptor.write_header(StatusCode::NOT_FOUND);
        interceptor.write(b"Allow: /\n");

        let (_, captured) = interceptor.into_parts();
        assert_eq!(captured.backend_status, StatusCode::OK);
        assert_eq!(captured.body, Bytes::from("User-agent: *\nAllow: /\n"));
    }

    #[test]
    fn test_silent_backend_counts_as_ok() {
        let interceptor = Interceptor::new(ResponseAssembler::new(), false);
        let (mut sink, captured) = interceptor.into_parts();

        assert_eq!(captured.effective_status, StatusCode::OK);
        assert!(captured.body.is_empty());
        assert_eq!(
            sink.headers_mut().get(header::CONTENT_TYPE).unwrap(),
            "text/plain"
        );
    }

    #[test]
    fn test_capabilities_pass_through() {
        let mut interceptor = Interceptor::new(UpgradableSink::default(), false);
        interceptor.write(b"buffered");

        interceptor.flush().unwrap();
        interceptor.flush().unwrap();
        assert!(interceptor.take_over().is_ok());

        let (sink, _) = interceptor.into_parts();
        assert_eq!(sink.flushes, 2);
    }

    #[test]
    fn test_missing_capabilities_are_reported() {
        let mut interceptor = Interceptor::new(ResponseAssembler::new(), false);
        assert!(matches!(
            interceptor.flush(),
            Err(SinkError::FlushUnsupported(_))
        ));
        assert!(matches!(
            interceptor.take_over(),
            Err(SinkError::TakeoverUnsupported(_))
        ));
    }
}
