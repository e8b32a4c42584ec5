use crate::error::SinkError;
use bytes::{Bytes, BytesMut};
use http::response::Parts;
use http::{HeaderMap, HeaderValue, Response, StatusCode, header};
use tokio::io::{AsyncRead, AsyncWrite};

/// A raw bidirectional connection handed over for protocol upgrades.
pub trait RawConnection: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> RawConnection for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// The outbound side of an HTTP response.
///
/// Headers are mutable until [`write_header`](Self::write_header) commits
/// the status. The pass-through capabilities are optional: sinks that do not
/// support them return a [`SinkError`] instead of silently doing nothing.
pub trait ResponseSink {
    /// Returns the response headers.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Commits the status line and the current headers.
    fn write_header(&mut self, status: StatusCode);

    /// Writes body bytes, committing `200 OK` first if nothing was committed.
    fn write(&mut self, data: &[u8]);

    /// Pushes any buffered bytes to the network.
    fn flush(&mut self) -> Result<(), SinkError> {
        Err(SinkError::FlushUnsupported(std::any::type_name::<Self>()))
    }

    /// Takes over the underlying connection, e.g. for a protocol upgrade.
    fn take_over(&mut self) -> Result<Box<dyn RawConnection>, SinkError> {
        Err(SinkError::TakeoverUnsupported(std::any::type_name::<Self>()))
    }
}

/// A sink that assembles an [`http::Response`] in memory.
///
/// `Content-Length` is derived from the body when the response is finished.
/// Neither flushing nor connection takeover is supported.
#[derive(Debug)]
pub struct ResponseAssembler {
    parts: Parts,
    committed: bool,
    body: BytesMut,
}

impl ResponseAssembler {
    /// Creates an assembler with no headers.
    pub fn new() -> Self {
        Self::from_parts(Response::new(()).into_parts().0)
    }

    /// Creates an assembler that starts from a backend response head.
    ///
    /// Headers, version and extensions are kept; the status is not
    /// committed until [`write_header`](ResponseSink::write_header).
    pub fn from_parts(parts: Parts) -> Self {
        Self {
            parts,
            committed: false,
            body: BytesMut::new(),
        }
    }

    /// The committed status, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.committed.then_some(self.parts.status)
    }

    /// Finishes the response, committing `200 OK` if nothing was committed.
    pub fn finish(mut self) -> Response<Bytes> {
        if !self.committed {
            self.write_header(StatusCode::OK);
        }
        if !self.body.is_empty() || self.parts.status != StatusCode::NOT_MODIFIED {
            self.parts
                .headers
                .insert(header::CONTENT_LENGTH, HeaderValue::from(self.body.len()));
        }
        Response::from_parts(self.parts, self.body.freeze())
    }
}

impl Default for ResponseAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseSink for ResponseAssembler {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.parts.headers
    }

    fn write_header(&mut self, status: StatusCode) {
        if !self.committed {
            self.parts.status = status;
            self.committed = true;
        }
    }

    fn write(&mut self, data: &[u8]) {
        if !self.committed {
            self.write_header(StatusCode::OK);
        }
        self.body.extend_from_slice(data);
    }
}
