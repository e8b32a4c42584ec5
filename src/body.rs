use bytes::{Buf, Bytes, BytesMut};
use http_body::{Body, Frame, SizeHint};
use pin_project_lite::pin_project;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

pin_project! {
    /// A response body that was either rewritten or left untouched.
    ///
    /// Requests that do not target robots.txt keep the backend body as is.
    /// Rewritten bodies are emitted as a single data frame.
    #[project = RobotsTxtBodyProj]
    #[allow(missing_docs)]
    pub enum RobotsTxtBody<B> {
        /// Composed body, `None` once it has been yielded.
        Rewritten {
            data: Option<Bytes>,
        },
        /// Backend body passed through unchanged.
        Passthrough {
            #[pin]
            inner: B,
        },
    }
}

impl<B> RobotsTxtBody<B> {
    /// Creates a body holding the composed robots.txt content.
    pub fn rewritten(data: Bytes) -> Self {
        Self::Rewritten {
            data: (!data.is_empty()).then_some(data),
        }
    }

    /// Creates a passthrough body.
    pub fn passthrough(inner: B) -> Self {
        Self::Passthrough { inner }
    }
}

impl<B> Body for RobotsTxtBody<B>
where
    B: Body,
    B::Data: Buf,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.project() {
            RobotsTxtBodyProj::Rewritten { data } => {
                Poll::Ready(data.take().map(|data| Ok(Frame::data(data))))
            }
            RobotsTxtBodyProj::Passthrough { inner } => match inner.poll_frame(cx) {
                Poll::Pending => Poll::Pending,
                Poll::Ready(None) => Poll::Ready(None),
                Poll::Ready(Some(Ok(frame))) => {
                    Poll::Ready(Some(Ok(frame.map_data(copy_to_bytes))))
                }
                Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(io::Error::other(e.into())))),
            },
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            RobotsTxtBody::Rewritten { data } => data.is_none(),
            RobotsTxtBody::Passthrough { inner } => inner.is_end_stream(),
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            RobotsTxtBody::Rewritten { data } => {
                SizeHint::with_exact(data.as_ref().map_or(0, |data| data.len() as u64))
            }
            RobotsTxtBody::Passthrough { inner } => inner.size_hint(),
        }
    }
}

/// Copies every remaining chunk of `data` into one contiguous buffer.
pub(crate) fn copy_to_bytes<D: Buf>(mut data: D) -> Bytes {
    let mut bytes = BytesMut::with_capacity(data.remaining());
    while data.has_remaining() {
        let chunk = data.chunk();
        let len = chunk.len();
        bytes.extend_from_slice(chunk);
        data.advance(len);
    }
    bytes.freeze()
}
