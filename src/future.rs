use crate::body::{RobotsTxtBody, copy_to_bytes};
use crate::compose::{Composition, compose, needs_ai_rules};
use crate::config::RobotsTxtConfig;
use crate::interceptor::{Captured, Interceptor};
use crate::rules::{RuleSource, fetch_or_empty};
use crate::sink::{ResponseAssembler, ResponseSink};
use bytes::{Buf, Bytes};
use http::Response;
use http_body::Body;
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::{debug, warn};

type FetchFuture = Pin<Box<dyn Future<Output = Bytes> + Send>>;

pin_project! {
    /// Future for robots.txt service responses.
    pub struct ResponseFuture<F, B> {
        #[pin]
        state: State<F, B>,
        config: Arc<RobotsTxtConfig>,
        source: Arc<dyn RuleSource>,
    }
}

pin_project! {
    #[project = StateProj]
    #[project_replace = StateProjReplace]
    enum State<F, B> {
        // Not a robots.txt request.
        Passthrough {
            #[pin]
            inner: F,
        },
        // Waiting for the backend response head.
        Intercepting {
            #[pin]
            inner: F,
        },
        // Feeding the backend body into the interceptor.
        Capturing {
            #[pin]
            body: B,
            interceptor: Interceptor<ResponseAssembler>,
        },
        // Waiting for the AI crawler rules.
        Fetching {
            fetch: FetchFuture,
            sink: ResponseAssembler,
            captured: Captured,
        },
        Done,
    }
}

impl<F, B> ResponseFuture<F, B> {
    pub(crate) fn passthrough(
        inner: F,
        config: Arc<RobotsTxtConfig>,
        source: Arc<dyn RuleSource>,
    ) -> Self {
        Self {
            state: State::Passthrough { inner },
            config,
            source,
        }
    }

    pub(crate) fn intercept(
        inner: F,
        config: Arc<RobotsTxtConfig>,
        source: Arc<dyn RuleSource>,
    ) -> Self {
        Self {
            state: State::Intercepting { inner },
            config,
            source,
        }
    }
}

impl<F, B, E> Future for ResponseFuture<F, B>
where
    F: Future<Output = Result<Response<B>, E>>,
    B: Body,
    B::Data: Buf,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Output = Result<Response<RobotsTxtBody<B>>, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        loop {
            let mut this = self.as_mut().project();

            match this.state.as_mut().project() {
                StateProj::Passthrough { inner } => {
                    let response = match inner.poll(cx) {
                        Poll::Pending => return Poll::Pending,
                        Poll::Ready(result) => result,
                    };
                    this.state.set(State::Done);
                    return Poll::Ready(response.map(|r| r.map(RobotsTxtBody::passthrough)));
                }

                StateProj::Intercepting { inner } => {
                    let response = match inner.poll(cx) {
                        Poll::Pending => return Poll::Pending,
                        Poll::Ready(Err(e)) => {
                            this.state.set(State::Done);
                            return Poll::Ready(Err(e));
                        }
                        Poll::Ready(Ok(response)) => response,
                    };

                    // Replay the backend head as if it had called write_header.
                    let (parts, body) = response.into_parts();
                    let status = parts.status;
                    let sink = ResponseAssembler::from_parts(parts);
                    let mut interceptor =
                        Interceptor::new(sink, this.config.preserve_last_modified);
                    interceptor.write_header(status);

                    this.state.set(State::Capturing { body, interceptor });
                }

                StateProj::Capturing { body, interceptor } => {
                    match body.poll_frame(cx) {
                        Poll::Pending => return Poll::Pending,
                        Poll::Ready(Some(Ok(frame))) => {
                            if let Ok(data) = frame.into_data() {
                                interceptor.write(&copy_to_bytes(data));
                            }
                            continue;
                        }
                        Poll::Ready(Some(Err(e))) => {
                            let e: Box<dyn std::error::Error + Send + Sync> = e.into();
                            warn!(error = %e, "backend body failed, composing with partial body");
                        }
                        Poll::Ready(None) => {}
                    }

                    let StateProjReplace::Capturing { interceptor, .. } =
                        this.state.as_mut().project_replace(State::Done)
                    else {
                        continue;
                    };
                    let (sink, captured) = interceptor.into_parts();

                    if needs_ai_rules(&this.config, &captured) {
                        let source = Arc::clone(this.source);
                        let fetch: FetchFuture =
                            Box::pin(async move { fetch_or_empty(source.as_ref()).await });
                        this.state.set(State::Fetching {
                            fetch,
                            sink,
                            captured,
                        });
                        continue;
                    }

                    return Poll::Ready(Ok(emit(&this.config, sink, &captured, b"")));
                }

                StateProj::Fetching { fetch, .. } => {
                    let ai_rules = match fetch.as_mut().poll(cx) {
                        Poll::Pending => return Poll::Pending,
                        Poll::Ready(ai_rules) => ai_rules,
                    };

                    let StateProjReplace::Fetching { sink, captured, .. } =
                        this.state.as_mut().project_replace(State::Done)
                    else {
                        continue;
                    };
                    return Poll::Ready(Ok(emit(&this.config, sink, &captured, &ai_rules)));
                }

                StateProj::Done => panic!("ResponseFuture polled after completion"),
            }
        }
    }
}

/// Composes the final body and writes it to the real sink in one go.
fn emit<B>(
    config: &RobotsTxtConfig,
    mut sink: ResponseAssembler,
    captured: &Captured,
    ai_rules: &[u8],
) -> Response<RobotsTxtBody<B>> {
    match compose(config, captured, ai_rules) {
        Composition::Suppressed => {
            debug!("backend answered 304, leaving body empty");
            sink.write_header(captured.effective_status);
        }
        Composition::Body(body) => {
            debug!(
                backend_status = %captured.backend_status,
                len = body.len(),
                "emitting composed robots.txt"
            );
            sink.write_header(captured.effective_status);
            sink.write(&body);
        }
    }

    sink.finish().map(RobotsTxtBody::rewritten)
}
