use crate::body::RobotsTxtBody;
use crate::config::RobotsTxtConfig;
use crate::error::ConfigError;
use crate::future::ResponseFuture;
use crate::rules::{self, RuleSource};
use bytes::Buf;
use http::{Request, Response};
use http_body::Body;
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Service;
use tracing::debug;

const ROBOTS_TXT_SUFFIX: &[u8] = b"/robots.txt";

/// A Tower service that rewrites robots.txt responses.
#[derive(Clone)]
pub struct RobotsTxtService<S> {
    inner: S,
    config: Arc<RobotsTxtConfig>,
    source: Arc<dyn RuleSource>,
}

impl<S> RobotsTxtService<S> {
    /// Creates a new service wrapping `inner`.
    ///
    /// Fails if `config` has no content source.
    pub fn new(inner: S, config: RobotsTxtConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let source = rules::from_config(&config);
        Ok(Self::from_parts(inner, Arc::new(config), source))
    }

    /// Creates a new service that takes the AI crawler rules from `source`.
    pub fn with_rule_source<R>(
        inner: S,
        config: RobotsTxtConfig,
        source: R,
    ) -> Result<Self, ConfigError>
    where
        R: RuleSource + 'static,
    {
        config.validate()?;
        Ok(Self::from_parts(inner, Arc::new(config), Arc::new(source)))
    }

    pub(crate) fn from_parts(
        inner: S,
        config: Arc<RobotsTxtConfig>,
        source: Arc<dyn RuleSource>,
    ) -> Self {
        Self {
            inner,
            config,
            source,
        }
    }

    /// Returns the configuration in use.
    pub fn config(&self) -> &RobotsTxtConfig {
        &self.config
    }

    /// Returns a reference to the inner service.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Returns a mutable reference to the inner service.
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consumes this service, returning the inner service.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: fmt::Debug> fmt::Debug for RobotsTxtService<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RobotsTxtService")
            .field("inner", &self.inner)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RobotsTxtService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    ResBody: Body,
    ResBody::Data: Buf,
    ResBody::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Response = Response<RobotsTxtBody<ResBody>>;
    type Error = S::Error;
    type Future = ResponseFuture<S::Future, ResBody>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let matched = is_robots_txt(req.uri().path());
        let config = Arc::clone(&self.config);
        let source = Arc::clone(&self.source);

        let inner = self.inner.call(req);

        if matched {
            debug!("intercepting robots.txt request");
            ResponseFuture::intercept(inner, config, source)
        } else {
            ResponseFuture::passthrough(inner, config, source)
        }
    }
}

/// Checks, case-insensitively, whether `path` ends in `/robots.txt`.
fn is_robots_txt(path: &str) -> bool {
    let path = path.as_bytes();
    path.len() >= ROBOTS_TXT_SUFFIX.len()
        && path[path.len() - ROBOTS_TXT_SUFFIX.len()..].eq_ignore_ascii_case(ROBOTS_TXT_SUFFIX)
}
