use crate::config::RobotsTxtConfig;
use crate::error::FetchError;
use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A source of AI crawler rules.
#[async_trait]
pub trait RuleSource: Send + Sync {
    /// Fetches the rule text. Called at most once per request.
    ///
    /// The bytes are spliced into the body as they are, without decoding.
    async fn fetch(&self) -> Result<Bytes, FetchError>;
}

/// Fetches rules with a single bounded HTTP GET.
#[derive(Debug, Clone)]
pub struct HttpRuleSource {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpRuleSource {
    /// Creates a source for `url` with a per-request timeout.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), url, timeout)
    }

    /// Creates a source that shares an existing client.
    pub fn with_client(client: reqwest::Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }

    /// The endpoint this source fetches from.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RuleSource for HttpRuleSource {
    async fn fetch(&self) -> Result<Bytes, FetchError> {
        debug!(url = %self.url, "fetching AI crawler rules");
        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status));
        }

        Ok(response.bytes().await?)
    }
}

/// Reuses the last successful fetch of an inner source for a fixed time.
///
/// Failures are never cached, so the next request tries again.
pub struct CachedRuleSource<R> {
    inner: R,
    cache: Cache<(), Bytes>,
}

impl<R: RuleSource> CachedRuleSource<R> {
    /// Wraps `inner`, keeping fetched rules for `ttl`.
    pub fn new(inner: R, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Cache::builder().time_to_live(ttl).max_capacity(1).build(),
        }
    }
}

#[async_trait]
impl<R: RuleSource> RuleSource for CachedRuleSource<R> {
    async fn fetch(&self) -> Result<Bytes, FetchError> {
        if let Some(rules) = self.cache.get(&()).await {
            return Ok(rules);
        }

        let rules = self.inner.fetch().await?;
        self.cache.insert((), rules.clone()).await;
        Ok(rules)
    }
}

/// Builds the rule source described by `config`.
pub fn from_config(config: &RobotsTxtConfig) -> Arc<dyn RuleSource> {
    let source = HttpRuleSource::new(&config.ai_rules_url, config.fetch_timeout_duration());
    match config.cache_ttl_duration() {
        Some(ttl) => Arc::new(CachedRuleSource::new(source, ttl)),
        None => Arc::new(source),
    }
}

/// Fetches from `source`, turning any failure into an empty contribution.
pub async fn fetch_or_empty(source: &dyn RuleSource) -> Bytes {
    match source.fetch().await {
        Ok(rules) => rules,
        Err(e) => {
            warn!(error = %e, "unable to fetch AI crawler rules");
            Bytes::new()
        }
    }
}
