use crate::config::RobotsTxtConfig;
use crate::error::ConfigError;
use crate::rules::{self, RuleSource};
use crate::service::RobotsTxtService;
use std::fmt;
use std::sync::Arc;
use tower::Layer;

/// A Tower layer that rewrites robots.txt responses.
///
/// The layer is built once from a validated configuration and can then wrap
/// any number of services; all of them share the configuration and the AI
/// crawler rule source.
#[derive(Clone)]
pub struct RobotsTxtLayer {
    config: Arc<RobotsTxtConfig>,
    source: Arc<dyn RuleSource>,
}

impl RobotsTxtLayer {
    /// Creates a new layer.
    ///
    /// Fails if `config` has no content source.
    pub fn new(config: RobotsTxtConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let source = rules::from_config(&config);
        Ok(Self {
            config: Arc::new(config),
            source,
        })
    }

    /// Creates a new layer that takes the AI crawler rules from `source`.
    pub fn with_rule_source<R>(config: RobotsTxtConfig, source: R) -> Result<Self, ConfigError>
    where
        R: RuleSource + 'static,
    {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            source: Arc::new(source),
        })
    }

    /// Returns the configuration in use.
    pub fn config(&self) -> &RobotsTxtConfig {
        &self.config
    }
}

impl fmt::Debug for RobotsTxtLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RobotsTxtLayer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S> Layer<S> for RobotsTxtLayer {
    type Service = RobotsTxtService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RobotsTxtService::from_parts(inner, Arc::clone(&self.config), Arc::clone(&self.source))
    }
}
