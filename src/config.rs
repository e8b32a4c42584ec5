use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default location of the community maintained AI crawler block list.
pub const DEFAULT_AI_RULES_URL: &str =
    "https://raw.githubusercontent.com/ai-robots-txt/ai.robots.txt/refs/heads/main/robots.txt";

/// Default timeout for fetching the AI crawler rules.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 5;

/// Configuration for the robots.txt middleware.
///
/// Keys are camelCase so the struct can be deserialized straight from the
/// proxy's dynamic configuration. The original plugin keys `aiRobotsTxt` and
/// `lastModified` are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RobotsTxtConfig {
    /// Text appended verbatim to the composed body.
    pub additional_rules: String,

    /// When non-empty, replaces the whole composed body.
    pub overwrite_rules: String,

    /// Fetch the remote AI crawler rules and splice them into the body.
    #[serde(alias = "aiRobotsTxt")]
    pub enable_ai_rules: bool,

    /// Keep the backend `Last-Modified` header instead of stripping it.
    #[serde(alias = "lastModified")]
    pub preserve_last_modified: bool,

    /// Where the AI crawler rules are fetched from.
    pub ai_rules_url: String,

    /// Upper bound for a single fetch of the AI crawler rules.
    pub fetch_timeout_secs: u64,

    /// How long a fetched rule set is reused. Zero disables caching.
    pub cache_ttl_secs: u64,
}

impl Default for RobotsTxtConfig {
    fn default() -> Self {
        Self {
            additional_rules: String::new(),
            overwrite_rules: String::new(),
            enable_ai_rules: false,
            preserve_last_modified: false,
            ai_rules_url: DEFAULT_AI_RULES_URL.to_string(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            cache_ttl_secs: 0,
        }
    }
}

impl RobotsTxtConfig {
    /// Creates an empty configuration. It must be given at least one content
    /// source before it passes [`validate`](Self::validate).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the rules appended to the body.
    pub fn additional_rules(mut self, rules: impl Into<String>) -> Self {
        self.additional_rules = rules.into();
        self
    }

    /// Sets the rules that replace the body entirely.
    pub fn overwrite_rules(mut self, rules: impl Into<String>) -> Self {
        self.overwrite_rules = rules.into();
        self
    }

    /// Enables or disables the remote AI crawler rules.
    pub fn enable_ai_rules(mut self, enable: bool) -> Self {
        self.enable_ai_rules = enable;
        self
    }

    /// Controls whether the backend `Last-Modified` header survives.
    pub fn preserve_last_modified(mut self, preserve: bool) -> Self {
        self.preserve_last_modified = preserve;
        self
    }

    /// Overrides the AI crawler rules endpoint.
    pub fn ai_rules_url(mut self, url: impl Into<String>) -> Self {
        self.ai_rules_url = url.into();
        self
    }

    /// Sets the fetch timeout in seconds. Zero is raised to one second.
    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.fetch_timeout_secs = secs;
        self
    }

    /// Sets how many seconds fetched AI crawler rules are cached. Zero
    /// disables caching.
    pub fn cache_ttl_secs(mut self, secs: u64) -> Self {
        self.cache_ttl_secs = secs;
        self
    }

    /// Timeout for one fetch of the AI crawler rules. Never zero.
    pub fn fetch_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }

    /// Cache lifetime for fetched rules, if caching is enabled.
    pub fn cache_ttl_duration(&self) -> Option<Duration> {
        (self.cache_ttl_secs > 0).then(|| Duration::from_secs(self.cache_ttl_secs))
    }

    /// Checks that at least one content source is configured.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.additional_rules.is_empty()
            && self.overwrite_rules.is_empty()
            && !self.enable_ai_rules
        {
            return Err(ConfigError::NoContentSource);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_rejected() {
        let err = RobotsTxtConfig::new().validate().unwrap_err();
        assert_eq!(err, ConfigError::NoContentSource);
        assert_eq!(
            err.to_string(),
            "set additionalRules, overwriteRules, or set enableAiRules to true"
        );
    }

    #[test]
    fn test_any_single_source_is_enough() {
        assert!(RobotsTxtConfig::new().additional_rules("x").validate().is_ok());
        assert!(RobotsTxtConfig::new().overwrite_rules("x").validate().is_ok());
        assert!(RobotsTxtConfig::new().enable_ai_rules(true).validate().is_ok());
    }

    #[test]
    fn test_preserve_last_modified_alone_is_not_a_source() {
        let config = RobotsTxtConfig::new().preserve_last_modified(true);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_camel_case() {
        let config: RobotsTxtConfig = serde_json::from_str(
            r#"{"additionalRules": "User-agent: *\n", "enableAiRules": true, "preserveLastModified": true}"#,
        )
        .unwrap();

        assert_eq!(config.additional_rules, "User-agent: *\n");
        assert!(config.enable_ai_rules);
        assert!(config.preserve_last_modified);
        assert_eq!(config.ai_rules_url, DEFAULT_AI_RULES_URL);
        assert_eq!(config.fetch_timeout_secs, DEFAULT_FETCH_TIMEOUT_SECS);
        assert_eq!(config.cache_ttl_duration(), None);
    }

    #[test]
    fn test_deserialize_plugin_aliases() {
        let config: RobotsTxtConfig =
            serde_json::from_str(r#"{"aiRobotsTxt": true, "lastModified": true}"#).unwrap();

        assert!(config.enable_ai_rules);
        assert!(config.preserve_last_modified);
    }

    #[test]
    fn test_durations() {
        let config = RobotsTxtConfig::new()
            .fetch_timeout_secs(2)
            .cache_ttl_secs(3600);

        assert_eq!(config.fetch_timeout_secs, 2);
        assert_eq!(config.fetch_timeout_duration(), Duration::from_secs(2));
        assert_eq!(config.cache_ttl_duration(), Some(Duration::from_secs(3600)));
    }

    #[test]
    fn test_zero_durations() {
        let config = RobotsTxtConfig::new().fetch_timeout_secs(0).cache_ttl_secs(0);

        // A zero timeout would disable the bound entirely.
        assert_eq!(config.fetch_timeout_duration(), Duration::from_secs(1));
        assert_eq!(config.cache_ttl_duration(), None);
    }
}
