use http::StatusCode;
use thiserror::Error;

/// Error returned when a [`RobotsTxtConfig`](crate::RobotsTxtConfig) cannot be installed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// None of the content sources is configured.
    #[error("set additionalRules, overwriteRules, or set enableAiRules to true")]
    NoContentSource,
}

/// Error returned by the pass-through capabilities of a [`ResponseSink`](crate::ResponseSink).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// The sink cannot flush buffered data to the network.
    #[error("{0} does not support flushing")]
    FlushUnsupported(&'static str),
    /// The sink cannot hand over its raw connection.
    #[error("{0} does not support connection takeover")]
    TakeoverUnsupported(&'static str),
}

/// Error returned when the remote AI crawler rules cannot be fetched.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never produced a response (connect failure, timeout, ...).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The remote answered with something other than `200 OK`.
    #[error("HTTP status code is {0}, expected 200")]
    Status(StatusCode),
}
