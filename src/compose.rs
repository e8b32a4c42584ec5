use crate::config::RobotsTxtConfig;
use crate::interceptor::Captured;
use bytes::{Bytes, BytesMut};
use http::StatusCode;

/// The outcome of composing a robots.txt response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Composition {
    /// The client's cached copy is still valid; no body is sent.
    Suppressed,
    /// The final body.
    Body(Bytes),
}

/// Whether composing `captured` under `config` uses the AI crawler rules.
///
/// Only then should they be fetched.
pub fn needs_ai_rules(config: &RobotsTxtConfig, captured: &Captured) -> bool {
    captured.effective_status != StatusCode::NOT_MODIFIED
        && config.overwrite_rules.is_empty()
        && config.enable_ai_rules
}

/// Builds the final body.
///
/// Sources are concatenated in a fixed order: backend body (unless the
/// backend answered 404 or sent it content-encoded), AI crawler rules,
/// additional rules. Non-empty overwrite rules replace all of them.
pub fn compose(config: &RobotsTxtConfig, captured: &Captured, ai_rules: &[u8]) -> Composition {
    if captured.effective_status == StatusCode::NOT_MODIFIED {
        return Composition::Suppressed;
    }

    if !config.overwrite_rules.is_empty() {
        return Composition::Body(Bytes::copy_from_slice(config.overwrite_rules.as_bytes()));
    }

    let mut body = BytesMut::new();
    if captured.backend_status != StatusCode::NOT_FOUND && !captured.encoded {
        body.extend_from_slice(&captured.body);
    }
    if config.enable_ai_rules {
        body.extend_from_slice(ai_rules);
    }
    body.extend_from_slice(config.additional_rules.as_bytes());

    Composition::Body(body.freeze())
}
