//! robots.txt rewriting middleware for Tower.
//!
//! This crate provides a Tower layer that intercepts responses for paths
//! ending in `/robots.txt` (case-insensitive) and replaces their body with a
//! composition of up to three sources.
//!
//! # Example
//!
//! ```ignore
//! use http_robots_txt::{RobotsTxtConfig, RobotsTxtLayer};
//! use tower::ServiceBuilder;
//!
//! let config = RobotsTxtConfig::new()
//!     .enable_ai_rules(true)
//!     .additional_rules("\nUser-agent: *\nDisallow: /private/\n");
//!
//! let service = ServiceBuilder::new()
//!     .layer(RobotsTxtLayer::new(config)?)
//!     .service(my_service);
//! ```
//!
//! # Composition Rules
//!
//! The body is built in this order:
//! - The backend body, unless the backend answered `404 Not Found` or sent
//!   it with a `Content-Encoding`
//! - The AI crawler rules fetched from [`DEFAULT_AI_RULES_URL`], when enabled
//! - The configured additional rules
//!
//! Non-empty overwrite rules replace all of the above. A `304 Not Modified`
//! backend response is passed on without a body.
//!
//! Failing to fetch the AI crawler rules is logged and contributes nothing.
//! The fetched rules are spliced in as raw bytes, without decoding.
//!
//! # Response Modifications
//!
//! For intercepted requests:
//! - `Content-Type` is set to `text/plain`
//! - `Content-Length` is set to the length of the composed body
//! - `Last-Modified` is removed unless configured otherwise
//! - `Content-Encoding` is removed; the composed body is always plain text
//! - A backend `404 Not Found` is turned into `200 OK`

#![deny(missing_docs)]

mod body;
mod compose;
mod config;
mod error;
mod future;
mod interceptor;
mod layer;
mod rules;
mod service;
mod sink;

pub use body::RobotsTxtBody;
pub use compose::{Composition, compose, needs_ai_rules};
pub use config::{DEFAULT_AI_RULES_URL, DEFAULT_FETCH_TIMEOUT_SECS, RobotsTxtConfig};
pub use error::{ConfigError, FetchError, SinkError};
pub use future::ResponseFuture;
pub use interceptor::{Captured, Interceptor};
pub use layer::RobotsTxtLayer;
pub use rules::{CachedRuleSource, HttpRuleSource, RuleSource, fetch_or_empty};
pub use service::RobotsTxtService;
pub use sink::{RawConnection, ResponseAssembler, ResponseSink};
