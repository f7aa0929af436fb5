//! Error types for gitgate-rpc.

use std::time::Duration;

/// Result type alias using [`GatewayError`].
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Errors from registering methods and loading gateway configuration.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("method name cannot be empty")]
    EmptyMethod,

    #[error("Handler already registered for method: {0}")]
    AlreadyRegistered(String),

    /// A schema that can never validate anything.
    #[error("invalid schema for {method}: {message}")]
    InvalidSchema { method: String, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("config serialization error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),
}

/// Rejections from the [`RateLimiter`](crate::RateLimiter).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    #[error("Rate limit exceeded for {0}")]
    Exceeded(String),

    #[error("{key} timed out after {}ms", .after.as_millis())]
    Timeout { key: String, after: Duration },
}

/// Parameter validation failures.
///
/// Messages are part of the wire contract and reach the UI verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Expected at least {expected} parameters, got {actual}")]
    TooFewParameters { expected: usize, actual: usize },

    #[error("Parameter {0} is required")]
    MissingParameter(usize),

    #[error("{0} is required")]
    MissingProperty(String),

    #[error("Parameter {path}: expected {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Parameter {path}: {message}")]
    Constraint { path: String, message: String },
}
