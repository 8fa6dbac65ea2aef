use std::time::Duration;

use thiserror::Error;

/// Startup configuration failure. Fatal, never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("failed to read env file: {0}")]
    EnvFile(#[from] dotenvy::Error),

    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Failure reported by the query collaborator.
///
/// Keeps the store's own message so operators can diagnose the failure
/// from the API response or the logs.
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    #[error("query failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("query timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Response(String),
}

impl QueryError {
    /// Stable category string, used in API error bodies and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::Timeout(_) => "timeout",
            Self::Transport(_) => "transport",
            Self::Response(_) => "response",
        }
    }
}

/// Pareto threshold outside (0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("threshold must be within (0, 100], got {0}")]
pub struct InvalidThreshold(pub f64);

pub type QueryResult<T> = std::result::Result<T, QueryError>;
