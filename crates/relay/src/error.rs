//! Error types for the relay service.

use thiserror::Error;

/// A message could not be handed to the bot.
///
/// Submissions are still acknowledged when this happens.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NotifyError {
    #[error("bot is not configured: {0} is missing")]
    NotConfigured(&'static str),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("invalid bot API url: {0}")]
    Endpoint(#[from] url::ParseError),
    #[error("bot API rejected {method}: {description}")]
    Rejected {
        method: &'static str,
        description: String,
    },
}

/// Invalid relay configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{key}={value:?} is not a valid number: {source}")]
    InvalidNumber {
        key: &'static str,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("{key}={value:?} is not a valid URL: {source}")]
    InvalidUrl {
        key: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },
}

/// Failures inside a request handler that map to `500`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RelayError {
    #[error("recent submissions log is unavailable")]
    StatePoisoned,
}
