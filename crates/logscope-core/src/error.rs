//! Error types for logscope-core.
//!
//! [`Error`] covers everything the builder itself can reject. [`TransportError`]
//! belongs to the [`SearchClient`](crate::client::SearchClient) seam and is
//! handed back from [`LogSearch::execute`](crate::LogSearch::execute) exactly
//! as the client produced it.

/// Errors raised while constructing a search.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A start or end input could not be read as a timestamp.
    #[error("invalid time input {input:?}: {reason}")]
    Parse { input: String, reason: String },

    /// The configured time zone is not a known IANA zone name.
    #[error("unknown time zone {0:?}")]
    UnknownTimeZone(String),
}

impl Error {
    pub(crate) fn parse(input: &str, reason: impl Into<String>) -> Self {
        Error::Parse {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failures reported by a [`SearchClient`](crate::client::SearchClient).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("search cluster unreachable: {0}")]
    Connection(String),

    #[error("search cluster returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("search request timed out")]
    Timeout,

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
