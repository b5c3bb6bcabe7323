//! Error taxonomy for the Scout HTTP client.

use reqwest::StatusCode;
use thiserror::Error;

/// Convenience alias for client call results.
pub type ClientResult<T> = Result<T, ClientError>;

/// Failure classes for one API call.
///
/// Timeouts surface as [`ClientError::Transport`]; a 2xx response with an
/// empty payload is deliberately its own class so callers can tell "the
/// server said nothing" apart from "the wire broke".
#[derive(Debug, Error)]
pub enum ClientError {
    /// The client could not be constructed from its configuration.
    #[error("invalid client configuration: {message}")]
    Config {
        /// What was wrong with the configuration.
        message: String,
    },
    /// The request never produced a usable response (connect, TLS, timeout).
    #[error("request to {path} failed in transit")]
    Transport {
        /// Endpoint path the call targeted.
        path: String,
        /// Underlying transport failure.
        #[source]
        source: reqwest::Error,
    },
    /// The server answered with a non-success status.
    #[error("request to {path} failed with status {status}: {message}")]
    Api {
        /// Endpoint path the call targeted.
        path: String,
        /// HTTP status returned.
        status: StatusCode,
        /// Message recovered from the error envelope, or the raw body.
        message: String,
    },
    /// A success status arrived with no payload where one was promised.
    #[error("no data returned from {path}")]
    EmptyBody {
        /// Endpoint path the call targeted.
        path: String,
    },
    /// The payload arrived but did not match the expected shape.
    #[error("response from {path} could not be decoded")]
    Decode {
        /// Endpoint path the call targeted.
        path: String,
        /// Underlying decode failure.
        #[source]
        source: serde_json::Error,
    },
}

impl ClientError {
    /// Whether the failure was a per-call timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport { source, .. } if source.is_timeout())
    }

    /// HTTP status, when the server produced one.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
