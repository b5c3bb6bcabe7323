//! Error types for the query engine.

use scout_client::ClientError;
use thiserror::Error;

/// Convenience alias for engine results.
pub type QueryResult<T> = Result<T, QueryError>;

/// Failures surfaced by cache, pagination, and mutation flows.
#[derive(Debug, Error)]
pub enum QueryError {
    /// An underlying API call failed; caches hold their last-known-good data.
    #[error(transparent)]
    Client(#[from] ClientError),
    /// Filter params could not be encoded into a canonical query key.
    #[error("query key for '{resource}' could not be encoded")]
    Key {
        /// Resource family whose key failed to encode.
        resource: &'static str,
        /// Underlying serialization failure.
        #[source]
        source: serde_json::Error,
    },
}

impl QueryError {
    /// The underlying client error, when this failure came off the wire.
    #[must_use]
    pub const fn as_client(&self) -> Option<&ClientError> {
        match self {
            Self::Client(err) => Some(err),
            Self::Key { .. } => None,
        }
    }
}
