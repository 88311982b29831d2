use thiserror::Error;

use oriole_core::CoreError;

use crate::client::ClientError;

/// Failures surfaced by the execution pipeline.
///
/// No variant wraps further than its direct cause and nothing here retries:
/// retry and backoff policy belongs to the caller.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Object lookup failed, in the cache fallback path or a live query
    #[error("object resolution failed: {0}")]
    Resolution(ClientError),

    /// The ledger rejected the transaction or the submission itself failed.
    /// The façade resets its cache when this happens, since the cache's
    /// assumptions may no longer hold.
    #[error("transaction submission failed: {0}")]
    Submission(ClientError),

    /// Signing failed before any submission was attempted
    #[error("transaction signing failed: {0}")]
    Signing(CoreError),

    /// The transaction names no sender and none was injected
    #[error("transaction has no sender")]
    MissingSender,

    /// The transaction carries no gas budget and no default was merged
    #[error("transaction has no gas budget")]
    MissingGasBudget,

    /// The transaction encoding could not be produced
    #[error("transaction serialization failed: {0}")]
    Serialization(CoreError),

    /// The ledger's raw effects could not be decoded
    #[error("effects decoding failed: {0}")]
    Effects(CoreError),
}

/// Classify a client error for callers working below the executors
impl From<ClientError> for ExecutorError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::ObjectNotFound(_) | ClientError::NoGasObject(_) => {
                ExecutorError::Resolution(err)
            }
            _ => ExecutorError::Submission(err),
        }
    }
}
