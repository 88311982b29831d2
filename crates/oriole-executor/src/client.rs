use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use oriole_core::{Hash, ObjectId, ObjectRef, PublicKey, Sig};

/// Errors reported by a ledger client implementation
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("Object not found: {0}")]
    ObjectNotFound(ObjectId),

    #[error("No fee object owned by {0}")]
    NoGasObject(PublicKey),

    #[error("Transaction rejected: {0}")]
    Rejected(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(Hash),

    #[error("Network error: {0}")]
    Network(String),
}

/// Response detail knobs for a submission
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExecuteOptions {
    /// Request the raw binary effects in the response
    pub show_raw_effects: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        ExecuteOptions {
            show_raw_effects: true,
        }
    }
}

/// A signed transaction submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub transaction_bytes: Vec<u8>,
    pub signature: Sig,
    pub options: ExecuteOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub digest: Hash,
    /// Binary-encoded effects; empty unless `show_raw_effects` was requested
    pub raw_effects: Vec<u8>,
}

/// The ledger node seen from the client side.
///
/// Transport, wire protocol, and retry policy all live behind this trait;
/// the executors only need object lookups, submission, and finality.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// The current exact reference for an object
    async fn get_object(&self, id: ObjectId) -> Result<ObjectRef, ClientError>;

    /// Pick a fee object owned by `owner`
    async fn select_gas(&self, owner: PublicKey) -> Result<ObjectRef, ClientError>;

    /// Submit a signed transaction
    async fn execute_transaction(
        &self,
        request: ExecuteRequest,
    ) -> Result<ExecuteResponse, ClientError>;

    /// Wait until the given transaction is final
    async fn wait_for_transaction(&self, digest: Hash) -> Result<(), ClientError>;
}
