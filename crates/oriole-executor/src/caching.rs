use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use oriole_core::{Hash, InputObject, Sig, TransactionData, TransactionEffects};

use crate::cache::ObjectCache;
use crate::client::{ExecuteOptions, ExecuteRequest, ExecuteResponse, LedgerClient};
use crate::error::ExecutorError;

/// Resolves transaction inputs against a local object cache, falling back to
/// live ledger queries, and submits built bytes.
///
/// This layer never retries and never synthesizes a version: an input that
/// cannot be resolved from the cache or the ledger is a hard error.
pub struct CachingTransactionExecutor<C: LedgerClient> {
    client: Arc<C>,
    cache: ObjectCache,
    last_digest: RwLock<Option<Hash>>,
}

impl<C: LedgerClient> CachingTransactionExecutor<C> {
    pub fn new(client: Arc<C>) -> Self {
        CachingTransactionExecutor {
            client,
            cache: ObjectCache::new(),
            last_digest: RwLock::new(None),
        }
    }

    pub fn cache(&self) -> &ObjectCache {
        &self.cache
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// Resolve every pending input and the fee payment, then serialize.
    ///
    /// Resolution order per input: cache hit, else live query memoized into
    /// the cache. A missing fee payment is resolved through the ledger's
    /// owned-object selection for the sender.
    pub async fn build_transaction(
        &self,
        transaction: &mut TransactionData,
    ) -> Result<Vec<u8>, ExecutorError> {
        let sender = transaction.sender.ok_or(ExecutorError::MissingSender)?;
        if transaction.gas.budget.is_none() {
            return Err(ExecutorError::MissingGasBudget);
        }

        for input in transaction.inputs.iter_mut() {
            if let InputObject::Pending(id) = *input {
                let obj_ref = match self.cache.get_object(&id).await {
                    Some(cached) => cached,
                    None => {
                        debug!("Cache miss for {}, querying ledger", id);
                        let live = self
                            .client
                            .get_object(id)
                            .await
                            .map_err(ExecutorError::Resolution)?;
                        self.cache.insert_object(live).await;
                        live
                    }
                };
                *input = InputObject::Resolved(obj_ref);
            }
        }

        if transaction.gas.payment.is_none() {
            let gas_ref = self
                .client
                .select_gas(sender)
                .await
                .map_err(ExecutorError::Resolution)?;
            debug!("Selected fee object {} for {}", gas_ref, sender);
            transaction.gas.payment = Some(gas_ref);
        }

        let resolved = transaction
            .clone()
            .into_resolved()
            .map_err(ExecutorError::Serialization)?;
        resolved.to_bytes().map_err(ExecutorError::Serialization)
    }

    /// Submit signed bytes, requesting raw binary effects in the response.
    /// The response is returned unmodified; no retry at this layer.
    pub async fn execute_transaction(
        &self,
        signature: Sig,
        transaction_bytes: Vec<u8>,
    ) -> Result<ExecuteResponse, ExecutorError> {
        let request = ExecuteRequest {
            transaction_bytes,
            signature,
            options: ExecuteOptions {
                show_raw_effects: true,
            },
        };
        let response = self
            .client
            .execute_transaction(request)
            .await
            .map_err(ExecutorError::Submission)?;

        *self.last_digest.write().await = Some(response.digest);
        debug!("Submitted transaction {}", response.digest);
        Ok(response)
    }

    /// Await finality of the most recently submitted transaction.
    /// A no-op when nothing has been submitted yet.
    pub async fn wait_for_last_transaction(&self) -> Result<(), ExecutorError> {
        let digest = *self.last_digest.read().await;
        match digest {
            Some(digest) => self
                .client
                .wait_for_transaction(digest)
                .await
                .map_err(ExecutorError::Submission),
            None => Ok(()),
        }
    }

    /// Apply ledger effects to the cache
    pub async fn apply_effects(&self, effects: &TransactionEffects) {
        self.cache.apply_effects(effects).await;
    }

    /// Drop every cached object and slot
    pub async fn reset(&self) {
        self.cache.reset().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oriole_core::{KeyPair, Operation, TransactionSigner};

    use crate::memory::MemoryLedger;

    async fn setup() -> (Arc<MemoryLedger>, KeyPair, CachingTransactionExecutor<MemoryLedger>) {
        let ledger = Arc::new(MemoryLedger::new());
        let keys = KeyPair::generate();
        let executor = CachingTransactionExecutor::new(ledger.clone());
        (ledger, keys, executor)
    }

    #[tokio::test]
    async fn test_build_resolves_pending_inputs_and_memoizes() {
        let (ledger, keys, executor) = setup().await;
        let obj = ledger.register_object(keys.public).await;
        ledger.register_gas_object(keys.public).await;

        let mut tx = TransactionData::new();
        tx.sender = Some(keys.address());
        tx.gas.budget = Some(1_000);
        tx.gas.price = Some(1);
        let idx = tx.add_input(obj.id);
        tx.add_operation(Operation::MutateObject { input: idx });

        executor.build_transaction(&mut tx).await.unwrap();
        assert_eq!(tx.inputs[0], InputObject::Resolved(obj));
        assert_eq!(ledger.get_object_calls().await, 1);

        // Second build of the same input is served from the cache
        let mut tx2 = TransactionData::new();
        tx2.sender = Some(keys.address());
        tx2.gas.budget = Some(1_000);
        tx2.gas.price = Some(1);
        tx2.add_input(obj.id);
        executor.build_transaction(&mut tx2).await.unwrap();
        assert_eq!(ledger.get_object_calls().await, 1);
    }

    #[tokio::test]
    async fn test_build_fails_on_unknown_object() {
        let (ledger, keys, executor) = setup().await;
        ledger.register_gas_object(keys.public).await;

        let mut tx = TransactionData::new();
        tx.sender = Some(keys.address());
        tx.gas.budget = Some(1_000);
        tx.gas.price = Some(1);
        tx.add_input(oriole_core::ObjectId::new([0xEE; 32]));

        let err = executor.build_transaction(&mut tx).await.unwrap_err();
        assert!(matches!(err, ExecutorError::Resolution(_)));
    }

    #[tokio::test]
    async fn test_build_requires_sender() {
        let (_ledger, _keys, executor) = setup().await;
        let mut tx = TransactionData::new();
        tx.gas.budget = Some(1_000);
        tx.gas.price = Some(1);

        let err = executor.build_transaction(&mut tx).await.unwrap_err();
        assert!(matches!(err, ExecutorError::MissingSender));
    }

    #[tokio::test]
    async fn test_wait_for_last_transaction_noop_before_submission() {
        let (_ledger, _keys, executor) = setup().await;
        executor.wait_for_last_transaction().await.unwrap();
    }
}
