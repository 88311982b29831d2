use std::sync::Arc;

use tracing::{debug, warn};

use oriole_core::{Hash, TransactionData, TransactionEffects, TransactionSigner};

use crate::cache::{ObjectCache, SlotKey};
use crate::caching::CachingTransactionExecutor;
use crate::client::LedgerClient;
use crate::error::ExecutorError;
use crate::queue::SerialQueue;

/// Defaults merged into transactions that leave the fields unset.
/// Caller-provided values are never overridden.
#[derive(Debug, Clone, Copy)]
pub struct ExecutorConfig {
    pub default_gas_budget: u64,
    pub default_gas_price: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            default_gas_budget: 10_000_000,
            default_gas_price: 1_000,
        }
    }
}

/// What a successful execution hands back to the caller
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub digest: Hash,
    pub effects: TransactionEffects,
}

/// Serial transaction executor for one logical account.
///
/// Every call is funneled through a FIFO queue, so consecutive transactions
/// from this instance never race on shared objects. The fee object reference
/// reported by each success is remembered and injected into the next
/// transaction, avoiding both a live query and the hazard of two
/// transactions independently selecting the same fee object.
///
/// Any failure while building, signing, or submitting resets the whole
/// cache before the error is returned unwrapped; the next transaction then
/// starts from ledger truth. No retries happen at this layer.
///
/// Two instances share no state and run fully in parallel; use one instance
/// per account.
pub struct SerialTransactionExecutor<C: LedgerClient, S: TransactionSigner> {
    executor: CachingTransactionExecutor<C>,
    queue: SerialQueue,
    signer: S,
    config: ExecutorConfig,
}

impl<C: LedgerClient, S: TransactionSigner> SerialTransactionExecutor<C, S> {
    pub fn new(client: Arc<C>, signer: S) -> Self {
        Self::with_config(client, signer, ExecutorConfig::default())
    }

    pub fn with_config(client: Arc<C>, signer: S, config: ExecutorConfig) -> Self {
        SerialTransactionExecutor {
            executor: CachingTransactionExecutor::new(client),
            queue: SerialQueue::new(),
            signer,
            config,
        }
    }

    /// The underlying object cache (named slots included)
    pub fn cache(&self) -> &ObjectCache {
        self.executor.cache()
    }

    /// Build a transaction to its signable bytes, with the same default
    /// merging and fee-object injection as execution. Queued, so a build
    /// never observes a half-applied cache.
    pub async fn build_transaction(
        &self,
        mut transaction: TransactionData,
    ) -> Result<Vec<u8>, ExecutorError> {
        self.queue
            .run_task(async {
                self.prepare(&mut transaction).await;
                self.executor.build_transaction(&mut transaction).await
            })
            .await
    }

    /// Build, sign, submit, and apply effects, as one queued task.
    pub async fn execute_transaction(
        &self,
        transaction: TransactionData,
    ) -> Result<ExecutionResult, ExecutorError> {
        self.queue
            .run_task(async {
                match self.execute_inner(transaction).await {
                    Ok(result) => Ok(result),
                    Err(err) => {
                        // The cache's assumptions may no longer hold; drop
                        // everything and surface the original error.
                        warn!("Execution failed, resetting object cache: {}", err);
                        self.executor.reset().await;
                        Err(err)
                    }
                }
            })
            .await
    }

    /// Apply externally obtained effects to the cache
    pub async fn apply_effects(&self, effects: &TransactionEffects) {
        self.executor.apply_effects(effects).await;
    }

    /// Drop every cached object and slot
    pub async fn reset_cache(&self) {
        self.executor.reset().await;
    }

    /// Await finality of the most recently submitted transaction
    pub async fn wait_for_last_transaction(&self) -> Result<(), ExecutorError> {
        self.executor.wait_for_last_transaction().await
    }

    /// Merge defaults and the remembered fee object, never overriding
    /// caller-provided values.
    async fn prepare(&self, transaction: &mut TransactionData) {
        if transaction.sender.is_none() {
            transaction.sender = Some(self.signer.address());
        }
        if transaction.gas.budget.is_none() {
            transaction.gas.budget = Some(self.config.default_gas_budget);
        }
        if transaction.gas.price.is_none() {
            transaction.gas.price = Some(self.config.default_gas_price);
        }
        if transaction.gas.payment.is_none() {
            if let Some(gas_ref) = self.cache().get_slot(&SlotKey::Gas).await {
                debug!("Injecting cached fee object {}", gas_ref);
                transaction.gas.payment = Some(gas_ref);
            }
        }
    }

    async fn execute_inner(
        &self,
        mut transaction: TransactionData,
    ) -> Result<ExecutionResult, ExecutorError> {
        self.prepare(&mut transaction).await;

        let bytes = self.executor.build_transaction(&mut transaction).await?;
        let signature = self
            .signer
            .sign_transaction(&bytes)
            .map_err(ExecutorError::Signing)?;
        let response = self.executor.execute_transaction(signature, bytes).await?;

        let effects =
            TransactionEffects::from_bytes(&response.raw_effects).map_err(ExecutorError::Effects)?;

        self.update_gas_slot(&effects).await;
        self.executor.apply_effects(&effects).await;

        Ok(ExecutionResult {
            digest: response.digest,
            effects,
        })
    }

    /// Remember the surviving fee object, or clear the slot when the fee
    /// object did not survive this transaction.
    async fn update_gas_slot(&self, effects: &TransactionEffects) {
        let surviving = effects
            .gas_object()
            .and_then(|entry| entry.output.surviving_ref(entry.id));
        match surviving {
            Some(gas_ref) => self.cache().set_slot(SlotKey::Gas, gas_ref).await,
            None => self.cache().delete_slot(&SlotKey::Gas).await,
        }
    }
}
