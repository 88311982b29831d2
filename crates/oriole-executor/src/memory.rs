use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use oriole_core::{
    hash_blake3, serialize, verify, ChangedObject, ExecutionStatus, Hash, ObjectId, ObjectOut,
    ObjectRef, Operation, Owner, PublicKey, ResolvedTransaction, TransactionEffects,
    TransactionEffectsV1, Version,
};

use crate::client::{ClientError, ExecuteRequest, ExecuteResponse, LedgerClient};

/// One live object on the in-memory ledger
#[derive(Debug, Clone, Copy)]
struct LedgerObject {
    version: Version,
    digest: Hash,
    owner: PublicKey,
    /// Eligible for fee-payment selection
    gas: bool,
}

#[derive(Debug, Default)]
struct LedgerInner {
    objects: BTreeMap<ObjectId, LedgerObject>,
    /// Global logical clock; every execution advances past it
    lamport: u64,
    finalized: HashSet<Hash>,
    /// Digests in execution order, for ordering assertions in tests
    executed: Vec<Hash>,
    fail_next: Option<String>,
    get_object_calls: u64,
    select_gas_calls: u64,
    next_id: u64,
}

/// An in-memory ledger implementing [`LedgerClient`], for local development
/// and tests.
///
/// It enforces the property the whole pipeline is built around: any
/// transaction presenting an object reference whose version or digest does
/// not exactly match current state is rejected outright.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    inner: RwLock<LedgerInner>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        MemoryLedger::default()
    }

    /// Create a fresh owned object at version 1 and return its reference
    pub async fn register_object(&self, owner: PublicKey) -> ObjectRef {
        self.register(owner, false).await
    }

    /// Create a fresh owned object eligible for fee-payment selection
    pub async fn register_gas_object(&self, owner: PublicKey) -> ObjectRef {
        self.register(owner, true).await
    }

    async fn register(&self, owner: PublicKey, gas: bool) -> ObjectRef {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let mut id_bytes = [0u8; 32];
        id_bytes[..8].copy_from_slice(&inner.next_id.to_be_bytes());
        let id = ObjectId::new(id_bytes);

        let version: Version = 1;
        let digest = Self::object_digest(id, version, Hash::ZERO);
        inner.objects.insert(
            id,
            LedgerObject {
                version,
                digest,
                owner,
                gas,
            },
        );
        ObjectRef::new(id, version, digest)
    }

    /// Make the next `execute_transaction` call fail with `reason`
    pub async fn fail_next_execution(&self, reason: &str) {
        self.inner.write().await.fail_next = Some(reason.to_string());
    }

    /// Bump an object's version out from under any client, as an external
    /// actor sharing the account would
    pub async fn mutate_externally(&self, id: ObjectId) -> Option<ObjectRef> {
        let mut inner = self.inner.write().await;
        inner.lamport += 1;
        let lamport = inner.lamport;
        let object = inner.objects.get_mut(&id)?;
        object.version = lamport.max(object.version + 1);
        object.digest = Self::object_digest(id, object.version, hash_blake3(b"external"));
        Some(ObjectRef::new(id, object.version, object.digest))
    }

    pub async fn get_object_calls(&self) -> u64 {
        self.inner.read().await.get_object_calls
    }

    pub async fn select_gas_calls(&self) -> u64 {
        self.inner.read().await.select_gas_calls
    }

    /// Digests in the order transactions were executed
    pub async fn executed_digests(&self) -> Vec<Hash> {
        self.inner.read().await.executed.clone()
    }

    fn object_digest(id: ObjectId, version: Version, tx_digest: Hash) -> Hash {
        let mut data = Vec::with_capacity(72);
        data.extend_from_slice(id.as_bytes());
        data.extend_from_slice(&version.to_be_bytes());
        data.extend_from_slice(tx_digest.as_bytes());
        hash_blake3(&data)
    }

    fn check_exact(inner: &LedgerInner, obj_ref: &ObjectRef) -> Result<(), ClientError> {
        let current = inner
            .objects
            .get(&obj_ref.id)
            .ok_or(ClientError::ObjectNotFound(obj_ref.id))?;
        if current.version != obj_ref.version || current.digest != obj_ref.digest {
            return Err(ClientError::Rejected(format!(
                "stale object reference for {}: presented version {}, current {}",
                obj_ref.id, obj_ref.version, current.version
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    async fn get_object(&self, id: ObjectId) -> Result<ObjectRef, ClientError> {
        let mut inner = self.inner.write().await;
        inner.get_object_calls += 1;
        let object = inner
            .objects
            .get(&id)
            .ok_or(ClientError::ObjectNotFound(id))?;
        Ok(ObjectRef::new(id, object.version, object.digest))
    }

    async fn select_gas(&self, owner: PublicKey) -> Result<ObjectRef, ClientError> {
        let mut inner = self.inner.write().await;
        inner.select_gas_calls += 1;
        inner
            .objects
            .iter()
            .find(|(_, object)| object.gas && object.owner == owner)
            .map(|(id, object)| ObjectRef::new(*id, object.version, object.digest))
            .ok_or(ClientError::NoGasObject(owner))
    }

    async fn execute_transaction(
        &self,
        request: ExecuteRequest,
    ) -> Result<ExecuteResponse, ClientError> {
        let mut inner = self.inner.write().await;

        if let Some(reason) = inner.fail_next.take() {
            return Err(ClientError::Rejected(reason));
        }

        let tx: ResolvedTransaction = serialize::from_bytes(&request.transaction_bytes)
            .map_err(|e| ClientError::Rejected(format!("undecodable transaction: {}", e)))?;

        verify(&tx.sender, &request.transaction_bytes, &request.signature)
            .map_err(|_| ClientError::Rejected("invalid signature".to_string()))?;

        // Every presented reference must match current state exactly, and
        // no object may appear twice
        Self::check_exact(&inner, &tx.gas.payment)?;
        let mut seen = HashSet::new();
        seen.insert(tx.gas.payment.id);
        for input in &tx.inputs {
            Self::check_exact(&inner, input)?;
            if !seen.insert(input.id) {
                return Err(ClientError::Rejected(format!(
                    "duplicate object reference {}",
                    input.id
                )));
            }
        }
        for input in &tx.inputs {
            let object = &inner.objects[&input.id];
            if object.owner != tx.sender {
                return Err(ClientError::Rejected(format!(
                    "object {} not owned by sender",
                    input.id
                )));
            }
        }
        if inner.objects[&tx.gas.payment.id].owner != tx.sender {
            return Err(ClientError::Rejected(format!(
                "fee object {} not owned by sender",
                tx.gas.payment.id
            )));
        }

        // Work out the outcome per input: written unless an operation
        // deletes or transfers it
        let mut outcomes: Vec<(ObjectId, Option<PublicKey>)> = tx
            .inputs
            .iter()
            .map(|input| (input.id, Some(tx.sender)))
            .collect();
        let mut gas_survives = true;

        for op in &tx.operations {
            match op {
                Operation::TransferObject { input, recipient } => {
                    let slot = outcomes.get_mut(*input as usize).ok_or_else(|| {
                        ClientError::Rejected(format!("operation references input {}", input))
                    })?;
                    slot.1 = Some(*recipient);
                }
                Operation::MutateObject { input } => {
                    if *input as usize >= outcomes.len() {
                        return Err(ClientError::Rejected(format!(
                            "operation references input {}",
                            input
                        )));
                    }
                }
                Operation::DeleteObject { input } => {
                    let slot = outcomes.get_mut(*input as usize).ok_or_else(|| {
                        ClientError::Rejected(format!("operation references input {}", input))
                    })?;
                    slot.1 = None;
                }
                Operation::ConsumeGas => {
                    gas_survives = false;
                }
            }
        }

        // Lamport assignment: strictly after every touched version and
        // every previously assigned value
        let touched_max = tx
            .inputs
            .iter()
            .map(|r| r.version)
            .chain(std::iter::once(tx.gas.payment.version))
            .max()
            .unwrap_or(0);
        let lamport = inner.lamport.max(touched_max) + 1;
        inner.lamport = lamport;

        let tx_digest = hash_blake3(&request.transaction_bytes);
        let mut changed_objects = Vec::with_capacity(outcomes.len() + 1);

        for (id, new_owner) in outcomes {
            match new_owner {
                Some(owner) => {
                    let digest = Self::object_digest(id, lamport, tx_digest);
                    let object = inner.objects.get_mut(&id).expect("checked above");
                    object.version = lamport;
                    object.digest = digest;
                    object.owner = owner;
                    changed_objects.push(ChangedObject {
                        id,
                        output: ObjectOut::Written {
                            version: lamport,
                            digest,
                            owner: Owner::Address(owner),
                        },
                    });
                }
                None => {
                    inner.objects.remove(&id);
                    changed_objects.push(ChangedObject {
                        id,
                        output: ObjectOut::Deleted,
                    });
                }
            }
        }

        let gas_id = tx.gas.payment.id;
        if gas_survives {
            let digest = Self::object_digest(gas_id, lamport, tx_digest);
            let object = inner.objects.get_mut(&gas_id).expect("checked above");
            object.version = lamport;
            object.digest = digest;
            changed_objects.push(ChangedObject {
                id: gas_id,
                output: ObjectOut::Written {
                    version: lamport,
                    digest,
                    owner: Owner::Address(tx.sender),
                },
            });
        } else {
            inner.objects.remove(&gas_id);
            changed_objects.push(ChangedObject {
                id: gas_id,
                output: ObjectOut::Deleted,
            });
        }
        let gas_object_index = Some((changed_objects.len() - 1) as u32);

        let effects = TransactionEffects::V1(TransactionEffectsV1 {
            status: ExecutionStatus::Success,
            transaction_digest: tx_digest,
            lamport_version: lamport,
            changed_objects,
            gas_object_index,
        });

        let raw_effects = if request.options.show_raw_effects {
            serialize::to_bytes(&effects)
                .map_err(|e| ClientError::Network(format!("effects encoding: {}", e)))?
        } else {
            Vec::new()
        };

        inner.finalized.insert(tx_digest);
        inner.executed.push(tx_digest);
        debug!("Executed transaction {} at lamport {}", tx_digest, lamport);

        Ok(ExecuteResponse {
            digest: tx_digest,
            raw_effects,
        })
    }

    async fn wait_for_transaction(&self, digest: Hash) -> Result<(), ClientError> {
        let inner = self.inner.read().await;
        if inner.finalized.contains(&digest) {
            Ok(())
        } else {
            Err(ClientError::TransactionNotFound(digest))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oriole_core::{KeyPair, ResolvedGas, TransactionSigner};

    use crate::client::ExecuteOptions;

    fn signed_request(keys: &KeyPair, tx: &ResolvedTransaction) -> ExecuteRequest {
        let transaction_bytes = tx.to_bytes().unwrap();
        let signature = keys.sign_transaction(&transaction_bytes).unwrap();
        ExecuteRequest {
            transaction_bytes,
            signature,
            options: ExecuteOptions::default(),
        }
    }

    fn transfer_tx(
        keys: &KeyPair,
        gas: ObjectRef,
        input: ObjectRef,
        recipient: PublicKey,
    ) -> ResolvedTransaction {
        ResolvedTransaction {
            sender: keys.public,
            gas: ResolvedGas {
                payment: gas,
                budget: 1_000,
                price: 1,
            },
            inputs: vec![input],
            operations: vec![Operation::TransferObject {
                input: 0,
                recipient,
            }],
        }
    }

    #[tokio::test]
    async fn test_execute_bumps_versions_to_lamport() {
        let ledger = MemoryLedger::new();
        let keys = KeyPair::generate();
        let gas = ledger.register_gas_object(keys.public).await;
        let obj = ledger.register_object(keys.public).await;

        let tx = transfer_tx(&keys, gas, obj, KeyPair::generate().public);
        let response = ledger
            .execute_transaction(signed_request(&keys, &tx))
            .await
            .unwrap();

        let effects = TransactionEffects::from_bytes(&response.raw_effects).unwrap();
        assert_eq!(effects.lamport_version(), 2);
        let gas_entry = effects.gas_object().unwrap();
        assert_eq!(gas_entry.id, gas.id);
        let new_gas = gas_entry.output.surviving_ref(gas.id).unwrap();
        assert_eq!(new_gas.version, 2);
        assert_ne!(new_gas.digest, gas.digest);

        ledger.wait_for_transaction(response.digest).await.unwrap();
    }

    #[tokio::test]
    async fn test_stale_reference_rejected() {
        let ledger = MemoryLedger::new();
        let keys = KeyPair::generate();
        let gas = ledger.register_gas_object(keys.public).await;
        let obj = ledger.register_object(keys.public).await;

        let tx = transfer_tx(&keys, gas, obj, keys.public);
        ledger
            .execute_transaction(signed_request(&keys, &tx))
            .await
            .unwrap();

        // Same references again: both are now stale
        let replay = transfer_tx(&keys, gas, obj, keys.public);
        let err = ledger
            .execute_transaction(signed_request(&keys, &replay))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_invalid_signature_rejected() {
        let ledger = MemoryLedger::new();
        let keys = KeyPair::generate();
        let intruder = KeyPair::generate();
        let gas = ledger.register_gas_object(keys.public).await;
        let obj = ledger.register_object(keys.public).await;

        let tx = transfer_tx(&keys, gas, obj, keys.public);
        let err = ledger
            .execute_transaction(signed_request(&intruder, &tx))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_consume_gas_deletes_fee_object() {
        let ledger = MemoryLedger::new();
        let keys = KeyPair::generate();
        let gas = ledger.register_gas_object(keys.public).await;

        let tx = ResolvedTransaction {
            sender: keys.public,
            gas: ResolvedGas {
                payment: gas,
                budget: 1_000,
                price: 1,
            },
            inputs: vec![],
            operations: vec![Operation::ConsumeGas],
        };
        let response = ledger
            .execute_transaction(signed_request(&keys, &tx))
            .await
            .unwrap();

        let effects = TransactionEffects::from_bytes(&response.raw_effects).unwrap();
        let gas_entry = effects.gas_object().unwrap();
        assert_eq!(gas_entry.output, ObjectOut::Deleted);
        assert!(matches!(
            ledger.get_object(gas.id).await,
            Err(ClientError::ObjectNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let ledger = MemoryLedger::new();
        let keys = KeyPair::generate();
        let gas = ledger.register_gas_object(keys.public).await;
        ledger.fail_next_execution("insufficient fee").await;

        let tx = ResolvedTransaction {
            sender: keys.public,
            gas: ResolvedGas {
                payment: gas,
                budget: 1,
                price: 1,
            },
            inputs: vec![],
            operations: vec![],
        };
        let err = ledger
            .execute_transaction(signed_request(&keys, &tx))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Rejected(_)));

        // The failure is one-shot
        ledger
            .execute_transaction(signed_request(&keys, &tx))
            .await
            .unwrap();
    }
}
