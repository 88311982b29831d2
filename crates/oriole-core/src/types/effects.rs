use serde::{Deserialize, Serialize};

use crate::crypto::Hash;
use crate::error::CoreError;
use crate::serialize;
use crate::types::object::{ObjectId, ObjectRef, Owner, Version};

/// Whether the ledger executed the transaction successfully
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Success,
    Failure { reason: String },
}

/// The post-execution state of one changed object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectOut {
    /// The object survives at a new version with a new digest
    Written {
        version: Version,
        digest: Hash,
        owner: Owner,
    },
    /// The object no longer exists
    Deleted,
    /// The object was absorbed into another object
    Wrapped,
}

impl ObjectOut {
    /// The surviving reference for `id`, if this output is a write
    pub fn surviving_ref(&self, id: ObjectId) -> Option<ObjectRef> {
        match self {
            ObjectOut::Written {
                version, digest, ..
            } => Some(ObjectRef::new(id, *version, *digest)),
            ObjectOut::Deleted | ObjectOut::Wrapped => None,
        }
    }
}

/// One entry in the effects' ordered changed-object list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedObject {
    pub id: ObjectId,
    pub output: ObjectOut,
}

/// The ledger's authoritative record of what a transaction changed.
///
/// Version-tagged so future ledger releases can extend the schema without
/// breaking older clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionEffects {
    V1(TransactionEffectsV1),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEffectsV1 {
    pub status: ExecutionStatus,
    pub transaction_digest: Hash,
    /// Logical clock assigned by the ledger; strictly increases across
    /// causally related transactions
    pub lamport_version: u64,
    /// Ordered list of every object this transaction changed
    pub changed_objects: Vec<ChangedObject>,
    /// Index into `changed_objects` identifying the fee object's entry
    pub gas_object_index: Option<u32>,
}

impl TransactionEffects {
    /// Decode from the raw binary form returned by the ledger
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        serialize::from_bytes(bytes)
    }

    /// Encode to the raw binary wire form
    pub fn to_bytes(&self) -> Result<Vec<u8>, CoreError> {
        serialize::to_bytes(self)
    }

    pub fn status(&self) -> &ExecutionStatus {
        match self {
            TransactionEffects::V1(v1) => &v1.status,
        }
    }

    pub fn transaction_digest(&self) -> Hash {
        match self {
            TransactionEffects::V1(v1) => v1.transaction_digest,
        }
    }

    pub fn lamport_version(&self) -> u64 {
        match self {
            TransactionEffects::V1(v1) => v1.lamport_version,
        }
    }

    pub fn changed_objects(&self) -> &[ChangedObject] {
        match self {
            TransactionEffects::V1(v1) => &v1.changed_objects,
        }
    }

    /// The fee object's entry, located by the effects' gas index
    pub fn gas_object(&self) -> Option<&ChangedObject> {
        match self {
            TransactionEffects::V1(v1) => {
                let index = v1.gas_object_index?;
                v1.changed_objects.get(index as usize)
            }
        }
    }
}
