use serde::{Deserialize, Serialize};

use crate::crypto::{hash_blake3, Hash, PublicKey};
use crate::error::CoreError;
use crate::serialize;
use crate::types::object::{ObjectId, ObjectRef};

/// Operations that can be included in a transaction.
///
/// Object inputs are addressed by index into the transaction's input list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Transfer an input object to another account
    TransferObject { input: u32, recipient: PublicKey },
    /// Mutate an input object in place
    MutateObject { input: u32 },
    /// Delete an input object
    DeleteObject { input: u32 },
    /// Consume the fee object entirely (e.g. merge it away)
    ConsumeGas,
}

/// An object input that may still lack its exact version and digest.
///
/// Callers usually only know the id of the objects they want to touch; the
/// executor fills in the rest from its cache or a live ledger query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputObject {
    /// Id only; version and digest still to be resolved
    Pending(ObjectId),
    /// Fully specified reference
    Resolved(ObjectRef),
}

impl InputObject {
    pub fn id(&self) -> ObjectId {
        match self {
            InputObject::Pending(id) => *id,
            InputObject::Resolved(obj_ref) => obj_ref.id,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, InputObject::Pending(_))
    }
}

/// Fee payment fields, all optional until build time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GasData {
    /// The fee object to consume; resolved at build time if unset
    pub payment: Option<ObjectRef>,
    /// Maximum fee units this transaction may consume
    pub budget: Option<u64>,
    /// Fee units per unit of work
    pub price: Option<u64>,
}

/// A transaction as the caller hands it over: sender, fee fields, and object
/// inputs may all still be unset or unresolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TransactionData {
    pub sender: Option<PublicKey>,
    pub gas: GasData,
    pub inputs: Vec<InputObject>,
    pub operations: Vec<Operation>,
}

impl TransactionData {
    pub fn new() -> Self {
        TransactionData::default()
    }

    /// Add an input by id, leaving version and digest for resolution.
    /// Returns the input index for use in operations.
    pub fn add_input(&mut self, id: ObjectId) -> u32 {
        self.inputs.push(InputObject::Pending(id));
        (self.inputs.len() - 1) as u32
    }

    /// Add a fully specified input reference
    pub fn add_input_ref(&mut self, obj_ref: ObjectRef) -> u32 {
        self.inputs.push(InputObject::Resolved(obj_ref));
        (self.inputs.len() - 1) as u32
    }

    pub fn add_operation(&mut self, op: Operation) {
        self.operations.push(op);
    }

    /// Convert to the resolved wire form. Every input must already be
    /// resolved and every gas field set; nothing is synthesized here.
    pub fn into_resolved(self) -> Result<ResolvedTransaction, CoreError> {
        let sender = self
            .sender
            .ok_or_else(|| CoreError::UnresolvedInput("sender".to_string()))?;
        let payment = self
            .gas
            .payment
            .ok_or_else(|| CoreError::UnresolvedInput("gas payment".to_string()))?;
        let budget = self
            .gas
            .budget
            .ok_or_else(|| CoreError::UnresolvedInput("gas budget".to_string()))?;
        let price = self
            .gas
            .price
            .ok_or_else(|| CoreError::UnresolvedInput("gas price".to_string()))?;

        let mut inputs = Vec::with_capacity(self.inputs.len());
        for input in self.inputs {
            match input {
                InputObject::Resolved(obj_ref) => inputs.push(obj_ref),
                InputObject::Pending(id) => {
                    return Err(CoreError::UnresolvedInput(id.to_hex()));
                }
            }
        }

        Ok(ResolvedTransaction {
            sender,
            gas: ResolvedGas {
                payment,
                budget,
                price,
            },
            inputs,
            operations: self.operations,
        })
    }
}

/// Fee payment fields with nothing left optional
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedGas {
    pub payment: ObjectRef,
    pub budget: u64,
    pub price: u64,
}

/// The wire form of a transaction: every object reference exact, every fee
/// field set. This is what gets serialized, signed, and submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTransaction {
    pub sender: PublicKey,
    pub gas: ResolvedGas,
    pub inputs: Vec<ObjectRef>,
    pub operations: Vec<Operation>,
}

impl ResolvedTransaction {
    /// Serialize to canonical bincode bytes (the bytes that get signed)
    pub fn to_bytes(&self) -> Result<Vec<u8>, CoreError> {
        serialize::to_bytes(self)
    }

    /// Deserialize from canonical bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        serialize::from_bytes(bytes)
    }

    /// Compute the transaction digest over the canonical bytes
    pub fn digest(&self) -> Result<Hash, CoreError> {
        Ok(hash_blake3(&self.to_bytes()?))
    }
}
