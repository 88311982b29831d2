pub mod effects;
pub mod object;
pub mod transaction;

pub use effects::{
    ChangedObject, ExecutionStatus, ObjectOut, TransactionEffects, TransactionEffectsV1,
};
pub use object::{ObjectId, ObjectRef, Owner, Version};
pub use transaction::{GasData, InputObject, Operation, ResolvedGas, ResolvedTransaction, TransactionData};
