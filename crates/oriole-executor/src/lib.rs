//! Oriole Executor - Serial transaction execution with an object-version cache
//!
//! Submitting transactions against an object-versioned ledger requires every
//! object reference to carry an exact version and digest; presenting a stale
//! reference gets the transaction rejected outright. This crate keeps
//! consecutive transactions from one account from racing on shared objects
//! (most importantly the fee object) by funneling them through a serial
//! queue, and keeps a local cache of object state current by applying the
//! ledger's own effects after every success.
//!
//! The layers, bottom up:
//!
//! - [`ObjectCache`]: known object references plus named resource slots.
//! - [`SerialQueue`]: single-consumer FIFO task runner; the sole concurrency
//!   control primitive.
//! - [`CachingTransactionExecutor`]: resolves unresolved inputs against the
//!   cache (falling back to live queries), submits built bytes.
//! - [`SerialTransactionExecutor`]: the façade that owns the signer, injects
//!   the remembered fee object, merges gas defaults, and resets the cache on
//!   failure.

pub mod cache;
pub mod caching;
pub mod client;
pub mod error;
pub mod memory;
pub mod queue;
pub mod serial;

pub use cache::{ObjectCache, SlotKey};
pub use caching::CachingTransactionExecutor;
pub use client::{ClientError, ExecuteOptions, ExecuteRequest, ExecuteResponse, LedgerClient};
pub use error::ExecutorError;
pub use memory::MemoryLedger;
pub use queue::SerialQueue;
pub use serial::{ExecutionResult, ExecutorConfig, SerialTransactionExecutor};
