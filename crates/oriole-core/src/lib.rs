//! Oriole Core - Core types, cryptography, and serialization
//!
//! This crate provides the foundational types for the Oriole object-ledger
//! client: versioned object references, transactions, effects, and signing.

pub mod crypto;
pub mod error;
pub mod serialize;
pub mod types;

pub use crypto::{
    hash_blake3, sign, verify, Hash, KeyPair, PublicKey, SecretKey, Sig, TransactionSigner,
};
pub use error::CoreError;
pub use types::*;
