use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::{Hash, PublicKey};
use crate::error::CoreError;

/// Monotonically increasing per-object version counter
pub type Version = u64;

/// Unique 32-byte object identifier, stable across versions
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct ObjectId(pub [u8; 32]);

impl ObjectId {
    pub fn new(data: [u8; 32]) -> Self {
        ObjectId(data)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() != 32 {
            return None;
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(slice);
        Some(ObjectId(bytes))
    }

    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let bytes = hex::decode(s)?;
        Self::from_slice(&bytes).ok_or(CoreError::InvalidObjectId)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Exact identification of one specific state of one object.
///
/// The ledger rejects transactions that present a reference whose version or
/// digest no longer matches current state, so a stale `ObjectRef` is never
/// silently tolerated downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub id: ObjectId,
    pub version: Version,
    pub digest: Hash,
}

impl ObjectRef {
    pub fn new(id: ObjectId, version: Version, digest: Hash) -> Self {
        ObjectRef {
            id,
            version,
            digest,
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}

/// Ownership of an object at a given version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Owner {
    /// Owned by a single account
    Address(PublicKey),
    /// Shared, mutable by anyone
    Shared,
    /// Frozen, mutable by no one
    Immutable,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash_blake3;

    #[test]
    fn test_object_id_hex_roundtrip() {
        let id = ObjectId::new([7u8; 32]);
        let recovered = ObjectId::from_hex(&id.to_hex()).unwrap();
        assert_eq!(id, recovered);
    }

    #[test]
    fn test_object_id_rejects_bad_length() {
        assert!(ObjectId::from_slice(&[1u8; 16]).is_none());
        assert!(ObjectId::from_hex("abcd").is_err());
    }

    #[test]
    fn test_object_ref_equality_is_exact() {
        let id = ObjectId::new([1u8; 32]);
        let digest = hash_blake3(b"state-v1");
        let a = ObjectRef::new(id, 1, digest);
        let b = ObjectRef::new(id, 2, digest);
        assert_ne!(a, b);
        assert_eq!(a, ObjectRef::new(id, 1, digest));
    }
}
