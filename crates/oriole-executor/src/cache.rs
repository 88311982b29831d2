use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use oriole_core::{ObjectId, ObjectOut, ObjectRef, TransactionEffects};

/// Well-known cache slots, plus an open-ended extension namespace.
///
/// The fee object gets a dedicated variant because every transaction needs
/// one and reusing the cached reference is what keeps consecutive
/// transactions from racing on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SlotKey {
    /// The remembered fee-paying object
    Gas,
    /// Caller-defined slot for any other resource reused across transactions
    Custom(String),
}

#[derive(Debug, Default)]
struct CacheInner {
    /// Latest known reference per object id
    objects: HashMap<ObjectId, ObjectRef>,
    /// Named resource slots
    slots: HashMap<SlotKey, ObjectRef>,
    /// Highest lamport version observed via effects
    last_lamport: u64,
}

/// Local cache of object references, kept current by applying ledger effects.
///
/// The cache holds no cross-operation lock. Correctness depends on the
/// serial queue: only one queued task reads or mutates the cache at a time,
/// and a task's mutations are fully applied before the next task starts.
/// The internal `RwLock` only makes individual operations safe from `&self`.
///
/// There is no TTL. If objects of the tracked account are mutated by another
/// process, this cache diverges silently until a rejected submission forces
/// [`ObjectCache::reset`].
#[derive(Debug, Default)]
pub struct ObjectCache {
    inner: RwLock<CacheInner>,
}

impl ObjectCache {
    pub fn new() -> Self {
        ObjectCache::default()
    }

    /// Latest known reference for an object, if any
    pub async fn get_object(&self, id: &ObjectId) -> Option<ObjectRef> {
        self.inner.read().await.objects.get(id).copied()
    }

    /// Record a reference, never regressing an already-known version
    pub async fn insert_object(&self, obj_ref: ObjectRef) {
        let mut inner = self.inner.write().await;
        Self::upsert_monotonic(&mut inner.objects, obj_ref);
    }

    /// Read a named slot
    pub async fn get_slot(&self, key: &SlotKey) -> Option<ObjectRef> {
        self.inner.read().await.slots.get(key).copied()
    }

    /// Write a named slot
    pub async fn set_slot(&self, key: SlotKey, obj_ref: ObjectRef) {
        debug!("Cache slot {:?} set to {}", key, obj_ref);
        self.inner.write().await.slots.insert(key, obj_ref);
    }

    /// Clear a named slot
    pub async fn delete_slot(&self, key: &SlotKey) {
        debug!("Cache slot {:?} cleared", key);
        self.inner.write().await.slots.remove(key);
    }

    /// Apply a transaction's effects as a whole: upsert every surviving
    /// write, drop every deleted or wrapped object, and clear any slot left
    /// pointing at an object that no longer exists.
    pub async fn apply_effects(&self, effects: &TransactionEffects) {
        let mut inner = self.inner.write().await;

        let lamport = effects.lamport_version();
        if inner.last_lamport != 0 && lamport <= inner.last_lamport {
            // The ledger's logical clock must strictly increase across
            // successful transactions seen by one cache instance.
            warn!(
                "Non-monotonic lamport version: observed {} after {}",
                lamport, inner.last_lamport
            );
        } else {
            inner.last_lamport = lamport;
        }

        for changed in effects.changed_objects() {
            match changed.output.surviving_ref(changed.id) {
                Some(obj_ref) => {
                    Self::upsert_monotonic(&mut inner.objects, obj_ref);
                }
                None => {
                    inner.objects.remove(&changed.id);
                    inner.slots.retain(|_, slot_ref| slot_ref.id != changed.id);
                }
            }
        }

        debug!(
            "Applied effects of {} ({} changed objects, lamport {})",
            effects.transaction_digest(),
            effects.changed_objects().len(),
            lamport
        );
    }

    /// Drop every object entry and every slot unconditionally
    pub async fn reset(&self) {
        let mut inner = self.inner.write().await;
        inner.objects.clear();
        inner.slots.clear();
        inner.last_lamport = 0;
        debug!("Object cache reset");
    }

    /// Number of tracked objects (slots not included)
    pub async fn object_count(&self) -> usize {
        self.inner.read().await.objects.len()
    }

    /// True when no objects and no slots are cached
    pub async fn is_empty(&self) -> bool {
        let inner = self.inner.read().await;
        inner.objects.is_empty() && inner.slots.is_empty()
    }

    fn upsert_monotonic(objects: &mut HashMap<ObjectId, ObjectRef>, obj_ref: ObjectRef) {
        match objects.get(&obj_ref.id) {
            Some(existing) if existing.version >= obj_ref.version => {
                warn!(
                    "Refusing version regression for {}: cached {}, offered {}",
                    obj_ref.id, existing.version, obj_ref.version
                );
            }
            _ => {
                objects.insert(obj_ref.id, obj_ref);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oriole_core::{
        hash_blake3, ChangedObject, ExecutionStatus, Owner, TransactionEffectsV1, Version,
    };

    fn obj_ref(seed: u8, version: Version) -> ObjectRef {
        ObjectRef::new(
            ObjectId::new([seed; 32]),
            version,
            hash_blake3(&[seed, version as u8]),
        )
    }

    fn effects_with(changed: Vec<ChangedObject>, lamport: u64) -> TransactionEffects {
        TransactionEffects::V1(TransactionEffectsV1 {
            status: ExecutionStatus::Success,
            transaction_digest: hash_blake3(&[lamport as u8]),
            lamport_version: lamport,
            changed_objects: changed,
            gas_object_index: None,
        })
    }

    fn written(seed: u8, version: Version) -> ChangedObject {
        let r = obj_ref(seed, version);
        ChangedObject {
            id: r.id,
            output: ObjectOut::Written {
                version: r.version,
                digest: r.digest,
                owner: Owner::Shared,
            },
        }
    }

    fn deleted(seed: u8) -> ChangedObject {
        ChangedObject {
            id: ObjectId::new([seed; 32]),
            output: ObjectOut::Deleted,
        }
    }

    #[tokio::test]
    async fn test_slot_read_stability() {
        let cache = ObjectCache::new();
        let key = SlotKey::Custom("gasCoin".to_string());
        cache.set_slot(key.clone(), obj_ref(1, 2)).await;

        let first = cache.get_slot(&key).await;
        let second = cache.get_slot(&key).await;
        assert_eq!(first, second);
        assert_eq!(first, Some(obj_ref(1, 2)));
    }

    #[tokio::test]
    async fn test_monotonic_versions() {
        let cache = ObjectCache::new();
        cache.apply_effects(&effects_with(vec![written(1, 3)], 3)).await;
        cache.apply_effects(&effects_with(vec![written(1, 5)], 5)).await;
        assert_eq!(cache.get_object(&ObjectId::new([1u8; 32])).await.unwrap().version, 5);

        // A stale write must not regress the cached version
        cache.apply_effects(&effects_with(vec![written(1, 4)], 6)).await;
        assert_eq!(cache.get_object(&ObjectId::new([1u8; 32])).await.unwrap().version, 5);
    }

    #[tokio::test]
    async fn test_insert_object_ignores_older_version() {
        let cache = ObjectCache::new();
        cache.insert_object(obj_ref(1, 7)).await;
        cache.insert_object(obj_ref(1, 2)).await;
        assert_eq!(cache.get_object(&ObjectId::new([1u8; 32])).await.unwrap().version, 7);
    }

    #[tokio::test]
    async fn test_deleted_object_clears_entry_and_slot() {
        let cache = ObjectCache::new();
        let gas = obj_ref(2, 1);
        cache.insert_object(gas).await;
        cache.set_slot(SlotKey::Gas, gas).await;

        cache.apply_effects(&effects_with(vec![deleted(2)], 4)).await;
        assert!(cache.get_object(&gas.id).await.is_none());
        assert!(cache.get_slot(&SlotKey::Gas).await.is_none());
    }

    #[tokio::test]
    async fn test_reset_drops_everything() {
        let cache = ObjectCache::new();
        cache.insert_object(obj_ref(1, 1)).await;
        cache.set_slot(SlotKey::Gas, obj_ref(2, 1)).await;
        cache
            .set_slot(SlotKey::Custom("treasury".to_string()), obj_ref(3, 1))
            .await;

        cache.reset().await;
        assert!(cache.is_empty().await);

        // A lower lamport version right after reset is acceptable
        cache.apply_effects(&effects_with(vec![written(1, 1)], 1)).await;
        assert_eq!(cache.object_count().await, 1);
    }

    #[tokio::test]
    async fn test_delete_slot() {
        let cache = ObjectCache::new();
        let key = SlotKey::Custom("bank".to_string());
        cache.set_slot(key.clone(), obj_ref(5, 1)).await;
        cache.delete_slot(&key).await;
        assert!(cache.get_slot(&key).await.is_none());
    }
}
