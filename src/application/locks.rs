use crate::domain::wallet::Owner;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

const PRUNE_THRESHOLD: usize = 1024;

/// One async mutex per key, created on first use.
///
/// Idle slots are pruned once the map grows past a threshold; a slot is idle
/// when nobody but the map holds it.
pub struct KeyedLocks<K> {
    slots: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Hash + Eq + Ord + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, key: &K) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock().await;
        if slots.len() > PRUNE_THRESHOLD {
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
        }
        slots.entry(key.clone()).or_default().clone()
    }

    pub async fn lock(&self, key: K) -> OwnedMutexGuard<()> {
        self.slot(&key).await.lock_owned().await
    }

    /// Locks several keys in sorted order so two callers asking for the same
    /// set can never deadlock.
    pub async fn lock_all(&self, mut keys: Vec<K>) -> Vec<OwnedMutexGuard<()>> {
        keys.sort();
        keys.dedup();
        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            guards.push(self.lock(key).await);
        }
        guards
    }
}

/// Serialisation points shared by every service.
///
/// Schedule and ticket locks are always taken before wallet locks.
#[derive(Default)]
pub struct Locks {
    pub artists: KeyedLocks<Uuid>,
    pub ticket_types: KeyedLocks<Uuid>,
    pub wallets: KeyedLocks<Owner>,
}

impl Locks {
    pub fn new() -> Self {
        Self::default()
    }
}
