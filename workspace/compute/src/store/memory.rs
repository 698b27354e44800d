use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{Keyed, Store};
use crate::error::{StoreError, StoreResult};

struct Records<T> {
    by_key: BTreeMap<String, T>,
    next_id: i32,
}

/// A [`Store`] kept in process memory.
///
/// Surrogate keys are assigned sequentially from 1. Every successful write is
/// counted so callers can assert how much a pass actually wrote. A read-only
/// store rejects all writes with [`StoreError::ReadOnly`].
pub struct MemoryStore<T> {
    records: Mutex<Records<T>>,
    read_only: bool,
    writes: AtomicUsize,
}

impl<T: Keyed> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Keyed> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Records {
                by_key: BTreeMap::new(),
                next_id: 1,
            }),
            read_only: false,
            writes: AtomicUsize::new(0),
        }
    }

    /// An empty store that refuses writes.
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Self::new()
        }
    }

    /// A writable store pre-filled with `entities`, assigning keys where
    /// missing. Seeding does not count as writes.
    pub fn with_records(entities: impl IntoIterator<Item = T>) -> Self {
        let store = Self::new();
        {
            let mut records = store.lock();
            for mut entity in entities {
                let id = match entity.surrogate_id() {
                    Some(id) => id,
                    None => {
                        let id = records.next_id;
                        entity.set_surrogate_id(id);
                        id
                    }
                };
                records.next_id = records.next_id.max(id + 1);
                records
                    .by_key
                    .insert(entity.business_key().to_string(), entity);
            }
        }
        store
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Number of successful inserts, updates and deletes.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.lock().by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Records<T>> {
        // A panic while holding the lock cannot leave the map half-written,
        // so a poisoned lock is still usable.
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.read_only {
            warn!("Write attempted on read-only {} store", T::KIND);
            return Err(StoreError::ReadOnly);
        }
        Ok(())
    }
}

#[async_trait]
impl<T: Keyed> Store<T> for MemoryStore<T> {
    async fn find_by_business_key(&self, key: &str) -> StoreResult<Option<T>> {
        Ok(self.lock().by_key.get(key).cloned())
    }

    async fn insert(&self, entity: &T) -> StoreResult<i32> {
        self.check_writable()?;
        let mut records = self.lock();
        let key = entity.business_key().to_string();
        if records.by_key.contains_key(&key) {
            return Err(StoreError::Duplicate(key));
        }
        let id = records.next_id;
        records.next_id += 1;
        let mut stored = entity.clone();
        stored.set_surrogate_id(id);
        records.by_key.insert(key.clone(), stored);
        self.writes.fetch_add(1, Ordering::SeqCst);
        debug!("Inserted {} {} with id {}", T::KIND, key, id);
        Ok(id)
    }

    async fn update(&self, entity: &T) -> StoreResult<u64> {
        self.check_writable()?;
        let Some(id) = entity.surrogate_id() else {
            return Ok(0);
        };
        let mut records = self.lock();
        let existing = records
            .by_key
            .iter()
            .find(|(_, stored)| stored.surrogate_id() == Some(id))
            .map(|(key, _)| key.clone());
        let Some(existing_key) = existing else {
            return Ok(0);
        };
        records.by_key.remove(&existing_key);
        records
            .by_key
            .insert(entity.business_key().to_string(), entity.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(1)
    }

    async fn delete(&self, id: i32) -> StoreResult<bool> {
        self.check_writable()?;
        let mut records = self.lock();
        let before = records.by_key.len();
        records
            .by_key
            .retain(|_, stored| stored.surrogate_id() != Some(id));
        let removed = records.by_key.len() < before;
        if removed {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(removed)
    }

    async fn list_all(&self) -> StoreResult<Vec<T>> {
        Ok(self.lock().by_key.values().cloned().collect())
    }
}
