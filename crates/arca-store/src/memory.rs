use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use arca_crypto::digester_for_algorithm;
use arca_types::{ContentId, Link, ObjectType};

use crate::config::BackendConfig;
use crate::error::{StoreError, StoreResult};
use crate::pool::WorkerPool;
use crate::traits::{RestoreOptions, StorageBackend, StorageStatus};

/// In-memory, HashMap-based storage backend.
///
/// Intended for tests and embedding. Objects are held behind a `RwLock` and
/// cloned on read. Every `get` re-verifies the digest just like the disk
/// backends do.
pub struct MemoryBackend {
    objects: RwLock<HashMap<ContentId, (ObjectType, Vec<u8>)>>,
    config: BackendConfig,
    pool: WorkerPool,
    physical_writes: AtomicU64,
}

impl MemoryBackend {
    pub fn new() -> StoreResult<Self> {
        Self::with_config(BackendConfig::default())
    }

    pub fn with_config(config: BackendConfig) -> StoreResult<Self> {
        config.validate()?;
        let pool = WorkerPool::new("arca-memory", config.pool_threads, config.queue_depth)?;
        Ok(Self {
            objects: RwLock::new(HashMap::new()),
            config,
            pool,
            physical_writes: AtomicU64::new(0),
        })
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Number of `put` calls that actually inserted bytes.
    pub fn physical_writes(&self) -> u64 {
        self.physical_writes.load(Ordering::SeqCst)
    }

    /// Overwrite the stored bytes for `id` without re-hashing.
    ///
    /// Test hook for exercising integrity checks.
    pub fn corrupt(&self, id: &ContentId, data: Vec<u8>) -> bool {
        let mut map = self.objects.write().expect("lock poisoned");
        match map.get_mut(id) {
            Some(entry) => {
                entry.1 = data;
                true
            }
            None => false,
        }
    }
}

impl StorageBackend for MemoryBackend {
    fn put(&self, id: &ContentId, object_type: ObjectType, data: &[u8]) -> StoreResult<()> {
        self.config.check_size(data.len())?;
        let mut map = self.objects.write().expect("lock poisoned");
        if !map.contains_key(id) {
            map.insert(id.clone(), (object_type, data.to_vec()));
            self.physical_writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn status(&self, link: &Link) -> StoreResult<StorageStatus> {
        let map = self.objects.read().expect("lock poisoned");
        map.get(&link.id)
            .map(|(_, data)| StorageStatus::available(data.len() as u64))
            .ok_or_else(|| StoreError::NotFound(link.id.clone()))
    }

    fn restore(&self, _link: &Link, _options: &RestoreOptions) -> StoreResult<()> {
        Ok(())
    }

    fn get(&self, link: &Link) -> StoreResult<Vec<u8>> {
        let data = {
            let map = self.objects.read().expect("lock poisoned");
            map.get(&link.id)
                .map(|(_, data)| data.clone())
                .ok_or_else(|| StoreError::NotFound(link.id.clone()))?
        };
        digester_for_algorithm(link.id.algorithm())
            .verify(&link.id, &data)
            .map_err(|e| StoreError::from_digest(&link.id, e))?;
        Ok(data)
    }

    fn delete(&self, link: &Link) -> StoreResult<bool> {
        let mut map = self.objects.write().expect("lock poisoned");
        Ok(map.remove(&link.id).is_some())
    }

    fn write_pool(&self) -> &WorkerPool {
        &self.pool
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("object_count", &self.len())
            .field("physical_writes", &self.physical_writes())
            .finish()
    }
}
