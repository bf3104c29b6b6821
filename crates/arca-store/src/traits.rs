use arca_types::{ContentId, Link, ObjectType};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::pool::WorkerPool;

/// Availability of an object's bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStatus {
    /// `true` if a `get` would succeed now; `false` if a restore is needed.
    pub available: bool,
    /// Stored size in bytes, when known.
    pub size: Option<u64>,
}

impl StorageStatus {
    pub fn available(size: u64) -> Self {
        Self {
            available: true,
            size: Some(size),
        }
    }

    pub fn archived(size: u64) -> Self {
        Self {
            available: false,
            size: Some(size),
        }
    }
}

/// Retrieval speed (and cost) class for archive restores.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RetrievalSpeed {
    Expedited,
    #[default]
    Standard,
    Bulk,
}

/// Parameters for a cold-tier restore request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreOptions {
    /// How long the restored copy stays readable.
    pub days: u32,
    pub speed: RetrievalSpeed,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            days: 7,
            speed: RetrievalSpeed::Standard,
        }
    }
}

/// Storage backend for serialized objects.
///
/// Implementations must satisfy these invariants:
/// - `put` is idempotent: writing identical bytes twice is a no-op.
/// - `get` re-verifies the content digest and never returns unverified bytes.
/// - Payloads above the configured ceiling are rejected before any I/O.
/// - `delete` does not cascade; callers own reference safety.
/// - Writes scheduled by callers run on the backend's [`WorkerPool`].
pub trait StorageBackend: Send + Sync {
    /// Persist serialized object bytes under `id`.
    fn put(&self, id: &ContentId, object_type: ObjectType, data: &[u8]) -> StoreResult<()>;

    /// Report availability. `Err(NotFound)` if no tier holds the object.
    fn status(&self, link: &Link) -> StoreResult<StorageStatus>;

    /// Ask a cold tier to make the object readable. No-op on hot-only backends.
    fn restore(&self, link: &Link, options: &RestoreOptions) -> StoreResult<()>;

    /// Read and verify object bytes.
    fn get(&self, link: &Link) -> StoreResult<Vec<u8>>;

    /// Remove the object's bytes. Returns `true` if anything was removed.
    fn delete(&self, link: &Link) -> StoreResult<bool>;

    /// The bounded pool that executes this backend's writes.
    fn write_pool(&self) -> &WorkerPool;

    /// Returns `true` if any tier holds the bytes, readable or not.
    fn contains(&self, link: &Link) -> StoreResult<bool> {
        match self.status(link) {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Returns `true` if every tier that should hold the bytes does.
    ///
    /// Writers treat `false` as a repair and call `put` again, which fills
    /// in whichever copy is missing.
    fn is_fully_stored(&self, link: &Link) -> StoreResult<bool> {
        self.contains(link)
    }
}
