use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::archive::StorageClass;
use crate::error::{StoreError, StoreResult};

/// Limits and pool sizing shared by every backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Hard ceiling on a single serialized object.
    pub max_payload_bytes: u64,
    /// Worker threads in the write pool.
    pub pool_threads: usize,
    /// Jobs the write queue holds before callers run work themselves.
    pub queue_depth: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: 64 * 1024 * 1024, // 64 MiB
            pool_threads: 4,
            queue_depth: 64,
        }
    }
}

impl BackendConfig {
    pub fn validate(&self) -> StoreResult<()> {
        if self.max_payload_bytes == 0 {
            return Err(StoreError::InvalidConfig("max_payload_bytes must be positive".into()));
        }
        if self.pool_threads == 0 || self.queue_depth == 0 {
            return Err(StoreError::InvalidConfig(
                "pool_threads and queue_depth must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Reject payloads above the ceiling.
    pub fn check_size(&self, len: usize) -> StoreResult<()> {
        let size = len as u64;
        if size > self.max_payload_bytes {
            return Err(StoreError::PayloadTooLarge {
                size,
                limit: self.max_payload_bytes,
            });
        }
        Ok(())
    }
}

/// Configuration for the directory-backed archive tier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveConfig {
    pub root: PathBuf,
    /// Storage class new objects are archived under.
    #[serde(default)]
    pub storage_class: StorageClass,
    /// Time until an expedited restore completes.
    #[serde(default = "default_expedited", with = "arca_types::duration_ms")]
    pub expedited_delay: Duration,
    #[serde(default = "default_standard", with = "arca_types::duration_ms")]
    pub standard_delay: Duration,
    #[serde(default = "default_bulk", with = "arca_types::duration_ms")]
    pub bulk_delay: Duration,
    /// zstd level for archived payloads.
    #[serde(default = "default_compression_level")]
    pub compression_level: i32,
}

fn default_expedited() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_standard() -> Duration {
    Duration::from_secs(5 * 60 * 60)
}

fn default_bulk() -> Duration {
    Duration::from_secs(12 * 60 * 60)
}

fn default_compression_level() -> i32 {
    3
}

impl ArchiveConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            storage_class: StorageClass::default(),
            expedited_delay: default_expedited(),
            standard_delay: default_standard(),
            bulk_delay: default_bulk(),
            compression_level: default_compression_level(),
        }
    }

    /// Archive under `class`.
    pub fn with_class(mut self, class: StorageClass) -> Self {
        self.storage_class = class;
        self
    }

    /// Make every restore complete immediately.
    pub fn with_instant_restores(mut self) -> Self {
        self.expedited_delay = Duration::ZERO;
        self.standard_delay = Duration::ZERO;
        self.bulk_delay = Duration::ZERO;
        self
    }
}
