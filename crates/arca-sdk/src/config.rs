use std::fs;
use std::path::{Path, PathBuf};

use arca_crypto::DigestPair;
use arca_lock::LockConfig;
use arca_store::{ArchiveConfig, BackendConfig};
use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceResult};

/// Conventional file name for [`ArcaConfig::load`] and [`ArcaConfig::save`].
pub const CONFIG_FILE: &str = "arca.toml";

/// Top-level configuration for an [`ObjectService`](crate::ObjectService).
///
/// Every field has a default, so a TOML file only needs the keys it changes.
/// Durations are written as milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArcaConfig {
    /// Addressing digest tag.
    pub primary_digest: String,
    /// Collision-detection digest tag.
    pub secondary_digest: String,
    /// Hard ceiling on a single serialized object.
    pub max_payload_bytes: u64,
    pub storage: StorageConfig,
    pub pool: PoolConfig,
    pub lock: LockConfig,
    pub chunking: ChunkingConfig,
}

impl Default for ArcaConfig {
    fn default() -> Self {
        Self {
            primary_digest: "blake3".into(),
            secondary_digest: "sha256".into(),
            max_payload_bytes: 64 * 1024 * 1024, // 64 MiB
            storage: StorageConfig::default(),
            pool: PoolConfig::default(),
            lock: LockConfig::default(),
            chunking: ChunkingConfig::default(),
        }
    }
}

/// Where objects live.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Local hot tier and metadata journal directory.
    pub root: PathBuf,
    /// Cold tier mirrored on every write. `None` for local-only.
    pub archive: Option<ArchiveConfig>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(".arca"),
            archive: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub threads: usize,
    pub queue_depth: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            queue_depth: 64,
        }
    }
}

/// How [`ObjectService::write_chunked`](crate::ObjectService::write_chunked)
/// splits large content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    /// Most links in one list before another list level is added.
    pub max_list_fanout: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024 * 1024, // 1 MiB
            max_list_fanout: 1024,
        }
    }
}

impl ArcaConfig {
    /// Defaults rooted at `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            storage: StorageConfig {
                root: root.into(),
                archive: None,
            },
            ..Self::default()
        }
    }

    /// Read `dir/arca.toml`.
    pub fn load(dir: &Path) -> ServiceResult<Self> {
        let path = dir.join(CONFIG_FILE);
        let content = fs::read_to_string(&path)
            .map_err(|e| ServiceError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> ServiceResult<Self> {
        toml::from_str(content).map_err(|e| ServiceError::Config(e.to_string()))
    }

    /// Write `dir/arca.toml`.
    pub fn save(&self, dir: &Path) -> ServiceResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ServiceError::Config(e.to_string()))?;
        fs::create_dir_all(dir)?;
        fs::write(dir.join(CONFIG_FILE), content)?;
        Ok(())
    }

    /// Resolve the digest tags and check numeric bounds.
    ///
    /// An unknown digest tag fails here with an `Unimplemented` error.
    pub fn validate(&self) -> ServiceResult<DigestPair> {
        let digests = DigestPair::from_tags(&self.primary_digest, &self.secondary_digest)?;
        self.backend_config().validate()?;
        self.lock.validate()?;
        if self.chunking.chunk_size == 0 {
            return Err(ServiceError::Config("chunk_size must be positive".into()));
        }
        if self.chunking.max_list_fanout < 2 {
            return Err(ServiceError::Config("max_list_fanout must be at least 2".into()));
        }
        Ok(digests)
    }

    /// Limits handed to the storage backend.
    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            max_payload_bytes: self.max_payload_bytes,
            pool_threads: self.pool.threads,
            queue_depth: self.pool.queue_depth,
        }
    }
}
