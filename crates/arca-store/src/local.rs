use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use arca_crypto::digester_for_algorithm;
use arca_types::{ContentId, Link, ObjectType};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::BackendConfig;
use crate::error::{StoreError, StoreResult};
use crate::pool::WorkerPool;
use crate::traits::{RestoreOptions, StorageBackend, StorageStatus};

/// Hot-tier backend storing one file per object on local disk.
///
/// Layout under the root directory:
///
/// ```text
/// objects/<algorithm>/<first two hex chars>/<remaining hex chars>
/// tmp/                                    staging area for atomic writes
/// ```
///
/// Files are written to `tmp/`, synced, and renamed into place, so a reader
/// never observes a partially written object.
pub struct LocalBackend {
    root: PathBuf,
    config: BackendConfig,
    pool: WorkerPool,
}

impl LocalBackend {
    /// Open (or create) a local store at `root`.
    pub fn open(root: impl Into<PathBuf>, config: BackendConfig) -> StoreResult<Self> {
        config.validate()?;
        let root = root.into();
        fs::create_dir_all(root.join("objects"))?;
        fs::create_dir_all(root.join("tmp"))?;
        let pool = WorkerPool::new("arca-local", config.pool_threads, config.queue_depth)?;
        info!(root = %root.display(), "local backend opened");
        Ok(Self { root, config, pool })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Path of the file holding `id`.
    pub fn object_path(&self, id: &ContentId) -> PathBuf {
        let hex = id.to_hex();
        let (fanout, rest) = hex.split_at(hex.len().min(2));
        self.root
            .join("objects")
            .join(id.algorithm().name())
            .join(fanout)
            .join(rest)
    }

    /// Read the stored bytes and verify them against `id`.
    pub fn read_verified(&self, id: &ContentId) -> StoreResult<Vec<u8>> {
        reject_null(id)?;
        let path = self.object_path(id);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        digester_for_algorithm(id.algorithm())
            .verify(id, &data)
            .map_err(|e| StoreError::from_digest(id, e))?;
        Ok(data)
    }

    /// Write `data` for `id` unless a file is already in place.
    pub fn write_bytes(&self, id: &ContentId, data: &[u8]) -> StoreResult<bool> {
        reject_null(id)?;
        self.config.check_size(data.len())?;
        let dest = self.object_path(id);
        if dest.exists() {
            return Ok(false);
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut tmp = NamedTempFile::new_in(self.root.join("tmp"))?;
        tmp.write_all(data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&dest).map_err(|e| StoreError::Io(e.error))?;
        Ok(true)
    }

    fn remove(&self, id: &ContentId) -> StoreResult<bool> {
        reject_null(id)?;
        match fs::remove_file(self.object_path(id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// The null id names no object and has no file; refuse it before building
/// a path from it.
pub(crate) fn reject_null(id: &ContentId) -> StoreResult<()> {
    if id.is_null() {
        return Err(StoreError::NotFound(id.clone()));
    }
    Ok(())
}

impl StorageBackend for LocalBackend {
    fn put(&self, id: &ContentId, object_type: ObjectType, data: &[u8]) -> StoreResult<()> {
        if self.write_bytes(id, data)? {
            debug!(id = %id, kind = %object_type, size = data.len(), "object written to local tier");
        }
        Ok(())
    }

    fn status(&self, link: &Link) -> StoreResult<StorageStatus> {
        reject_null(&link.id)?;
        match fs::metadata(self.object_path(&link.id)) {
            Ok(meta) => Ok(StorageStatus::available(meta.len())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(link.id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn restore(&self, link: &Link, _options: &RestoreOptions) -> StoreResult<()> {
        debug!(id = %link.id, "restore is a no-op on the local tier");
        Ok(())
    }

    fn get(&self, link: &Link) -> StoreResult<Vec<u8>> {
        self.read_verified(&link.id)
    }

    fn delete(&self, link: &Link) -> StoreResult<bool> {
        self.remove(&link.id)
    }

    fn write_pool(&self) -> &WorkerPool {
        &self.pool
    }
}

impl std::fmt::Debug for LocalBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalBackend")
            .field("root", &self.root)
            .field("config", &self.config)
            .finish()
    }
}
