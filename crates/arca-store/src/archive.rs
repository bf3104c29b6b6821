use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use arca_types::ContentId;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::ArchiveConfig;
use crate::error::{StoreError, StoreResult};
use crate::traits::{RestoreOptions, RetrievalSpeed};

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Storage class of an archived object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageClass {
    /// Readable immediately.
    #[default]
    Standard,
    /// Readable immediately, cheaper storage, pricier reads.
    InfrequentAccess,
    /// Requires a restore before reads.
    Glacier,
    /// Requires a restore before reads; slowest retrieval.
    DeepArchive,
}

impl StorageClass {
    /// Returns `true` if objects of this class must be restored before reads.
    pub fn requires_restore(&self) -> bool {
        matches!(self, Self::Glacier | Self::DeepArchive)
    }
}

/// A granted restore: readable from `ready_at` until `expires_at` (ms).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreWindow {
    pub ready_at: i64,
    pub expires_at: i64,
}

/// Restore progress of an archived object at a point in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestoreState {
    /// The class is readable without a restore.
    NotRequired,
    NotRequested,
    InProgress { ready_at: i64 },
    Restored { expires_at: i64 },
    Expired,
}

impl RestoreState {
    fn evaluate(class: StorageClass, window: Option<RestoreWindow>, now: i64) -> Self {
        if !class.requires_restore() {
            return Self::NotRequired;
        }
        match window {
            None => Self::NotRequested,
            Some(w) if now < w.ready_at => Self::InProgress { ready_at: w.ready_at },
            Some(w) if now < w.expires_at => Self::Restored {
                expires_at: w.expires_at,
            },
            Some(_) => Self::Expired,
        }
    }

    /// Returns `true` if the bytes can be read in this state.
    pub fn is_readable(&self) -> bool {
        matches!(self, Self::NotRequired | Self::Restored { .. })
    }
}

/// Metadata about an archived object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArchiveHead {
    pub class: StorageClass,
    /// Uncompressed size in bytes.
    pub size: u64,
    pub restore: RestoreState,
}

impl ArchiveHead {
    pub fn is_readable(&self) -> bool {
        self.restore.is_readable()
    }
}

/// A cold storage tier.
pub trait ArchiveTier: Send + Sync {
    /// Archive `data` under `id`. Idempotent.
    fn put(&self, id: &ContentId, data: &[u8]) -> StoreResult<()>;

    /// Class, size and restore state, or `None` if not archived.
    fn head(&self, id: &ContentId) -> StoreResult<Option<ArchiveHead>>;

    /// Read archived bytes. `Unavailable` unless the object is readable now.
    /// The bytes are returned unverified; callers check the digest.
    fn get(&self, id: &ContentId) -> StoreResult<Vec<u8>>;

    /// Start an asynchronous restore. No-op for classes readable without one.
    fn request_restore(&self, id: &ContentId, options: &RestoreOptions) -> StoreResult<()>;

    fn delete(&self, id: &ContentId) -> StoreResult<bool>;
}

/// Sidecar record kept next to each archived payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct ArchiveRecord {
    class: StorageClass,
    size: u64,
    restore: Option<RestoreWindow>,
}

/// Directory-backed archive tier.
///
/// Payloads are stored zstd-compressed as `<algorithm>/<hex>.zst` with a JSON
/// sidecar `<algorithm>/<hex>.json` holding the storage class and restore
/// window. Restores complete after the delay configured for their speed.
#[derive(Debug)]
pub struct FsArchiveTier {
    config: ArchiveConfig,
}

impl FsArchiveTier {
    pub fn open(config: ArchiveConfig) -> StoreResult<Self> {
        fs::create_dir_all(&config.root)?;
        info!(
            root = %config.root.display(),
            class = ?config.storage_class,
            "archive tier opened"
        );
        Ok(Self { config })
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    fn dir(&self, id: &ContentId) -> PathBuf {
        self.config.root.join(id.algorithm().name())
    }

    fn payload_path(&self, id: &ContentId) -> PathBuf {
        self.dir(id).join(format!("{}.zst", id.to_hex()))
    }

    fn record_path(&self, id: &ContentId) -> PathBuf {
        self.dir(id).join(format!("{}.json", id.to_hex()))
    }

    fn read_record(&self, id: &ContentId) -> StoreResult<Option<ArchiveRecord>> {
        let raw = match fs::read(self.record_path(id)) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record = serde_json::from_slice(&raw)
            .map_err(|e| StoreError::Serialization(format!("archive record for {id}: {e}")))?;
        Ok(Some(record))
    }

    fn write_record(&self, id: &ContentId, record: &ArchiveRecord) -> StoreResult<()> {
        let json =
            serde_json::to_vec_pretty(record).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.write_atomic(id, &self.record_path(id), &json)
    }

    fn write_atomic(&self, id: &ContentId, dest: &Path, data: &[u8]) -> StoreResult<()> {
        let dir = self.dir(id);
        fs::create_dir_all(&dir)?;
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(dest).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }

    fn delay_for(&self, speed: RetrievalSpeed) -> i64 {
        let delay = match speed {
            RetrievalSpeed::Expedited => self.config.expedited_delay,
            RetrievalSpeed::Standard => self.config.standard_delay,
            RetrievalSpeed::Bulk => self.config.bulk_delay,
        };
        delay.as_millis() as i64
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl ArchiveTier for FsArchiveTier {
    fn put(&self, id: &ContentId, data: &[u8]) -> StoreResult<()> {
        if self.read_record(id)?.is_some() {
            return Ok(());
        }
        let compressed = zstd::encode_all(data, self.config.compression_level)?;
        self.write_atomic(id, &self.payload_path(id), &compressed)?;
        // The record goes last: its presence means the payload is complete.
        self.write_record(
            id,
            &ArchiveRecord {
                class: self.config.storage_class,
                size: data.len() as u64,
                restore: None,
            },
        )?;
        debug!(id = %id, class = ?self.config.storage_class, "object archived");
        Ok(())
    }

    fn head(&self, id: &ContentId) -> StoreResult<Option<ArchiveHead>> {
        Ok(self.read_record(id)?.map(|record| ArchiveHead {
            class: record.class,
            size: record.size,
            restore: RestoreState::evaluate(record.class, record.restore, now_ms()),
        }))
    }

    fn get(&self, id: &ContentId) -> StoreResult<Vec<u8>> {
        let head = self.head(id)?.ok_or_else(|| StoreError::NotFound(id.clone()))?;
        if !head.is_readable() {
            return Err(StoreError::Unavailable {
                id: id.clone(),
                reason: format!("{:?} object in state {:?}", head.class, head.restore),
            });
        }
        let compressed = fs::read(self.payload_path(id))?;
        Ok(zstd::decode_all(compressed.as_slice())?)
    }

    fn request_restore(&self, id: &ContentId, options: &RestoreOptions) -> StoreResult<()> {
        let mut record = self
            .read_record(id)?
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let now = now_ms();
        match RestoreState::evaluate(record.class, record.restore, now) {
            RestoreState::NotRequired => {
                debug!(id = %id, "restore not required for storage class");
                return Ok(());
            }
            RestoreState::InProgress { .. } => {
                debug!(id = %id, "restore already in progress");
                return Ok(());
            }
            RestoreState::NotRequested | RestoreState::Restored { .. } | RestoreState::Expired => {}
        }

        let ready_at = now + self.delay_for(options.speed);
        record.restore = Some(RestoreWindow {
            ready_at,
            expires_at: ready_at + i64::from(options.days) * MS_PER_DAY,
        });
        self.write_record(id, &record)?;
        info!(
            id = %id,
            days = options.days,
            speed = ?options.speed,
            ready_at,
            "archive restore requested"
        );
        Ok(())
    }

    fn delete(&self, id: &ContentId) -> StoreResult<bool> {
        let mut removed = false;
        for path in [self.record_path(id), self.payload_path(id)] {
            match fs::remove_file(&path) {
                Ok(()) => removed = true,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arca_crypto::{Blake3Digester, Digester};

    fn open(dir: &std::path::Path, class: StorageClass) -> FsArchiveTier {
        FsArchiveTier::open(ArchiveConfig::new(dir).with_class(class)).unwrap()
    }

    #[test]
    fn standard_class_is_readable_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let tier = open(dir.path(), StorageClass::Standard);
        let id = Blake3Digester.digest(b"payload");
        tier.put(&id, b"payload").unwrap();

        let head = tier.head(&id).unwrap().unwrap();
        assert_eq!(head.size, 7);
        assert_eq!(head.restore, RestoreState::NotRequired);
        assert_eq!(tier.get(&id).unwrap(), b"payload");
    }

    #[test]
    fn payload_is_compressed_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let tier = open(dir.path(), StorageClass::Standard);
        let data = vec![b'a'; 64 * 1024];
        let id = Blake3Digester.digest(&data);
        tier.put(&id, &data).unwrap();
        let on_disk = fs::metadata(tier.payload_path(&id)).unwrap().len();
        assert!(on_disk < data.len() as u64);
    }

    #[test]
    fn glacier_requires_restore() {
        let dir = tempfile::tempdir().unwrap();
        let tier = open(dir.path(), StorageClass::Glacier);
        let id = Blake3Digester.digest(b"frozen");
        tier.put(&id, b"frozen").unwrap();

        let head = tier.head(&id).unwrap().unwrap();
        assert_eq!(head.restore, RestoreState::NotRequested);
        assert!(matches!(tier.get(&id), Err(StoreError::Unavailable { .. })));
    }

    #[test]
    fn restore_in_progress_until_delay_elapses() {
        let dir = tempfile::tempdir().unwrap();
        let tier = open(dir.path(), StorageClass::DeepArchive);
        let id = Blake3Digester.digest(b"deep");
        tier.put(&id, b"deep").unwrap();

        tier.request_restore(&id, &RestoreOptions::default()).unwrap();
        let head = tier.head(&id).unwrap().unwrap();
        assert!(matches!(head.restore, RestoreState::InProgress { .. }));
        assert!(matches!(tier.get(&id), Err(StoreError::Unavailable { .. })));
    }

    #[test]
    fn instant_restore_makes_object_readable() {
        let dir = tempfile::tempdir().unwrap();
        let config = ArchiveConfig::new(dir.path())
            .with_class(StorageClass::Glacier)
            .with_instant_restores();
        let tier = FsArchiveTier::open(config).unwrap();
        let id = Blake3Digester.digest(b"thawed");
        tier.put(&id, b"thawed").unwrap();

        tier.request_restore(
            &id,
            &RestoreOptions {
                days: 1,
                speed: RetrievalSpeed::Bulk,
            },
        )
        .unwrap();
        let head = tier.head(&id).unwrap().unwrap();
        assert!(matches!(head.restore, RestoreState::Restored { .. }));
        assert_eq!(tier.get(&id).unwrap(), b"thawed");
    }

    #[test]
    fn restore_state_expires() {
        let window = Some(RestoreWindow {
            ready_at: 100,
            expires_at: 200,
        });
        assert_eq!(
            RestoreState::evaluate(StorageClass::Glacier, window, 50),
            RestoreState::InProgress { ready_at: 100 }
        );
        assert_eq!(
            RestoreState::evaluate(StorageClass::Glacier, window, 150),
            RestoreState::Restored { expires_at: 200 }
        );
        assert_eq!(
            RestoreState::evaluate(StorageClass::Glacier, window, 250),
            RestoreState::Expired
        );
        assert!(!RestoreState::Expired.is_readable());
    }

    #[test]
    fn restore_of_missing_object_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let tier = open(dir.path(), StorageClass::Glacier);
        let id = Blake3Digester.digest(b"never archived");
        assert!(matches!(
            tier.request_restore(&id, &RestoreOptions::default()),
            Err(StoreError::NotFound(_))
        ));
        assert!(tier.head(&id).unwrap().is_none());
    }

    #[test]
    fn delete_removes_payload_and_record() {
        let dir = tempfile::tempdir().unwrap();
        let tier = open(dir.path(), StorageClass::Standard);
        let id = Blake3Digester.digest(b"gone");
        tier.put(&id, b"gone").unwrap();
        assert!(tier.delete(&id).unwrap());
        assert!(tier.head(&id).unwrap().is_none());
        assert!(!tier.delete(&id).unwrap());
    }
}
