use std::sync::Arc;

use arca_crypto::digester_for_algorithm;
use arca_types::{ContentId, Link, ObjectType};
use tracing::{debug, info, warn};

use crate::archive::ArchiveTier;
use crate::error::{StoreError, StoreResult};
use crate::local::{reject_null, LocalBackend};
use crate::pool::WorkerPool;
use crate::traits::{RestoreOptions, StorageBackend, StorageStatus};

/// Two-tier backend: a local hot tier in front of an archive tier.
///
/// Writes go to both tiers. Reads prefer the local copy; when it is missing
/// the archived bytes are verified and written back to the local tier before
/// being returned.
pub struct TieredBackend {
    local: LocalBackend,
    archive: Arc<dyn ArchiveTier>,
}

impl TieredBackend {
    pub fn new(local: LocalBackend, archive: Arc<dyn ArchiveTier>) -> Self {
        Self { local, archive }
    }

    pub fn local(&self) -> &LocalBackend {
        &self.local
    }

    pub fn archive(&self) -> &Arc<dyn ArchiveTier> {
        &self.archive
    }

    fn read_from_archive(&self, id: &ContentId) -> StoreResult<Vec<u8>> {
        let data = self.archive.get(id)?;
        digester_for_algorithm(id.algorithm())
            .verify(id, &data)
            .map_err(|e| StoreError::from_digest(id, e))?;

        warn!(id = %id, size = data.len(), "local copy missing; repopulating from archive");
        if let Err(e) = self.local.write_bytes(id, &data) {
            // The caller still gets verified bytes; the next read retries.
            warn!(id = %id, error = %e, "failed to repopulate local tier");
        }
        Ok(data)
    }
}

impl StorageBackend for TieredBackend {
    fn put(&self, id: &ContentId, object_type: ObjectType, data: &[u8]) -> StoreResult<()> {
        reject_null(id)?;
        self.local.put(id, object_type, data)?;
        self.archive.put(id, data)?;
        debug!(id = %id, kind = %object_type, "object written to both tiers");
        Ok(())
    }

    fn status(&self, link: &Link) -> StoreResult<StorageStatus> {
        reject_null(&link.id)?;
        match self.local.status(link) {
            Err(StoreError::NotFound(_)) => {}
            other => return other,
        }
        match self.archive.head(&link.id)? {
            Some(head) if head.is_readable() => Ok(StorageStatus::available(head.size)),
            Some(head) => Ok(StorageStatus::archived(head.size)),
            None => Err(StoreError::NotFound(link.id.clone())),
        }
    }

    fn restore(&self, link: &Link, options: &RestoreOptions) -> StoreResult<()> {
        reject_null(&link.id)?;
        if self.local.status(link).is_ok() {
            debug!(id = %link.id, "object is in the local tier; restore skipped");
            return Ok(());
        }
        self.archive.request_restore(&link.id, options)?;
        info!(id = %link.id, days = options.days, "restore forwarded to archive tier");
        Ok(())
    }

    fn get(&self, link: &Link) -> StoreResult<Vec<u8>> {
        reject_null(&link.id)?;
        match self.local.get(link) {
            Err(StoreError::NotFound(_)) => self.read_from_archive(&link.id),
            other => other,
        }
    }

    fn delete(&self, link: &Link) -> StoreResult<bool> {
        reject_null(&link.id)?;
        let local = self.local.delete(link)?;
        let archived = self.archive.delete(&link.id)?;
        Ok(local || archived)
    }

    fn write_pool(&self) -> &WorkerPool {
        self.local.write_pool()
    }

    /// Both the local file and the archive copy must be present.
    fn is_fully_stored(&self, link: &Link) -> StoreResult<bool> {
        if !self.local.contains(link)? {
            return Ok(false);
        }
        let mirrored = self.archive.head(&link.id)?.is_some();
        if !mirrored {
            warn!(id = %link.id, "archive copy missing");
        }
        Ok(mirrored)
    }
}

impl std::fmt::Debug for TieredBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredBackend")
            .field("local", &self.local)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{FsArchiveTier, StorageClass};
    use crate::config::{ArchiveConfig, BackendConfig};
    use crate::object::{Blob, Object};
    use arca_crypto::{Blake3Digester, Digester};
    use std::path::Path;

    fn open(dir: &Path, archive: ArchiveConfig) -> TieredBackend {
        let local = LocalBackend::open(dir.join("local"), BackendConfig::default()).unwrap();
        let archive = FsArchiveTier::open(archive).unwrap();
        TieredBackend::new(local, Arc::new(archive))
    }

    fn blob(content: &[u8]) -> (Link, Vec<u8>) {
        let bytes = Object::from(Blob::new(content.to_vec())).serialize().unwrap();
        let id = Blake3Digester.digest(&bytes);
        (Link::new("b", id, ObjectType::Blob), bytes)
    }

    #[test]
    fn put_writes_both_tiers() {
        let dir = tempfile::tempdir().unwrap();
        let backend = open(dir.path(), ArchiveConfig::new(dir.path().join("archive")));
        let (link, bytes) = blob(b"both");
        backend.put(&link.id, link.object_type, &bytes).unwrap();

        assert!(backend.local().object_path(&link.id).exists());
        assert!(backend.archive().head(&link.id).unwrap().is_some());
    }

    #[test]
    fn archive_only_object_repopulates_local() {
        let dir = tempfile::tempdir().unwrap();
        let backend = open(dir.path(), ArchiveConfig::new(dir.path().join("archive")));
        let (link, bytes) = blob(b"evicted");
        backend.put(&link.id, link.object_type, &bytes).unwrap();
        backend.local().delete(&link).unwrap();

        assert_eq!(backend.status(&link).unwrap(), StorageStatus::available(bytes.len() as u64));
        assert_eq!(backend.get(&link).unwrap(), bytes);
        assert!(backend.local().object_path(&link.id).exists());
    }

    #[test]
    fn glacier_object_unavailable_until_restored() {
        let dir = tempfile::tempdir().unwrap();
        let archive = ArchiveConfig::new(dir.path().join("archive"))
            .with_class(StorageClass::Glacier)
            .with_instant_restores();
        let backend = open(dir.path(), archive);
        let (link, bytes) = blob(b"frozen");
        backend.put(&link.id, link.object_type, &bytes).unwrap();
        backend.local().delete(&link).unwrap();

        assert_eq!(backend.status(&link).unwrap(), StorageStatus::archived(bytes.len() as u64));
        assert!(matches!(backend.get(&link), Err(StoreError::Unavailable { .. })));

        backend.restore(&link, &RestoreOptions::default()).unwrap();
        assert!(backend.status(&link).unwrap().available);
        assert_eq!(backend.get(&link).unwrap(), bytes);
    }

    #[test]
    fn tampered_archive_copy_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let backend = open(dir.path(), ArchiveConfig::new(dir.path().join("archive")));
        let (link, _) = blob(b"original");
        let (_, other) = blob(b"impostor");
        backend.archive().put(&link.id, &other).unwrap();

        assert!(matches!(
            backend.get(&link),
            Err(StoreError::IntegrityViolation { .. })
        ));
        assert!(!backend.local().object_path(&link.id).exists());
    }

    #[test]
    fn delete_clears_both_tiers() {
        let dir = tempfile::tempdir().unwrap();
        let backend = open(dir.path(), ArchiveConfig::new(dir.path().join("archive")));
        let (link, bytes) = blob(b"doomed");
        backend.put(&link.id, link.object_type, &bytes).unwrap();

        assert!(backend.delete(&link).unwrap());
        assert!(matches!(backend.status(&link), Err(StoreError::NotFound(_))));
        assert!(!backend.delete(&link).unwrap());
    }

    #[test]
    fn missing_archive_copy_is_refilled_by_put() {
        let dir = tempfile::tempdir().unwrap();
        let backend = open(dir.path(), ArchiveConfig::new(dir.path().join("archive")));
        let (link, bytes) = blob(b"mirrored");
        backend.put(&link.id, link.object_type, &bytes).unwrap();
        assert!(backend.is_fully_stored(&link).unwrap());

        backend.archive().delete(&link.id).unwrap();
        assert!(backend.contains(&link).unwrap());
        assert!(!backend.is_fully_stored(&link).unwrap());

        backend.put(&link.id, link.object_type, &bytes).unwrap();
        assert!(backend.is_fully_stored(&link).unwrap());
    }

    #[test]
    fn null_id_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let backend = open(dir.path(), ArchiveConfig::new(dir.path().join("archive")));
        let null = Link::new("null", ContentId::null(), ObjectType::Blob);
        assert!(matches!(backend.status(&null), Err(StoreError::NotFound(_))));
        assert!(matches!(backend.get(&null), Err(StoreError::NotFound(_))));
        assert!(matches!(backend.delete(&null), Err(StoreError::NotFound(_))));
    }
}
