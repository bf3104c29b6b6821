use std::sync::Arc;

use arca_crypto::DigestPair;
use arca_index::{InMemoryMetadataIndex, JournalMetadataIndex, MetadataIndex};
use arca_lock::{DistributedLock, InMemoryLockService, LockService};
use arca_store::{
    Blob, Commit, FsArchiveTier, List, LocalBackend, MemoryBackend, Object, RestoreOptions,
    StorageBackend, StorageStatus, StoreError, TieredBackend, Tree,
};
use arca_types::{ContentId, Link, ObjectType};
use tracing::{debug, info, warn};

use crate::config::ArcaConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::resolve::Resolver;
use crate::writer::{WriteHandle, WriteOutcome, Writer, WRITE_NAMESPACE};

/// File name of the metadata journal under the storage root.
pub const INDEX_FILE: &str = "index.jsonl";

/// The public object API: write, read, resolve, restore and delete objects.
pub struct ObjectService {
    config: ArcaConfig,
    writer: Writer,
    index: Arc<dyn MetadataIndex>,
    backend: Arc<dyn StorageBackend>,
    lock: DistributedLock,
}

impl ObjectService {
    /// Open a disk-backed service as described by `config`.
    ///
    /// Objects go to a [`LocalBackend`] under `storage.root`, mirrored to an
    /// [`FsArchiveTier`] when `storage.archive` is set. Metadata is journaled
    /// to `storage.root/index.jsonl`. Locking is process-local.
    pub fn open(config: ArcaConfig) -> ServiceResult<Self> {
        config.validate()?;
        let root = config.storage.root.clone();
        let local = LocalBackend::open(&root, config.backend_config())?;
        let backend: Arc<dyn StorageBackend> = match &config.storage.archive {
            Some(archive) => {
                let tier = FsArchiveTier::open(archive.clone())?;
                Arc::new(TieredBackend::new(local, Arc::new(tier)))
            }
            None => Arc::new(local),
        };
        let index = Arc::new(JournalMetadataIndex::open(root.join(INDEX_FILE))?);
        let service = Self::with_parts(config, index, backend, Arc::new(InMemoryLockService::new()))?;
        info!(
            root = %service.config.storage.root.display(),
            archive = service.config.storage.archive.is_some(),
            "object service opened"
        );
        Ok(service)
    }

    /// A service holding everything in memory. For tests and embedding.
    pub fn in_memory(config: ArcaConfig) -> ServiceResult<Self> {
        let backend = Arc::new(MemoryBackend::with_config(config.backend_config())?);
        Self::with_parts(
            config,
            Arc::new(InMemoryMetadataIndex::new()),
            backend,
            Arc::new(InMemoryLockService::new()),
        )
    }

    /// Assemble a service from explicit collaborators.
    pub fn with_parts(
        config: ArcaConfig,
        index: Arc<dyn MetadataIndex>,
        backend: Arc<dyn StorageBackend>,
        lock_service: Arc<dyn LockService>,
    ) -> ServiceResult<Self> {
        let digests: DigestPair = config.validate()?;
        let lock = DistributedLock::new(lock_service, config.lock.clone())?;
        let writer = Writer::new(
            digests,
            Arc::clone(&index),
            Arc::clone(&backend),
            lock.clone(),
            config.max_payload_bytes,
        );
        Ok(Self {
            config,
            writer,
            index,
            backend,
            lock,
        })
    }

    pub fn config(&self) -> &ArcaConfig {
        &self.config
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    pub fn index(&self) -> &Arc<dyn MetadataIndex> {
        &self.index
    }

    fn resolver(&self) -> Resolver<'_> {
        Resolver::new(self.backend.as_ref())
    }

    // ---- Writing ----

    /// Validate and schedule a write. See [`Writer::write`].
    pub fn write(&self, name: &str, object: impl Into<Object>) -> ServiceResult<(Link, WriteHandle)> {
        self.writer.write(name, &object.into())
    }

    /// Write and block until the write completes.
    pub fn write_and_wait(&self, name: &str, object: impl Into<Object>) -> ServiceResult<WriteOutcome> {
        let (_, handle) = self.write(name, object)?;
        handle.wait()
    }

    /// Store `data` as fixed-size blob chunks under a list.
    ///
    /// Content that fits in one chunk becomes a single blob. Otherwise chunks
    /// are grouped into lists of at most `max_list_fanout` links, adding list
    /// levels until one list remains.
    pub fn write_chunked(&self, name: &str, data: &[u8]) -> ServiceResult<Link> {
        let chunking = &self.config.chunking;
        if data.len() <= chunking.chunk_size {
            return Ok(self.write_and_wait(name, Blob::new(data))?.link);
        }

        let mut handles = Vec::with_capacity(data.len().div_ceil(chunking.chunk_size));
        for (i, chunk) in data.chunks(chunking.chunk_size).enumerate() {
            let (_, handle) = self.write(&i.to_string(), Blob::new(chunk))?;
            handles.push(handle);
        }
        let mut level = wait_all(handles)?;

        loop {
            if level.len() <= chunking.max_list_fanout {
                let outcome = self.write_and_wait(name, List::new(level))?;
                debug!(id = %outcome.link.id, size = data.len(), "chunked content stored");
                return Ok(outcome.link);
            }
            let mut handles = Vec::new();
            for (i, group) in level.chunks(chunking.max_list_fanout).enumerate() {
                let (_, handle) = self.write(&i.to_string(), List::new(group.to_vec()))?;
                handles.push(handle);
            }
            level = wait_all(handles)?;
        }
    }

    // ---- Reading ----

    pub fn read_blob(&self, link: &Link) -> ServiceResult<Blob> {
        self.resolver().read_blob(link)
    }

    pub fn read_list(&self, link: &Link) -> ServiceResult<List> {
        self.resolver().read_list(link)
    }

    pub fn read_tree(&self, link: &Link) -> ServiceResult<Tree> {
        self.resolver().read_tree(link)
    }

    pub fn read_commit(&self, link: &Link) -> ServiceResult<Commit> {
        self.resolver().read_commit(link)
    }

    /// Reassemble the bytes behind a blob or a (possibly nested) list.
    pub fn read_content(&self, link: &Link) -> ServiceResult<Vec<u8>> {
        let resolver = self.resolver();
        let mut out = Vec::new();
        let mut stack = vec![link.clone()];
        while let Some(current) = stack.pop() {
            match current.object_type {
                ObjectType::Blob => out.extend_from_slice(&resolver.read_blob(&current)?.data),
                ObjectType::List => {
                    let list = resolver.read_list(&current)?;
                    stack.extend(list.links.into_iter().rev());
                }
                other => {
                    return Err(ServiceError::InvalidInput(format!(
                        "{:?} is a {other}; only blobs and lists carry content",
                        current.name
                    )))
                }
            }
        }
        Ok(out)
    }

    /// Every link reachable from `link`, depth-first, `link` first.
    pub fn resolve_links(&self, link: &Link, include_history: bool) -> ServiceResult<Vec<Link>> {
        self.resolver().resolve(link, include_history)
    }

    // ---- Storage state ----

    /// Storage status of the object recorded under `id`.
    pub fn probe(&self, id: &ContentId) -> ServiceResult<StorageStatus> {
        let entry = self
            .index
            .find_by_primary(id)?
            .ok_or_else(|| ServiceError::NotFound(format!("no object recorded for {id}")))?;
        let link = Link::new(id.short_hex(), id.clone(), entry.object_type);
        match self.backend.status(&link) {
            Ok(status) => Ok(status),
            Err(StoreError::NotFound(_)) => {
                warn!(id = %id, "metadata present but bytes missing");
                Err(ServiceError::NotFound(format!("bytes for {id} are missing")))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Returns `true` if the object is recorded and its bytes are held by
    /// some tier.
    pub fn exists(&self, link: &Link) -> ServiceResult<bool> {
        if !self.index.exists(&link.id)? {
            return Ok(false);
        }
        Ok(self.backend.contains(link)?)
    }

    /// Ask the archive to warm `link` and everything it references (without
    /// commit history). Returns the number of restore requests issued.
    ///
    /// A node that is itself still cold cannot be read, so its children are
    /// skipped; calling `restore` again once it is readable reaches them.
    pub fn restore(&self, link: &Link, options: &RestoreOptions) -> ServiceResult<usize> {
        let resolver = self.resolver();
        let mut issued = 0usize;
        let mut stack = vec![link.clone()];
        while let Some(current) = stack.pop() {
            self.backend.restore(&current, options)?;
            issued += 1;
            if current.object_type == ObjectType::Blob {
                continue;
            }
            let object = match resolver.read_object(&current) {
                Ok(object) => object,
                Err(ServiceError::Store(StoreError::Unavailable { .. })) => {
                    debug!(id = %current.id, "still cold; children restored on a later pass");
                    continue;
                }
                Err(e) => return Err(e),
            };
            let children: Vec<Link> = match &object {
                Object::Commit(commit) => vec![commit.author.clone(), commit.content.clone()],
                other => other.links().into_iter().cloned().collect(),
            };
            stack.extend(children.into_iter().rev());
        }
        info!(id = %link.id, count = issued, days = options.days, "restore requested");
        Ok(issued)
    }

    /// Record the media type of a stored object.
    pub fn set_media_type(&self, link: &Link, media_type: Option<String>) -> ServiceResult<()> {
        self.index.update_media_type(&link.id, media_type)?;
        Ok(())
    }

    pub fn media_type(&self, link: &Link) -> ServiceResult<Option<String>> {
        let entry = self
            .index
            .find_by_primary(&link.id)?
            .ok_or_else(|| ServiceError::NotFound(format!("no object recorded for {}", link.id)))?;
        Ok(entry.media_type)
    }

    /// Returns `true` if `primary` is recorded with a secondary id other than
    /// `secondary`.
    pub fn check_collision(&self, primary: &ContentId, secondary: &ContentId) -> ServiceResult<bool> {
        let entry = self
            .index
            .find_by_primary(primary)?
            .ok_or_else(|| ServiceError::NotFound(format!("no object recorded for {primary}")))?;
        Ok(&entry.secondary != secondary)
    }

    // ---- Links ----

    /// Same object, new name.
    pub fn rename(&self, link: &Link, name: &str) -> ServiceResult<Link> {
        if name.trim().is_empty() {
            return Err(ServiceError::InvalidInput("link name must not be blank".into()));
        }
        Ok(link.renamed(name))
    }

    /// Remove an object's metadata and bytes. Objects that reference it are
    /// left as they are.
    pub fn delete(&self, link: &Link) -> ServiceResult<()> {
        let guard = self.lock.acquire(WRITE_NAMESPACE, &link.id.to_string())?;
        let recorded = self.index.delete(&link.id)?;
        let stored = self.backend.delete(link)?;
        if let Err(e) = guard.release() {
            warn!(id = %link.id, error = %e, "failed to release write lock");
        }
        if !recorded && !stored {
            return Err(ServiceError::NotFound(format!("nothing stored for {}", link.id)));
        }
        info!(id = %link.id, kind = %link.object_type, "object deleted");
        Ok(())
    }

    /// Drain the write pool and join its workers.
    pub fn shutdown(&self) {
        self.backend.write_pool().shutdown();
    }
}

fn wait_all(handles: Vec<WriteHandle>) -> ServiceResult<Vec<Link>> {
    handles
        .into_iter()
        .map(|handle| handle.wait().map(|outcome| outcome.link))
        .collect()
}

impl std::fmt::Debug for ObjectService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectService")
            .field("root", &self.config.storage.root)
            .field("writer", &self.writer)
            .finish_non_exhaustive()
    }
}
