use std::sync::Arc;

use arca_crypto::DigestPair;
use arca_index::{MetadataEntry, MetadataIndex};
use arca_lock::DistributedLock;
use arca_store::{Object, StorageBackend};
use arca_types::{ContentId, Link, ObjectType};
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

use crate::error::{ServiceError, ServiceResult};

/// Lock namespace serializing writers of one primary id.
pub const WRITE_NAMESPACE: &str = "object-write";

// ---------------------------------------------------------------------------
// Outcome and handle
// ---------------------------------------------------------------------------

/// What a completed write did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WriteKind {
    /// This write recorded the metadata entry and stored the bytes.
    Stored,
    /// Identical content was already stored; nothing was written.
    Deduplicated,
    /// Metadata existed but a stored copy was missing and has been rewritten.
    Repaired,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteOutcome {
    pub link: Link,
    pub kind: WriteKind,
}

/// Completion handle for a scheduled write.
///
/// Dropping the handle does not cancel the write.
#[derive(Debug)]
pub struct WriteHandle {
    link: Link,
    rx: oneshot::Receiver<ServiceResult<WriteOutcome>>,
}

impl WriteHandle {
    /// The link the write will resolve to.
    pub fn link(&self) -> &Link {
        &self.link
    }

    /// Block the current thread until the write finishes.
    ///
    /// Must not be called from inside an async runtime; use
    /// [`completed`](Self::completed) there.
    pub fn wait(self) -> ServiceResult<WriteOutcome> {
        self.rx.blocking_recv().map_err(|_| abandoned(&self.link))?
    }

    /// Wait for the write to finish.
    pub async fn completed(self) -> ServiceResult<WriteOutcome> {
        let link = self.link;
        self.rx.await.map_err(|_| abandoned(&link))?
    }
}

fn abandoned(link: &Link) -> ServiceError {
    ServiceError::Internal(format!("write job for {} ended without a result", link.id))
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

struct Shared {
    digests: DigestPair,
    index: Arc<dyn MetadataIndex>,
    backend: Arc<dyn StorageBackend>,
    lock: DistributedLock,
    max_payload_bytes: u64,
}

/// Write / dedup orchestrator.
///
/// [`write`](Self::write) validates synchronously, computes the primary id,
/// and schedules the rest on the backend's write pool: secondary digest,
/// per-id lock, metadata check, and at most one physical write.
#[derive(Clone)]
pub struct Writer {
    shared: Arc<Shared>,
}

impl Writer {
    pub fn new(
        digests: DigestPair,
        index: Arc<dyn MetadataIndex>,
        backend: Arc<dyn StorageBackend>,
        lock: DistributedLock,
        max_payload_bytes: u64,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                digests,
                index,
                backend,
                lock,
                max_payload_bytes,
            }),
        }
    }

    /// Validate `object`, derive its link and schedule the write.
    ///
    /// Validation failures are returned here; everything after scheduling
    /// is reported through the handle.
    pub fn write(&self, name: &str, object: &Object) -> ServiceResult<(Link, WriteHandle)> {
        if name.trim().is_empty() {
            return Err(ServiceError::InvalidInput("link name must not be blank".into()));
        }
        self.validate(object)?;

        let bytes = object.serialize()?;
        let size = bytes.len() as u64;
        if size > self.shared.max_payload_bytes {
            return Err(ServiceError::PayloadTooLarge {
                size,
                limit: self.shared.max_payload_bytes,
            });
        }

        let object_type = object.object_type();
        let id = self.shared.digests.primary().digest(&bytes);
        let link = Link::new(name, id, object_type);

        let (tx, rx) = oneshot::channel();
        let shared = Arc::clone(&self.shared);
        let job_link = link.clone();
        self.shared.backend.write_pool().execute(move || {
            let result = shared.store(job_link, &bytes);
            // The receiver may be gone; the write stands either way.
            let _ = tx.send(result);
        });

        let handle = WriteHandle {
            link: link.clone(),
            rx,
        };
        Ok((link, handle))
    }

    /// Check sub-link types and presence.
    fn validate(&self, object: &Object) -> ServiceResult<()> {
        match object {
            Object::Blob(_) => Ok(()),
            Object::List(list) => {
                for link in &list.links {
                    self.require(link, &[ObjectType::Blob, ObjectType::List], "list entry")?;
                }
                Ok(())
            }
            Object::Tree(tree) => {
                for link in &tree.entries {
                    self.require(
                        link,
                        &[ObjectType::Blob, ObjectType::List, ObjectType::Tree],
                        "tree entry",
                    )?;
                }
                Ok(())
            }
            Object::Commit(commit) => {
                const NON_COMMIT: &[ObjectType] =
                    &[ObjectType::Blob, ObjectType::List, ObjectType::Tree];
                self.require(&commit.author, NON_COMMIT, "commit author")?;
                if commit.parent.object_type != ObjectType::Commit {
                    return Err(ServiceError::InvalidInput(format!(
                        "commit parent must be a commit, got {}",
                        commit.parent.object_type
                    )));
                }
                if !commit.is_root() {
                    self.require(&commit.parent, &[ObjectType::Commit], "commit parent")?;
                }
                self.require(&commit.content, NON_COMMIT, "commit content")
            }
        }
    }

    fn require(&self, link: &Link, allowed: &[ObjectType], role: &str) -> ServiceResult<()> {
        if !allowed.contains(&link.object_type) {
            return Err(ServiceError::InvalidInput(format!(
                "{role} {:?} has disallowed type {}",
                link.name, link.object_type
            )));
        }
        if !self.shared.index.exists(&link.id)? {
            return Err(ServiceError::InvalidInput(format!(
                "{role} {:?} references unknown object {}",
                link.name, link.id
            )));
        }
        Ok(())
    }
}

impl Shared {
    /// The scheduled half of a write. Runs on a pool thread (or the caller's
    /// thread under backpressure).
    fn store(&self, link: Link, bytes: &[u8]) -> ServiceResult<WriteOutcome> {
        let secondary = self.digests.secondary().digest(bytes);
        let guard = self.lock.acquire(WRITE_NAMESPACE, &link.id.to_string())?;

        let plan = match self.index.find_by_primary(&link.id)? {
            Some(entry) => self.check_existing(&link, &secondary, &entry)?,
            None => {
                if self
                    .index
                    .conditional_insert(&link.id, &secondary, link.object_type)?
                {
                    Some(WriteKind::Stored)
                } else {
                    // Lost a race with a writer that bypassed the lock.
                    let entry = self.index.find_by_primary(&link.id)?.ok_or_else(|| {
                        ServiceError::Internal(format!(
                            "metadata entry for {} vanished during insert",
                            link.id
                        ))
                    })?;
                    self.check_existing(&link, &secondary, &entry)?
                }
            }
        };

        let kind = match plan {
            Some(kind) => {
                self.backend.put(&link.id, link.object_type, bytes)?;
                debug!(id = %link.id, kind = %link.object_type, size = bytes.len(), "object stored");
                kind
            }
            None => WriteKind::Deduplicated,
        };

        if let Err(e) = guard.release() {
            warn!(id = %link.id, error = %e, "failed to release write lock");
        }
        Ok(WriteOutcome { link, kind })
    }

    /// Decide what to do when an entry for the primary id already exists.
    /// `None` means the bytes are in place and nothing needs writing.
    fn check_existing(
        &self,
        link: &Link,
        secondary: &ContentId,
        entry: &MetadataEntry,
    ) -> ServiceResult<Option<WriteKind>> {
        if &entry.secondary != secondary {
            error!(
                id = %link.id,
                recorded = %entry.secondary,
                computed = %secondary,
                "primary digest collision"
            );
            return Err(ServiceError::IntegrityViolation(format!(
                "primary id {} is already recorded with secondary {}, new content has {}",
                link.id, entry.secondary, secondary
            )));
        }
        if self.backend.is_fully_stored(link)? {
            debug!(id = %link.id, "dedup hit");
            return Ok(None);
        }
        warn!(id = %link.id, "metadata present but a stored copy is missing; repairing");
        Ok(Some(WriteKind::Repaired))
    }
}

impl std::fmt::Debug for Writer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Writer")
            .field("digests", &self.shared.digests)
            .field("max_payload_bytes", &self.shared.max_payload_bytes)
            .finish_non_exhaustive()
    }
}
