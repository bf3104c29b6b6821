#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arca_index::InMemoryMetadataIndex;
use arca_lock::InMemoryLockService;
use arca_sdk::{ArcaConfig, ObjectService};
use arca_store::{
    Blob, BackendConfig, List, MemoryBackend, RestoreOptions, StorageBackend, StorageStatus,
    StoreResult, Tree, WorkerPool,
};
use arca_types::{ContentId, Link, ObjectType};

/// Backend that counts `put` calls and can slow them down.
pub struct CountingBackend {
    inner: MemoryBackend,
    puts: AtomicU64,
    delay: Duration,
}

impl CountingBackend {
    pub fn new(config: BackendConfig, delay: Duration) -> Self {
        Self {
            inner: MemoryBackend::with_config(config).unwrap(),
            puts: AtomicU64::new(0),
            delay,
        }
    }

    pub fn puts(&self) -> u64 {
        self.puts.load(Ordering::SeqCst)
    }
}

impl StorageBackend for CountingBackend {
    fn put(&self, id: &ContentId, object_type: ObjectType, data: &[u8]) -> StoreResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.inner.put(id, object_type, data)
    }

    fn status(&self, link: &Link) -> StoreResult<StorageStatus> {
        self.inner.status(link)
    }

    fn restore(&self, link: &Link, options: &RestoreOptions) -> StoreResult<()> {
        self.inner.restore(link, options)
    }

    fn get(&self, link: &Link) -> StoreResult<Vec<u8>> {
        self.inner.get(link)
    }

    fn delete(&self, link: &Link) -> StoreResult<bool> {
        self.inner.delete(link)
    }

    fn write_pool(&self) -> &WorkerPool {
        self.inner.write_pool()
    }
}

/// In-memory service over a counting backend. The index is returned so tests
/// can seed or inspect it.
pub fn counting_service(
    config: ArcaConfig,
    delay: Duration,
) -> (ObjectService, Arc<CountingBackend>, Arc<InMemoryMetadataIndex>) {
    let backend = Arc::new(CountingBackend::new(config.backend_config(), delay));
    let index = Arc::new(InMemoryMetadataIndex::new());
    let service = ObjectService::with_parts(
        config,
        index.clone(),
        backend.clone(),
        Arc::new(InMemoryLockService::new()),
    )
    .unwrap();
    (service, backend, index)
}

pub fn blob(service: &ObjectService, name: &str, data: &[u8]) -> Link {
    service.write_and_wait(name, Blob::new(data)).unwrap().link
}

pub fn list_of(service: &ObjectService, name: &str, prefix: &str, count: usize) -> Link {
    let links = (0..count)
        .map(|i| blob(service, &format!("{prefix}-{i}"), format!("{prefix} chunk {i}").as_bytes()))
        .collect();
    service.write_and_wait(name, List::new(links)).unwrap().link
}

/// A tree holding a blob, a list of four blobs, and a nested tree that holds
/// a blob and a list of three blobs: thirteen links in all.
pub fn thirteen_link_tree(service: &ObjectService) -> Link {
    let readme = blob(service, "README", b"top-level readme");
    let video = list_of(service, "video", "video", 4);

    let notes = blob(service, "notes.txt", b"nested notes");
    let audio = list_of(service, "audio", "audio", 3);
    let nested = service
        .write_and_wait("nested", Tree::new(vec![notes, audio]))
        .unwrap()
        .link;

    service
        .write_and_wait("root", Tree::new(vec![readme, video, nested]))
        .unwrap()
        .link
}
