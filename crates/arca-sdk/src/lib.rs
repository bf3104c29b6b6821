//! High-level SDK for Arca.
//!
//! [`ObjectService`] is the entry point. It validates and schedules writes
//! through the [`Writer`] (the write/dedup orchestrator), reads and resolves
//! object graphs, and forwards restore requests to cold storage.
//!
//! ```no_run
//! use arca_sdk::{ArcaConfig, ObjectService};
//! use arca_store::{Blob, Tree};
//!
//! # fn main() -> arca_sdk::ServiceResult<()> {
//! let service = ObjectService::open(ArcaConfig::with_root("/var/lib/arca"))?;
//! let readme = service.write_and_wait("README", Blob::new(b"hello".to_vec()))?.link;
//! let root = service.write_and_wait("root", Tree::new(vec![readme]))?.link;
//! for link in service.resolve_links(&root, false)? {
//!     println!("{} {}", link.object_type, link.name);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Write path
//!
//! 1. Validate the object synchronously: non-blank name, allowed sub-link
//!    types, sub-links already recorded, payload under the ceiling.
//! 2. Serialize and derive the primary id; return the link with a
//!    [`WriteHandle`].
//! 3. On the backend's write pool: compute the secondary id, take the
//!    per-id lock, consult the metadata index, write the bytes at most once.

pub mod config;
pub mod error;
pub mod resolve;
pub mod service;
pub mod writer;

pub use config::{ArcaConfig, ChunkingConfig, PoolConfig, StorageConfig};
pub use error::{ErrorKind, ServiceError, ServiceResult};
pub use resolve::Resolver;
pub use service::ObjectService;
pub use writer::{WriteHandle, WriteKind, WriteOutcome, Writer, WRITE_NAMESPACE};
