//! Object model and storage backends for Arca.
//!
//! Every object is serialized to a canonical byte form (a type tag followed by
//! the body) and stored under the digest of those bytes.
//!
//! # Object Types
//!
//! - [`Blob`] -- raw bytes
//! - [`List`] -- ordered links forming one logical stream
//! - [`Tree`] -- ordered, named links
//! - [`Commit`] -- message, parent, content and author links
//!
//! # Storage Backends
//!
//! All backends implement the [`StorageBackend`] trait:
//!
//! - [`MemoryBackend`] -- `HashMap`-based backend for tests and embedding
//! - [`LocalBackend`] -- one file per object on local disk
//! - [`TieredBackend`] -- local hot tier in front of an [`ArchiveTier`]
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written.
//! 2. Writes are idempotent and atomic: a reader never sees partial bytes.
//! 3. Every read re-verifies the digest.
//! 4. Oversized payloads are rejected before any I/O.
//! 5. Writes run on the backend's bounded [`WorkerPool`]; a full queue
//!    pushes the work back onto the submitting thread.

pub mod archive;
pub mod config;
pub mod error;
pub mod local;
pub mod memory;
pub mod object;
pub mod pool;
pub mod tiered;
pub mod traits;

pub use archive::{ArchiveHead, ArchiveTier, FsArchiveTier, RestoreState, RestoreWindow, StorageClass};
pub use config::{ArchiveConfig, BackendConfig};
pub use error::{StoreError, StoreResult};
pub use local::LocalBackend;
pub use memory::MemoryBackend;
pub use object::{Blob, Commit, List, Object, Tree};
pub use pool::WorkerPool;
pub use tiered::TieredBackend;
pub use traits::{RestoreOptions, RetrievalSpeed, StorageBackend, StorageStatus};
