//! Lease-based distributed write lock for Arca.
//!
//! Writers of the same object must not interleave, even across processes.
//! This crate provides that exclusion on top of an external lease
//! coordinator:
//!
//! - [`LockService`] -- the coordinator interface (acquire with wait, renew,
//!   release). Leases expire by TTL, so a crashed holder is eventually
//!   reclaimed.
//! - [`InMemoryLockService`] -- a process-local coordinator with outage
//!   injection for tests.
//! - [`DistributedLock`] -- blocking acquisition with retry, capped
//!   exponential backoff and jitter, returning a [`LockGuard`] that renews
//!   the lease until it is dropped.

pub mod config;
pub mod error;
pub mod lock;
pub mod memory;
pub mod traits;

pub use config::LockConfig;
pub use error::{LockError, Result};
pub use lock::{DistributedLock, LockGuard};
pub use memory::InMemoryLockService;
pub use traits::{Lease, LockService};
