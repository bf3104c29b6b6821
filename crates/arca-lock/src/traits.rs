//! The [`LockService`] trait: the external lease coordinator.

use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::error::Result;

/// A granted lease on `namespace/key`.
///
/// The token identifies this particular grant; renew and release only act on
/// a lease whose token still matches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lease {
    pub namespace: String,
    pub key: String,
    pub token: Uuid,
    /// Local deadline after which the coordinator may hand the key to
    /// someone else.
    pub expires_at: Instant,
}

impl Lease {
    pub fn new(namespace: impl Into<String>, key: impl Into<String>, ttl: Duration) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
            token: Uuid::now_v7(),
            expires_at: Instant::now() + ttl,
        }
    }
}

/// Coordinator granting exclusive, time-limited leases on keys.
///
/// Leases expire on their own after the TTL, so a holder that crashes does
/// not block the key forever.
pub trait LockService: Send + Sync {
    /// Try to take the lease on `namespace/key`, waiting up to `wait` for a
    /// current holder to let go.
    ///
    /// Returns `Ok(None)` if the key was still held when `wait` ran out.
    fn try_acquire(
        &self,
        namespace: &str,
        key: &str,
        ttl: Duration,
        wait: Duration,
    ) -> Result<Option<Lease>>;

    /// Extend a lease. Returns `Ok(false)` if it is no longer held.
    fn renew(&self, lease: &mut Lease, ttl: Duration) -> Result<bool>;

    /// Release a lease. Releasing a lease that already lapsed is not an error.
    fn release(&self, lease: &Lease) -> Result<()>;
}
