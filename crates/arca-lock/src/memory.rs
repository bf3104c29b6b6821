//! In-process lease coordinator.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use tracing::debug;
use uuid::Uuid;

use crate::error::{LockError, Result};
use crate::traits::{Lease, LockService};

#[derive(Debug)]
struct Held {
    token: Uuid,
    expires_at: Instant,
}

/// A [`LockService`] backed by a process-local lease table.
///
/// Waiters block on a `Condvar` that is signalled on every release; expired
/// leases are reclaimed lazily by the next acquirer. Availability can be
/// toggled with [`set_available`](Self::set_available) to simulate a
/// coordinator outage.
#[derive(Debug, Default)]
pub struct InMemoryLockService {
    leases: Mutex<HashMap<(String, String), Held>>,
    released: Condvar,
    unavailable: AtomicBool,
}

impl InMemoryLockService {
    pub fn new() -> Self {
        Self::default()
    }

    /// When `false`, every call fails with [`LockError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
        if available {
            self.released.notify_all();
        }
    }

    /// Returns `true` if an unexpired lease is held on `namespace/key`.
    pub fn is_held(&self, namespace: &str, key: &str) -> bool {
        let leases = self.leases.lock().expect("lock poisoned");
        leases
            .get(&(namespace.to_string(), key.to_string()))
            .is_some_and(|held| held.expires_at > Instant::now())
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LockError::Unavailable("coordinator offline".into()));
        }
        Ok(())
    }
}

impl LockService for InMemoryLockService {
    fn try_acquire(
        &self,
        namespace: &str,
        key: &str,
        ttl: Duration,
        wait: Duration,
    ) -> Result<Option<Lease>> {
        self.check_available()?;
        let slot = (namespace.to_string(), key.to_string());
        let deadline = Instant::now() + wait;
        let mut leases = self.leases.lock().expect("lock poisoned");
        loop {
            let now = Instant::now();
            let free = match leases.get(&slot) {
                None => true,
                Some(held) if held.expires_at <= now => {
                    debug!(namespace, key, "reclaiming expired lease");
                    true
                }
                Some(_) => false,
            };
            if free {
                let lease = Lease::new(namespace, key, ttl);
                leases.insert(
                    slot,
                    Held {
                        token: lease.token,
                        expires_at: lease.expires_at,
                    },
                );
                return Ok(Some(lease));
            }

            if now >= deadline {
                return Ok(None);
            }
            // Wake on release, on the holder's expiry, or at the deadline.
            let holder_expiry = leases.get(&slot).map_or(deadline, |h| h.expires_at);
            let until = deadline.min(holder_expiry);
            let (guard, _) = self
                .released
                .wait_timeout(leases, until.saturating_duration_since(now))
                .expect("lock poisoned");
            leases = guard;
            self.check_available()?;
        }
    }

    fn renew(&self, lease: &mut Lease, ttl: Duration) -> Result<bool> {
        self.check_available()?;
        let mut leases = self.leases.lock().expect("lock poisoned");
        let slot = (lease.namespace.clone(), lease.key.clone());
        match leases.get_mut(&slot) {
            Some(held) if held.token == lease.token && held.expires_at > Instant::now() => {
                held.expires_at = Instant::now() + ttl;
                lease.expires_at = held.expires_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn release(&self, lease: &Lease) -> Result<()> {
        self.check_available()?;
        let mut leases = self.leases.lock().expect("lock poisoned");
        let slot = (lease.namespace.clone(), lease.key.clone());
        if leases.get(&slot).is_some_and(|held| held.token == lease.token) {
            leases.remove(&slot);
            self.released.notify_all();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    const TTL: Duration = Duration::from_secs(30);

    #[test]
    fn acquire_and_release() {
        let service = InMemoryLockService::new();
        let lease = service
            .try_acquire("ns", "k", TTL, Duration::ZERO)
            .unwrap()
            .unwrap();
        assert!(service.is_held("ns", "k"));
        assert!(service.try_acquire("ns", "k", TTL, Duration::ZERO).unwrap().is_none());

        service.release(&lease).unwrap();
        assert!(!service.is_held("ns", "k"));
        assert!(service.try_acquire("ns", "k", TTL, Duration::ZERO).unwrap().is_some());
    }

    #[test]
    fn keys_are_independent() {
        let service = InMemoryLockService::new();
        let _a = service.try_acquire("ns", "a", TTL, Duration::ZERO).unwrap().unwrap();
        assert!(service.try_acquire("ns", "b", TTL, Duration::ZERO).unwrap().is_some());
        assert!(service.try_acquire("other", "a", TTL, Duration::ZERO).unwrap().is_some());
    }

    #[test]
    fn expired_lease_is_reclaimed() {
        let service = InMemoryLockService::new();
        let stale = service
            .try_acquire("ns", "k", Duration::from_millis(20), Duration::ZERO)
            .unwrap()
            .unwrap();
        thread::sleep(Duration::from_millis(40));

        let fresh = service
            .try_acquire("ns", "k", TTL, Duration::ZERO)
            .unwrap()
            .unwrap();
        assert_ne!(stale.token, fresh.token);

        // The stale holder can neither renew nor release the new grant.
        let mut stale = stale;
        assert!(!service.renew(&mut stale, TTL).unwrap());
        service.release(&stale).unwrap();
        assert!(service.is_held("ns", "k"));
    }

    #[test]
    fn waiter_wakes_on_release() {
        let service = Arc::new(InMemoryLockService::new());
        let lease = service.try_acquire("ns", "k", TTL, Duration::ZERO).unwrap().unwrap();

        let waiter = {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                service
                    .try_acquire("ns", "k", TTL, Duration::from_secs(5))
                    .unwrap()
                    .is_some()
            })
        };
        thread::sleep(Duration::from_millis(20));
        service.release(&lease).unwrap();
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn renew_extends_expiry() {
        let service = InMemoryLockService::new();
        let mut lease = service
            .try_acquire("ns", "k", Duration::from_millis(50), Duration::ZERO)
            .unwrap()
            .unwrap();
        let before = lease.expires_at;
        assert!(service.renew(&mut lease, TTL).unwrap());
        assert!(lease.expires_at > before);
    }

    #[test]
    fn outage_surfaces_unavailable() {
        let service = InMemoryLockService::new();
        service.set_available(false);
        assert!(matches!(
            service.try_acquire("ns", "k", TTL, Duration::ZERO),
            Err(LockError::Unavailable(_))
        ));
        service.set_available(true);
        assert!(service.try_acquire("ns", "k", TTL, Duration::ZERO).unwrap().is_some());
    }
}
