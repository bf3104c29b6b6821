use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender};
use rand::Rng;
use tracing::{debug, warn};

use crate::config::LockConfig;
use crate::error::{LockError, Result};
use crate::traits::{Lease, LockService};

/// Exclusive lock over `namespace/key`, built on a [`LockService`].
///
/// [`acquire`](Self::acquire) blocks until the lease is granted, retrying on
/// per-attempt timeouts and on coordinator outages with capped exponential
/// backoff plus jitter. The returned [`LockGuard`] keeps the lease renewed
/// until it is released or dropped.
#[derive(Clone)]
pub struct DistributedLock {
    service: Arc<dyn LockService>,
    config: LockConfig,
}

impl DistributedLock {
    pub fn new(service: Arc<dyn LockService>, config: LockConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { service, config })
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    /// Block until the lease on `namespace/key` is held.
    ///
    /// Fails with [`LockError::Exhausted`] only when `max_attempts` is set.
    pub fn acquire(&self, namespace: &str, key: &str) -> Result<LockGuard> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.service.try_acquire(
                namespace,
                key,
                self.config.lease_ttl,
                self.config.attempt_timeout,
            ) {
                Ok(Some(lease)) => {
                    debug!(namespace, key, attempt, token = %lease.token, "lock acquired");
                    return Ok(LockGuard::start(
                        Arc::clone(&self.service),
                        lease,
                        &self.config,
                    ));
                }
                Ok(None) => {
                    debug!(namespace, key, attempt, "lock attempt timed out");
                }
                Err(LockError::Unavailable(reason)) => {
                    warn!(namespace, key, attempt, %reason, "lock service unavailable; retrying");
                }
                Err(e) => return Err(e),
            }

            if self.config.max_attempts.is_some_and(|max| attempt >= max) {
                return Err(LockError::Exhausted {
                    namespace: namespace.to_string(),
                    key: key.to_string(),
                    attempts: attempt,
                });
            }
            thread::sleep(jittered(self.config.backoff(attempt)));
        }
    }
}

/// Half the base delay plus a uniform share of the other half.
fn jittered(base: Duration) -> Duration {
    let half = base / 2;
    let spread = half.as_millis() as u64;
    let extra = if spread == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..=spread)
    };
    half + Duration::from_millis(extra)
}

impl std::fmt::Debug for DistributedLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributedLock")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// LockGuard
// ---------------------------------------------------------------------------

/// A held lease. Renewed in the background; released on drop.
///
/// Release failures are logged, not returned: the lease TTL reclaims the key
/// either way.
pub struct LockGuard {
    service: Arc<dyn LockService>,
    lease: Arc<Mutex<Lease>>,
    stop: Option<Sender<()>>,
    renewer: Option<JoinHandle<()>>,
}

impl LockGuard {
    fn start(service: Arc<dyn LockService>, lease: Lease, config: &LockConfig) -> Self {
        let lease = Arc::new(Mutex::new(lease));
        let (stop, stopped) = crossbeam_channel::bounded::<()>(1);
        let interval = config.renew_interval();
        let ttl = config.lease_ttl;

        let renewer = {
            let service = Arc::clone(&service);
            let lease = Arc::clone(&lease);
            thread::Builder::new()
                .name("arca-lock-renew".into())
                .spawn(move || loop {
                    match stopped.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        // Stop signal or guard dropped.
                        _ => break,
                    }
                    let mut lease = lease.lock().expect("lock poisoned");
                    match service.renew(&mut lease, ttl) {
                        Ok(true) => debug!(key = %lease.key, "lease renewed"),
                        Ok(false) => {
                            warn!(namespace = %lease.namespace, key = %lease.key, "lease lost before renewal");
                            break;
                        }
                        Err(e) => {
                            warn!(namespace = %lease.namespace, key = %lease.key, error = %e, "lease renewal failed");
                        }
                    }
                })
        };

        let renewer = match renewer {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(error = %e, "cannot spawn lease renewer; relying on TTL");
                None
            }
        };

        Self {
            service,
            lease,
            stop: Some(stop),
            renewer,
        }
    }

    pub fn namespace(&self) -> String {
        self.lease.lock().expect("lock poisoned").namespace.clone()
    }

    pub fn key(&self) -> String {
        self.lease.lock().expect("lock poisoned").key.clone()
    }

    /// Stop renewal and release the lease now.
    pub fn release(mut self) -> Result<()> {
        self.finish()
    }

    fn finish(&mut self) -> Result<()> {
        let Some(stop) = self.stop.take() else {
            return Ok(());
        };
        drop(stop);
        if let Some(renewer) = self.renewer.take() {
            if renewer.join().is_err() {
                warn!("lease renewer panicked");
            }
        }
        let lease = self.lease.lock().expect("lock poisoned");
        self.service.release(&lease)
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            let lease = self.lease.lock().expect("lock poisoned");
            warn!(namespace = %lease.namespace, key = %lease.key, error = %e, "lease release failed");
        }
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lease = self.lease.lock().expect("lock poisoned");
        f.debug_struct("LockGuard")
            .field("namespace", &lease.namespace)
            .field("key", &lease.key)
            .field("token", &lease.token)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryLockService;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    fn fast_config() -> LockConfig {
        LockConfig {
            lease_ttl: Duration::from_secs(30),
            attempt_timeout: Duration::from_millis(20),
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            max_attempts: None,
        }
    }

    #[test]
    fn guard_releases_on_drop() {
        let service = Arc::new(InMemoryLockService::new());
        let lock = DistributedLock::new(service.clone(), fast_config()).unwrap();
        {
            let guard = lock.acquire("object-write", "k").unwrap();
            assert_eq!(guard.key(), "k");
            assert!(service.is_held("object-write", "k"));
        }
        assert!(!service.is_held("object-write", "k"));
    }

    #[test]
    fn explicit_release() {
        let service = Arc::new(InMemoryLockService::new());
        let lock = DistributedLock::new(service.clone(), fast_config()).unwrap();
        let guard = lock.acquire("ns", "k").unwrap();
        guard.release().unwrap();
        assert!(!service.is_held("ns", "k"));
    }

    #[test]
    fn critical_sections_do_not_overlap() {
        let service = Arc::new(InMemoryLockService::new());
        let lock = DistributedLock::new(service, fast_config()).unwrap();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lock = lock.clone();
                let inside = Arc::clone(&inside);
                let max_seen = Arc::clone(&max_seen);
                thread::spawn(move || {
                    let _guard = lock.acquire("ns", "shared").unwrap();
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(5));
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn retries_through_outage() {
        let service = Arc::new(InMemoryLockService::new());
        service.set_available(false);
        let lock = DistributedLock::new(service.clone(), fast_config()).unwrap();

        let restorer = {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(30));
                service.set_available(true);
            })
        };
        let guard = lock.acquire("ns", "k").unwrap();
        restorer.join().unwrap();
        drop(guard);
    }

    #[test]
    fn bounded_attempts_give_up() {
        let service = Arc::new(InMemoryLockService::new());
        let config = LockConfig {
            max_attempts: Some(3),
            ..fast_config()
        };
        let lock = DistributedLock::new(service.clone(), config).unwrap();
        let _held = lock.acquire("ns", "k").unwrap();

        let err = lock.acquire("ns", "k").unwrap_err();
        assert!(matches!(err, LockError::Exhausted { attempts: 3, .. }));
    }

    #[test]
    fn renewal_outlives_ttl() {
        let service = Arc::new(InMemoryLockService::new());
        let config = LockConfig {
            lease_ttl: Duration::from_millis(60),
            ..fast_config()
        };
        let lock = DistributedLock::new(service.clone(), config).unwrap();
        let guard = lock.acquire("ns", "k").unwrap();

        let start = Instant::now();
        while start.elapsed() < Duration::from_millis(200) {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(service.is_held("ns", "k"));
        drop(guard);
        assert!(!service.is_held("ns", "k"));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let base = Duration::from_millis(100);
        for _ in 0..50 {
            let d = jittered(base);
            assert!(d >= Duration::from_millis(50) && d <= base);
        }
        assert_eq!(jittered(Duration::ZERO), Duration::ZERO);
    }
}
