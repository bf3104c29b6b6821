use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Bounded worker pool with caller-runs backpressure.
///
/// Jobs are queued on a channel of fixed depth and picked up by a fixed set
/// of worker threads. When the queue is full the submitting thread runs the
/// job itself, so work is never buffered without bound and never dropped.
///
/// The pool is drained and its workers joined by [`WorkerPool::shutdown`],
/// which also runs on drop. Jobs submitted after shutdown run on the caller.
pub struct WorkerPool {
    name: String,
    sender: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    caller_runs: AtomicU64,
}

impl WorkerPool {
    /// Spawn `threads` workers sharing a queue of `queue_depth` jobs.
    pub fn new(name: impl Into<String>, threads: usize, queue_depth: usize) -> StoreResult<Self> {
        let name = name.into();
        if threads == 0 {
            return Err(StoreError::InvalidConfig("pool needs at least one thread".into()));
        }
        if queue_depth == 0 {
            return Err(StoreError::InvalidConfig("pool queue depth must be positive".into()));
        }

        let (tx, rx) = crossbeam_channel::bounded::<Job>(queue_depth);
        let mut workers = Vec::with_capacity(threads);
        for index in 0..threads {
            let rx = rx.clone();
            let handle = thread::Builder::new()
                .name(format!("{name}-{index}"))
                .spawn(move || worker_loop(rx))?;
            workers.push(handle);
        }

        debug!(pool = %name, threads, queue_depth, "worker pool started");
        Ok(Self {
            name,
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
            caller_runs: AtomicU64::new(0),
        })
    }

    /// Submit a job. Runs it on the calling thread if the queue is full.
    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let job: Job = Box::new(job);
        let sender = self.sender.lock().expect("pool lock poisoned").clone();
        let Some(sender) = sender else {
            job();
            return;
        };
        match sender.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(job)) => {
                self.caller_runs.fetch_add(1, Ordering::Relaxed);
                debug!(pool = %self.name, "queue full; running job on caller");
                job();
            }
            Err(TrySendError::Disconnected(job)) => job(),
        }
    }

    /// Number of jobs that ran on a submitting thread because the queue was full.
    pub fn caller_run_count(&self) -> u64 {
        self.caller_runs.load(Ordering::Relaxed)
    }

    /// Pool name, used for thread names and logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stop accepting queued work, drain the queue and join every worker.
    ///
    /// Idempotent. When called from one of the pool's own workers (the last
    /// owner dropped inside a job), that worker is not joined; it exits once
    /// its current job returns and the queue is empty.
    pub fn shutdown(&self) {
        let sender = self.sender.lock().expect("pool lock poisoned").take();
        if sender.is_none() {
            return;
        }
        drop(sender);

        let current = thread::current().id();
        let workers = std::mem::take(&mut *self.workers.lock().expect("pool lock poisoned"));
        for handle in workers {
            if handle.thread().id() == current {
                debug!(pool = %self.name, "shutdown running on a pool worker; not joining it");
                continue;
            }
            if handle.join().is_err() {
                warn!(pool = %self.name, "worker thread panicked");
            }
        }
        info!(pool = %self.name, "worker pool shut down");
    }
}

fn worker_loop(rx: Receiver<Job>) {
    // Ends once every sender is gone and the queue is drained.
    for job in rx {
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            warn!("pool job panicked");
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.name)
            .field("caller_runs", &self.caller_run_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Barrier};
    use std::time::Duration;

    #[test]
    fn rejects_zero_sizes() {
        assert!(matches!(WorkerPool::new("p", 0, 4), Err(StoreError::InvalidConfig(_))));
        assert!(matches!(WorkerPool::new("p", 1, 0), Err(StoreError::InvalidConfig(_))));
    }

    #[test]
    fn runs_all_jobs_before_shutdown_returns() {
        let pool = WorkerPool::new("count", 4, 16).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..100 {
            let counter = Arc::clone(&counter);
            pool.execute(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.shutdown();
        assert_eq!(counter.load(Ordering::SeqCst), 100);
    }

    #[test]
    fn full_queue_runs_on_caller() {
        let pool = WorkerPool::new("backpressure", 1, 1).unwrap();
        let gate = Arc::new(Barrier::new(2));

        // Occupy the single worker until the barrier is released.
        let (started_tx, started_rx) = crossbeam_channel::bounded(1);
        let held = Arc::clone(&gate);
        pool.execute(move || {
            started_tx.send(()).unwrap();
            held.wait();
        });
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        // Fills the queue.
        pool.execute(|| {});

        // Queue is full: this one must run right here.
        let caller = thread::current().id();
        let ran_on = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&ran_on);
        pool.execute(move || {
            *slot.lock().unwrap() = Some(thread::current().id());
        });
        assert_eq!(*ran_on.lock().unwrap(), Some(caller));
        assert_eq!(pool.caller_run_count(), 1);

        gate.wait();
        pool.shutdown();
    }

    #[test]
    fn execute_after_shutdown_runs_inline() {
        let pool = WorkerPool::new("closed", 1, 1).unwrap();
        pool.shutdown();
        pool.shutdown();
        let ran = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&ran);
        pool.execute(move || {
            flag.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_job_does_not_kill_worker() {
        let pool = WorkerPool::new("panics", 1, 4).unwrap();
        pool.execute(|| panic!("boom"));
        let (tx, rx) = crossbeam_channel::bounded(1);
        pool.execute(move || tx.send(7).unwrap());
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 7);
    }

    #[test]
    fn dropping_last_owner_inside_a_job_does_not_self_join() {
        let pool = Arc::new(WorkerPool::new("self-drop", 2, 4).unwrap());
        let (go_tx, go_rx) = crossbeam_channel::bounded::<()>(0);
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);

        let owned = Arc::clone(&pool);
        pool.execute(move || {
            go_rx.recv().unwrap();
            // Last reference: the pool shuts down on this worker.
            drop(owned);
            done_tx.send(thread::current().name().map(str::to_owned)).unwrap();
        });
        drop(pool);
        go_tx.send(()).unwrap();

        let ran_on = done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(ran_on.unwrap().starts_with("self-drop-"));
    }
}
