use std::io;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use crossbeam_channel::Receiver;
use crossbeam_channel::SendTimeoutError;
use crossbeam_channel::Sender;
use crossbeam_channel::TrySendError;
use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::config::Config;
use crate::config::PoolConfig;

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

static GLOBAL: Lazy<Arc<WorkerPool>> =
    Lazy::new(|| Arc::new(WorkerPool::new(Config::global().pool.clone())));

#[derive(Debug, thiserror::Error)]
pub(crate) enum PoolError {
    #[error("all {0} workers are busy")]
    Saturated(usize),
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),
}

/// A bounded pool of threads that run enumerator traversals.
///
/// Each suspended thread-backed enumerator occupies one worker for as long as
/// its traversal is alive, so workers are not shared round-robin: an idle
/// worker takes the next traversal, and a new thread is started when none is
/// idle, up to [`PoolConfig::max_workers`]. Idle workers exit after
/// [`PoolConfig::keep_alive`].
///
/// The pool is safe to submit to from any number of threads at once. Most
/// code uses [`WorkerPool::global`].
pub struct WorkerPool {
    config: PoolConfig,
    handoff: Sender<Job>,
    idle: Receiver<Job>,
    live: Arc<AtomicUsize>,
    spawned: AtomicUsize,
}

impl WorkerPool {
    pub fn new(config: PoolConfig) -> Self {
        let (handoff, idle) = crossbeam_channel::bounded(0);
        WorkerPool {
            config,
            handoff,
            idle,
            live: Arc::new(AtomicUsize::new(0)),
            spawned: AtomicUsize::new(0),
        }
    }

    /// The process-wide pool, configured from [`Config::global`].
    pub fn global() -> Arc<WorkerPool> {
        GLOBAL.clone()
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Number of worker threads currently alive, busy or idle.
    pub fn live_workers(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Runs `job` on a worker.
    ///
    /// If no worker can take the job, the pool makes one reclamation pass,
    /// waiting up to [`PoolConfig::reclaim_grace`] for a busy worker to be
    /// released, and then retries exactly once.
    #[tracing::instrument(level = "trace", skip_all)]
    pub(crate) fn submit(&self, job: Job) -> Result<(), PoolError> {
        let job = match self.try_submit(job) {
            Ok(()) => return Ok(()),
            Err((job, reason)) => {
                tracing::debug!(
                    %reason,
                    live = self.live_workers(),
                    "worker pool cannot take traversal, reclaiming"
                );
                job
            }
        };
        let job = match self.handoff.send_timeout(job, self.config.reclaim_grace)
        {
            Ok(()) => return Ok(()),
            Err(SendTimeoutError::Timeout(job))
            | Err(SendTimeoutError::Disconnected(job)) => job,
        };
        self.try_submit(job).map_err(|(_, reason)| reason)
    }

    fn try_submit(&self, job: Job) -> Result<(), (Job, PoolError)> {
        let job = match self.handoff.try_send(job) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Full(job))
            | Err(TrySendError::Disconnected(job)) => job,
        };
        if !self.reserve() {
            return Err((job, PoolError::Saturated(self.config.max_workers)));
        }
        self.spawn(job)
    }

    fn reserve(&self) -> bool {
        let max = self.config.max_workers;
        self.live
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < max).then_some(n + 1)
            })
            .is_ok()
    }

    fn spawn(&self, job: Job) -> Result<(), (Job, PoolError)> {
        let id = self.spawned.fetch_add(1, Ordering::Relaxed);
        let mut builder =
            thread::Builder::new().name(format!("{}-{id}", self.config.thread_name));
        if let Some(bytes) = self.config.stack_size {
            builder = builder.stack_size(bytes);
        }
        // The job stays reachable from here so it can be retried if the
        // thread never starts.
        let slot = Arc::new(Mutex::new(Some(job)));
        let first = slot.clone();
        let idle = self.idle.clone();
        let keep_alive = self.config.keep_alive;
        let retire = Retire(self.live.clone());
        match builder.spawn(move || work(first, idle, keep_alive, retire)) {
            Ok(_) => {
                tracing::debug!(id, live = self.live_workers(), "spawned worker");
                Ok(())
            }
            Err(err) => match slot.lock().take() {
                Some(job) => Err((job, PoolError::Spawn(err))),
                None => Ok(()),
            },
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("config", &self.config)
            .field("live", &self.live_workers())
            .finish()
    }
}

// Gives the worker's slot back when its thread ends, however it ends.
struct Retire(Arc<AtomicUsize>);

impl Drop for Retire {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn work(
    first: Arc<Mutex<Option<Job>>>,
    idle: Receiver<Job>,
    keep_alive: Duration,
    retire: Retire,
) {
    let _retire = retire;
    let job = first.lock().take();
    if let Some(job) = job {
        job();
    }
    while let Ok(job) = idle.recv_timeout(keep_alive) {
        job();
    }
    tracing::trace!("worker retiring");
}
