//! Bounded worker pool for fire-and-forget writes.
//!
//! Jobs are queued on a bounded channel and executed by a fixed set of OS
//! threads. Submitting never blocks and never reports the job's outcome:
//! failures and panics are logged and swallowed, a full queue drops the job
//! with a warning. Jobs carry no ordering guarantee relative to each other or
//! to work done by the submitter afterwards.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::Result;

/// Default number of worker threads.
pub const DEFAULT_WORKERS: usize = 4;

/// Default queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

type Job = Box<dyn FnOnce() -> Result<()> + Send + 'static>;

struct Task {
    label: &'static str,
    collection: Arc<str>,
    job: Job,
}

/// A fixed-size pool of threads draining a bounded job queue.
pub struct WritePool {
    sender: Mutex<Option<SyncSender<Task>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WritePool {
    /// Spawn `workers` threads sharing a queue of `capacity` pending jobs.
    ///
    /// Both values are clamped to at least 1.
    pub fn new(workers: usize, capacity: usize) -> io::Result<Self> {
        let (sender, receiver) = sync_channel::<Task>(capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..workers.max(1))
            .map(|i| {
                let receiver = Arc::clone(&receiver);
                thread::Builder::new()
                    .name(format!("write-pool-{i}"))
                    .spawn(move || worker_loop(receiver))
            })
            .collect::<io::Result<Vec<_>>>()?;

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(handles),
        })
    }

    /// Pool with [`DEFAULT_WORKERS`] threads and [`DEFAULT_QUEUE_CAPACITY`].
    pub fn with_defaults() -> io::Result<Self> {
        Self::new(DEFAULT_WORKERS, DEFAULT_QUEUE_CAPACITY)
    }

    /// Queue a job. Returns whether it was accepted; the job's own outcome is
    /// never reported.
    pub fn submit<F>(&self, label: &'static str, collection: Arc<str>, job: F) -> bool
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        let guard = self.sender.lock();
        let Some(sender) = guard.as_ref() else {
            tracing::warn!(label, collection = %collection, "write pool is shut down, dropping job");
            return false;
        };

        let task = Task {
            label,
            collection,
            job: Box::new(job),
        };

        match sender.try_send(task) {
            Ok(()) => true,
            Err(TrySendError::Full(task)) => {
                tracing::warn!(
                    label = task.label,
                    collection = %task.collection,
                    "write pool queue is full, dropping job"
                );
                false
            }
            Err(TrySendError::Disconnected(task)) => {
                tracing::warn!(
                    label = task.label,
                    collection = %task.collection,
                    "write pool workers are gone, dropping job"
                );
                false
            }
        }
    }

    /// Stop accepting jobs, run everything already queued and join the workers.
    pub fn shutdown(&self) {
        self.sender.lock().take();

        let handles: Vec<_> = self.workers.lock().drain(..).collect();
        let current = thread::current().id();
        for handle in handles {
            // A job may drop the last handle to the pool from a worker thread.
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                tracing::error!("write pool thread terminated abnormally");
            }
        }
    }
}

impl Drop for WritePool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for WritePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WritePool")
            .field("open", &self.sender.lock().is_some())
            .field("workers", &self.workers.lock().len())
            .finish()
    }
}

fn worker_loop(receiver: Arc<Mutex<Receiver<Task>>>) {
    loop {
        // Holding the lock while blocked is fine: only one idle worker waits at a time.
        let next = receiver.lock().recv();
        let Ok(task) = next else {
            break;
        };

        let Task {
            label,
            collection,
            job,
        } = task;

        match panic::catch_unwind(AssertUnwindSafe(job)) {
            Ok(Ok(())) => {
                tracing::trace!(label, collection = %collection, "detached write completed");
            }
            Ok(Err(e)) => {
                tracing::warn!(label, collection = %collection, error = %e, "detached write failed");
            }
            Err(_) => {
                tracing::error!(label, collection = %collection, "detached write panicked");
            }
        }
    }
}
