//! Bounded pool of OS threads for blocking media calls.
//!
//! A fixed number of workers pull boxed closures from one shared FIFO queue.
//! [`OffloadPool::run`] hands a closure to the pool and awaits its result over
//! a oneshot, so the awaiting task (on the scheduling thread) never blocks.
//!
//! Dropping the pool closes the queue: workers finish what they are running,
//! skip queued work whose caller has gone away, then exit. Workers are not
//! joined; a transfer that is mid-flight keeps running to completion.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use tokio::sync::oneshot;

use crate::error::OffloadError;

type Work = Box<dyn FnOnce() + Send + 'static>;

/// Default worker count when none is configured: `min(32, cpus + 4)`.
pub fn default_worker_count() -> usize {
    let cpus = thread::available_parallelism().map_or(1, |n| n.get());
    (cpus + 4).min(32)
}

/// Fixed-size worker pool.
#[derive(Debug)]
pub struct OffloadPool {
    queue: mpsc::Sender<Work>,
    workers: usize,
}

impl OffloadPool {
    /// Spawns `workers` threads (at least one) named `ytd-offload-N`.
    pub fn new(workers: usize) -> std::io::Result<Self> {
        let workers = workers.max(1);
        let (tx, rx) = mpsc::channel::<Work>();
        let rx = Arc::new(Mutex::new(rx));
        for index in 0..workers {
            let rx = Arc::clone(&rx);
            thread::Builder::new()
                .name(format!("ytd-offload-{}", index))
                .spawn(move || worker_loop(index, &rx))?;
        }
        tracing::debug!(workers, "offload pool started");
        Ok(Self { queue: tx, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs `f` on a worker thread and waits for its result.
    ///
    /// A panic in `f` is caught and returned as [`OffloadError::Panicked`]; the
    /// worker survives. If the returned future is dropped before `f` starts,
    /// `f` is skipped.
    pub async fn run<F, T>(&self, f: F) -> Result<T, OffloadError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let work: Work = Box::new(move || {
            if tx.is_closed() {
                tracing::debug!("skipping offloaded work: caller went away");
                return;
            }
            let result = panic::catch_unwind(AssertUnwindSafe(f))
                .map_err(|payload| OffloadError::Panicked(panic_message(payload.as_ref())));
            let _ = tx.send(result);
        });
        self.queue.send(work).map_err(|_| OffloadError::Closed)?;
        rx.await.map_err(|_| OffloadError::Closed)?
    }
}

fn worker_loop(index: usize, rx: &Mutex<mpsc::Receiver<Work>>) {
    loop {
        let next = {
            let guard = match rx.lock() {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.recv()
        };
        match next {
            Ok(work) => work(),
            Err(_) => break,
        }
    }
    tracing::trace!(worker = index, "offload worker exiting");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
