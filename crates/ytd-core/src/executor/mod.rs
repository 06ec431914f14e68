//! Task executor: one persistent background thread owning a scheduling context.
//!
//! `start` spawns the thread, which builds a current-thread tokio runtime and
//! serves jobs until shutdown. `submit` hands a job to that thread over a
//! channel and returns immediately. Each job runs as its own task, so many jobs
//! interleave on the one thread; their blocking media calls go to the
//! [`OffloadPool`]. Notifications flow back through the
//! [`NotificationSender`] given at construction.
//!
//! ```text
//! NotStarted --start--> Running --shutdown--> Stopping --> Stopped
//! ```

mod event_loop;
mod reporter;
mod runner;

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc as std_mpsc, Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::ExecutorError;
use crate::job::{JobHandle, JobId, JobRequest};
use crate::media::MediaSource;
use crate::notify::NotificationSender;
use crate::offload::{self, OffloadPool};

use self::event_loop::Command;
use self::runner::JobRunner;

/// Tunables for [`TaskExecutor`].
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Number of offload worker threads (clamped to at least 1).
    pub offload_workers: usize,
    /// How long `shutdown` lets in-flight jobs finish before interrupting them.
    pub shutdown_grace: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            offload_workers: offload::default_worker_count(),
            shutdown_grace: Duration::from_secs(30),
        }
    }
}

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    NotStarted,
    Running,
    Stopping,
    Stopped,
}

enum Lifecycle {
    NotStarted,
    Running {
        intake: mpsc::UnboundedSender<Command>,
        thread: thread::JoinHandle<()>,
        pool: Arc<OffloadPool>,
    },
    Stopping,
    Stopped,
}

/// Long-lived place where jobs run without blocking the submitting thread.
pub struct TaskExecutor {
    source: Arc<dyn MediaSource>,
    notifications: NotificationSender,
    config: ExecutorConfig,
    next_id: AtomicU64,
    lifecycle: Mutex<Lifecycle>,
    stopped: Condvar,
}

impl TaskExecutor {
    pub fn new(
        source: Arc<dyn MediaSource>,
        notifications: NotificationSender,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            source,
            notifications,
            config,
            next_id: AtomicU64::new(1),
            lifecycle: Mutex::new(Lifecycle::NotStarted),
            stopped: Condvar::new(),
        }
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        match self.lifecycle.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn state(&self) -> ExecutorState {
        match *self.lifecycle() {
            Lifecycle::NotStarted => ExecutorState::NotStarted,
            Lifecycle::Running { .. } => ExecutorState::Running,
            Lifecycle::Stopping => ExecutorState::Stopping,
            Lifecycle::Stopped => ExecutorState::Stopped,
        }
    }

    /// Spawns the scheduling thread and the offload pool. Can succeed at most once;
    /// any later call fails with [`ExecutorError::AlreadyStarted`].
    pub fn start(&self) -> Result<(), ExecutorError> {
        let mut lifecycle = self.lifecycle();
        if !matches!(*lifecycle, Lifecycle::NotStarted) {
            return Err(ExecutorError::AlreadyStarted);
        }

        let pool = Arc::new(
            OffloadPool::new(self.config.offload_workers).map_err(ExecutorError::Runtime)?,
        );
        let (intake_tx, intake_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = std_mpsc::channel::<io::Result<()>>();
        let grace = self.config.shutdown_grace;

        let thread = thread::Builder::new()
            .name("ytd-scheduler".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()
                {
                    Ok(rt) => {
                        let _ = ready_tx.send(Ok(()));
                        rt
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                runtime.block_on(event_loop::serve(intake_rx, grace));
                tracing::debug!("scheduling context exited");
            })
            .map_err(ExecutorError::Runtime)?;

        let ready = ready_rx.recv().unwrap_or_else(|_| {
            Err(io::Error::new(
                io::ErrorKind::Other,
                "scheduling thread exited during startup",
            ))
        });
        if let Err(e) = ready {
            let _ = thread.join();
            return Err(ExecutorError::Runtime(e));
        }

        tracing::info!(
            offload_workers = pool.workers(),
            grace_secs = grace.as_secs_f64(),
            "task executor started"
        );
        *lifecycle = Lifecycle::Running {
            intake: intake_tx,
            thread,
            pool,
        };
        Ok(())
    }

    /// Hands `request` to the scheduling thread and returns without waiting.
    pub fn submit(&self, request: JobRequest) -> Result<JobHandle, ExecutorError> {
        let lifecycle = self.lifecycle();
        let Lifecycle::Running { intake, pool, .. } = &*lifecycle else {
            return Err(ExecutorError::NotRunning);
        };

        let id = JobId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let handle = JobHandle::new(id, request.target());
        let kind = request.kind();
        let runner = JobRunner::new(
            id,
            request,
            Arc::clone(&self.source),
            Arc::clone(pool),
            self.notifications.clone(),
        );
        intake
            .send(Command::Run(runner))
            .map_err(|_| ExecutorError::NotRunning)?;

        tracing::info!(job_id = id.0, target = handle.target(), %kind, "job submitted");
        Ok(handle)
    }

    /// Stops accepting jobs, lets the scheduling context drain (bounded by
    /// `shutdown_grace`), and blocks until the background thread has exited.
    ///
    /// No-op before `start` and after `Stopped`. A call that finds another
    /// shutdown in progress waits for it to finish. Transfers already running
    /// on the offload pool are not killed.
    pub fn shutdown(&self) {
        let (intake, thread, pool) = {
            let mut lifecycle = self.lifecycle();
            match std::mem::replace(&mut *lifecycle, Lifecycle::Stopping) {
                Lifecycle::Running {
                    intake,
                    thread,
                    pool,
                } => (intake, thread, pool),
                Lifecycle::Stopping => {
                    tracing::debug!("shutdown already in progress, waiting");
                    let _stopped = self
                        .stopped
                        .wait_while(lifecycle, |l| matches!(l, Lifecycle::Stopping))
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                    return;
                }
                other => {
                    *lifecycle = other;
                    return;
                }
            }
        };

        tracing::info!("task executor stopping");
        let _ = intake.send(Command::Shutdown);
        drop(intake);
        if thread.join().is_err() {
            tracing::error!("scheduling thread panicked");
        }
        drop(pool);

        *self.lifecycle() = Lifecycle::Stopped;
        self.stopped.notify_all();
        tracing::info!("task executor stopped");
    }
}

impl Drop for TaskExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::MediaKind;
    use crate::media::StreamDescriptor;
    use crate::notify;
    use std::path::{Path, PathBuf};

    struct Unreachable;

    impl MediaSource for Unreachable {
        fn name(&self) -> &'static str {
            "unreachable"
        }

        fn resolve(&self, _: &str, _: Option<&str>) -> anyhow::Result<Vec<StreamDescriptor>> {
            anyhow::bail!("offline")
        }

        fn transfer(
            &self,
            _: &str,
            _: &StreamDescriptor,
            _: &Path,
            _: Option<&str>,
            _: &mut crate::media::ProgressFn<'_>,
        ) -> anyhow::Result<PathBuf> {
            anyhow::bail!("offline")
        }
    }

    fn executor() -> TaskExecutor {
        let (tx, _rx) = notify::channel();
        TaskExecutor::new(
            Arc::new(Unreachable),
            tx,
            ExecutorConfig {
                offload_workers: 1,
                shutdown_grace: Duration::from_secs(1),
            },
        )
    }

    fn request() -> JobRequest {
        JobRequest::new("t", "/tmp", None, MediaKind::Video).unwrap()
    }

    #[test]
    fn lifecycle_transitions() {
        let ex = executor();
        assert_eq!(ex.state(), ExecutorState::NotStarted);
        ex.start().unwrap();
        assert_eq!(ex.state(), ExecutorState::Running);
        ex.shutdown();
        assert_eq!(ex.state(), ExecutorState::Stopped);
    }

    #[test]
    fn shutdown_before_start_is_noop() {
        let ex = executor();
        ex.shutdown();
        assert_eq!(ex.state(), ExecutorState::NotStarted);
        ex.start().unwrap();
        ex.shutdown();
    }

    #[test]
    fn start_after_stop_is_rejected() {
        let ex = executor();
        ex.start().unwrap();
        ex.shutdown();
        assert!(matches!(ex.start(), Err(ExecutorError::AlreadyStarted)));
    }

    #[test]
    fn job_ids_are_sequential() {
        let ex = executor();
        ex.start().unwrap();
        let a = ex.submit(request()).unwrap();
        let b = ex.submit(request()).unwrap();
        assert_eq!(a.id(), JobId(1));
        assert_eq!(b.id(), JobId(2));
        ex.shutdown();
    }

    struct Slow;

    impl MediaSource for Slow {
        fn name(&self) -> &'static str {
            "slow"
        }

        fn resolve(&self, _: &str, _: Option<&str>) -> anyhow::Result<Vec<StreamDescriptor>> {
            thread::sleep(Duration::from_millis(300));
            Ok(Vec::new())
        }

        fn transfer(
            &self,
            _: &str,
            _: &StreamDescriptor,
            _: &Path,
            _: Option<&str>,
            _: &mut crate::media::ProgressFn<'_>,
        ) -> anyhow::Result<PathBuf> {
            anyhow::bail!("never selected")
        }
    }

    #[test]
    fn concurrent_shutdowns_all_wait_for_stopped() {
        let (tx, _rx) = notify::channel();
        let ex = TaskExecutor::new(
            Arc::new(Slow),
            tx,
            ExecutorConfig {
                offload_workers: 1,
                shutdown_grace: Duration::from_secs(5),
            },
        );
        ex.start().unwrap();
        ex.submit(request()).unwrap();

        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    ex.shutdown();
                    assert_eq!(ex.state(), ExecutorState::Stopped);
                });
            }
        });
    }

    #[test]
    fn drop_shuts_down() {
        let ex = executor();
        ex.start().unwrap();
        ex.submit(request()).unwrap();
        drop(ex);
    }
}
