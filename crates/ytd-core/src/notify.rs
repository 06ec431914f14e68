//! Notification channel from job runners to the consumer.
//!
//! One unbounded FIFO shared by all jobs. Senders are cheap to clone and may be
//! used from any thread (scheduling thread, offload workers); nothing is ever
//! dropped while the receiver is alive. Within one job, notifications arrive in
//! the order they were sent. Across jobs there is no ordering guarantee.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::job::{JobId, MediaKind};

/// Why a job failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// The media source could not look up the target.
    Resolution(String),
    /// No resolved stream matches the requested kind.
    NoStreamAvailable(MediaKind),
    /// The byte transfer failed (I/O, connection drop, ...).
    Transfer(String),
    /// The executor shut down before the job finished.
    Interrupted,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolution(detail) => write!(f, "could not resolve target: {}", detail),
            Self::NoStreamAvailable(kind) => write!(f, "no suitable {} stream found", kind),
            Self::Transfer(detail) => write!(f, "download failed: {}", detail),
            Self::Interrupted => write!(f, "interrupted by shutdown"),
        }
    }
}

/// Final result of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Success { path: PathBuf },
    Failure(FailureReason),
}

/// One event in a job's stream. `Terminal` is always the last one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    Progress { percent: u8 },
    Terminal(Outcome),
}

impl Notification {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal(_))
    }
}

/// A notification tagged with the job it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobEvent {
    pub job_id: JobId,
    #[serde(flatten)]
    pub notification: Notification,
}

/// Creates a connected sender/receiver pair.
pub fn channel() -> (NotificationSender, NotificationReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (NotificationSender { tx }, NotificationReceiver { rx })
}

/// Sending half; clone freely across threads.
#[derive(Debug, Clone)]
pub struct NotificationSender {
    tx: mpsc::UnboundedSender<JobEvent>,
}

impl NotificationSender {
    /// Enqueues a notification. Never blocks. If the receiver is gone the event
    /// has nobody to observe it and is discarded.
    pub fn send(&self, job_id: JobId, notification: Notification) {
        if self
            .tx
            .send(JobEvent {
                job_id,
                notification,
            })
            .is_err()
        {
            tracing::trace!(job_id = job_id.0, "notification receiver closed");
        }
    }

    /// True once the receiver has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half, owned by the consumer.
#[derive(Debug)]
pub struct NotificationReceiver {
    rx: mpsc::UnboundedReceiver<JobEvent>,
}

impl NotificationReceiver {
    /// Waits for the next event. `None` once every sender is dropped and the
    /// queue is empty.
    pub async fn recv(&mut self) -> Option<JobEvent> {
        self.rx.recv().await
    }

    /// Blocking variant for consumers running on a plain thread. Must not be
    /// called from inside an async runtime.
    pub fn blocking_recv(&mut self) -> Option<JobEvent> {
        self.rx.blocking_recv()
    }

    /// Returns an already-queued event, if any.
    pub fn try_recv(&mut self) -> Option<JobEvent> {
        self.rx.try_recv().ok()
    }
}
