//! Error types surfaced synchronously to callers.
//!
//! Job-level failures (resolution, selection, transfer) are not errors in this
//! sense: the runner turns them into a terminal notification instead. See
//! [`crate::notify::FailureReason`].

use std::io;

/// Rejected input, before any job is created.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The target identifier was empty (after trimming).
    #[error("target is required")]
    EmptyTarget,
    /// The proxy string does not match `http(s)://host[:port]`.
    #[error("invalid proxy format: {0:?} (expected http://host:port)")]
    InvalidProxy(String),
}

/// Lifecycle misuse of [`crate::executor::TaskExecutor`].
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// `submit` was called before `start` or after `shutdown`.
    #[error("task executor is not running")]
    NotRunning,
    /// `start` was called more than once.
    #[error("task executor was already started")]
    AlreadyStarted,
    /// The background thread or its scheduling context could not be created.
    #[error("failed to start scheduling thread: {0}")]
    Runtime(#[source] io::Error),
}

/// Failure to run a closure on the offload pool.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum OffloadError {
    /// The pool is shut down, or the work was dropped before it produced a result.
    #[error("offload pool is closed")]
    Closed,
    /// The closure panicked on the worker thread.
    #[error("offloaded work panicked: {0}")]
    Panicked(String),
}
