//! Background media download engine.
//!
//! A [`TaskExecutor`] owns one scheduling thread. Jobs submitted to it are
//! resolved, matched to a stream and transferred to disk without blocking the
//! submitter; each job reports progress and exactly one terminal outcome on a
//! [`notify`] channel.

pub mod config;
pub mod error;
pub mod executor;
pub mod job;
pub mod logging;
pub mod media;
pub mod notify;
pub mod offload;
pub mod proxy;
pub mod sources;

pub use crate::error::{ExecutorError, OffloadError, ValidationError};
pub use crate::executor::{ExecutorConfig, ExecutorState, TaskExecutor};
pub use crate::job::{JobHandle, JobId, JobRequest, MediaKind};
pub use crate::notify::{FailureReason, JobEvent, Notification, Outcome};
