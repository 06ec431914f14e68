//! Lifecycle of one job: resolve → select → transfer → terminal.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::Instrument;

use crate::job::{JobId, JobRequest};
use crate::media::{select_stream, MediaSource, StreamDescriptor};
use crate::notify::{FailureReason, NotificationSender, Outcome};
use crate::offload::OffloadPool;

use super::reporter::{JobReporter, TerminalGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobPhase {
    Resolving,
    Selecting,
    Transferring,
    Succeeded,
    Failed,
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Resolving => "resolving",
            Self::Selecting => "selecting",
            Self::Transferring => "transferring",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One submitted job, executed as a task on the scheduling context.
///
/// Every failure is turned into a terminal notification; nothing propagates
/// out of [`JobRunner::run`].
pub(crate) struct JobRunner {
    id: JobId,
    request: JobRequest,
    source: Arc<dyn MediaSource>,
    pool: Arc<OffloadPool>,
    reporter: Arc<JobReporter>,
}

impl JobRunner {
    pub(crate) fn new(
        id: JobId,
        request: JobRequest,
        source: Arc<dyn MediaSource>,
        pool: Arc<OffloadPool>,
        notifications: NotificationSender,
    ) -> Self {
        Self {
            id,
            request,
            source,
            pool,
            reporter: Arc::new(JobReporter::new(id, notifications)),
        }
    }

    pub(crate) fn id(&self) -> JobId {
        self.id
    }

    pub(crate) async fn run(self) {
        let span = tracing::debug_span!(
            "job",
            job_id = self.id.0,
            kind = %self.request.kind(),
            source = self.source.name(),
        );
        let guard = TerminalGuard::new(Arc::clone(&self.reporter));
        let outcome = self.execute().instrument(span).await;
        match &outcome {
            Outcome::Success { path } => {
                tracing::info!(job_id = self.id.0, path = %path.display(), "job succeeded");
            }
            Outcome::Failure(reason) => {
                tracing::warn!(job_id = self.id.0, %reason, "job failed");
            }
        }
        guard.complete(outcome);
    }

    async fn execute(&self) -> Outcome {
        self.enter(JobPhase::Resolving);
        let streams = match self.resolve().await {
            Ok(streams) => streams,
            Err(detail) => return self.fail(FailureReason::Resolution(detail)),
        };

        self.enter(JobPhase::Selecting);
        let kind = self.request.kind();
        let Some(stream) = select_stream(&streams, kind).cloned() else {
            tracing::debug!(candidates = streams.len(), "no stream matches requested kind");
            return self.fail(FailureReason::NoStreamAvailable(kind));
        };
        tracing::debug!(
            stream = %stream.id,
            quality = stream.quality_rank,
            size = stream.total_size_bytes,
            "selected stream"
        );

        self.enter(JobPhase::Transferring);
        match self.transfer(stream).await {
            Ok(path) => {
                self.enter(JobPhase::Succeeded);
                Outcome::Success { path }
            }
            Err(detail) => self.fail(FailureReason::Transfer(detail)),
        }
    }

    fn enter(&self, phase: JobPhase) {
        tracing::debug!(%phase, "job phase");
    }

    fn fail(&self, reason: FailureReason) -> Outcome {
        self.enter(JobPhase::Failed);
        Outcome::Failure(reason)
    }

    async fn resolve(&self) -> Result<Vec<StreamDescriptor>, String> {
        let source = Arc::clone(&self.source);
        let target = self.request.target().to_string();
        let proxy = self.request.proxy().map(str::to_string);
        match self
            .pool
            .run(move || source.resolve(&target, proxy.as_deref()))
            .await
        {
            Ok(Ok(streams)) => Ok(streams),
            Ok(Err(e)) => Err(format!("{:#}", e)),
            Err(e) => Err(e.to_string()),
        }
    }

    async fn transfer(&self, stream: StreamDescriptor) -> Result<PathBuf, String> {
        let source = Arc::clone(&self.source);
        let reporter = Arc::clone(&self.reporter);
        let target = self.request.target().to_string();
        let dir = self.request.destination_dir().to_path_buf();
        let proxy = self.request.proxy().map(str::to_string);
        let result = self
            .pool
            .run(move || {
                let mut on_progress = |done: u64, total: u64| reporter.progress(done, total);
                source.transfer(&target, &stream, &dir, proxy.as_deref(), &mut on_progress)
            })
            .await;
        match result {
            Ok(Ok(path)) => Ok(path),
            Ok(Err(e)) => Err(format!("{:#}", e)),
            Err(e) => Err(e.to_string()),
        }
    }
}
