//! The loop served by the scheduling thread.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};

use super::runner::JobRunner;

pub(super) enum Command {
    Run(JobRunner),
    Shutdown,
}

/// Accepts runners until `Shutdown` (or until every intake sender is gone),
/// then drains in-flight runners for up to `grace` and aborts the rest.
pub(super) async fn serve(mut intake: mpsc::UnboundedReceiver<Command>, grace: Duration) {
    let mut jobs: JoinSet<()> = JoinSet::new();

    loop {
        tokio::select! {
            command = intake.recv() => match command {
                Some(Command::Run(runner)) => {
                    tracing::trace!(job_id = runner.id().0, "scheduling job");
                    jobs.spawn(runner.run());
                }
                Some(Command::Shutdown) | None => break,
            },
            Some(joined) = jobs.join_next(), if !jobs.is_empty() => log_join(joined),
        }
    }

    intake.close();
    drain(jobs, grace).await;
}

async fn drain(mut jobs: JoinSet<()>, grace: Duration) {
    if jobs.is_empty() {
        return;
    }
    tracing::info!(in_flight = jobs.len(), grace_secs = grace.as_secs_f64(), "draining jobs");

    let wait_all = async {
        while let Some(joined) = jobs.join_next().await {
            log_join(joined);
        }
    };
    if tokio::time::timeout(grace, wait_all).await.is_err() {
        tracing::warn!(remaining = jobs.len(), "shutdown grace elapsed, interrupting jobs");
        jobs.shutdown().await;
    }
}

fn log_join(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            tracing::error!("job runner panicked: {}", e);
        }
    }
}
