//! Per-job notification state, shared between the runner and offload workers.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::job::JobId;
use crate::notify::{FailureReason, Notification, NotificationSender, Outcome};

/// Percent complete, floored and clamped to 0..=100. `None` when the total is unknown.
pub(crate) fn percent_of(downloaded: u64, total: u64) -> Option<u8> {
    if total == 0 {
        return None;
    }
    let done = u128::from(downloaded.min(total));
    Some((done * 100 / u128::from(total)) as u8)
}

#[derive(Debug, Default)]
struct ReportState {
    last_percent: Option<u8>,
    finished: bool,
}

/// Serializes one job's notifications. Progress may be reported from an offload
/// thread while the terminal comes from the scheduling thread; the lock makes
/// sure nothing is sent after the terminal and percents never go backwards.
#[derive(Debug)]
pub(crate) struct JobReporter {
    job_id: JobId,
    sender: NotificationSender,
    state: Mutex<ReportState>,
}

impl JobReporter {
    pub(crate) fn new(job_id: JobId, sender: NotificationSender) -> Self {
        Self {
            job_id,
            sender,
            state: Mutex::new(ReportState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, ReportState> {
        match self.state.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Progress callback body. Emits only when the percent increases.
    pub(crate) fn progress(&self, downloaded: u64, total: u64) {
        let Some(percent) = percent_of(downloaded, total) else {
            return;
        };
        let mut state = self.state();
        if state.finished || state.last_percent.is_some_and(|last| percent <= last) {
            return;
        }
        state.last_percent = Some(percent);
        self.sender
            .send(self.job_id, Notification::Progress { percent });
    }

    /// Emits the terminal notification. Returns false if one was already sent.
    pub(crate) fn finish(&self, outcome: Outcome) -> bool {
        let mut state = self.state();
        if state.finished {
            return false;
        }
        state.finished = true;
        self.sender.send(self.job_id, Notification::Terminal(outcome));
        true
    }
}

/// Sends `Terminal(Failure(Interrupted))` if dropped before [`TerminalGuard::complete`].
/// Covers runners aborted at shutdown.
pub(crate) struct TerminalGuard {
    reporter: Arc<JobReporter>,
}

impl TerminalGuard {
    pub(crate) fn new(reporter: Arc<JobReporter>) -> Self {
        Self { reporter }
    }

    pub(crate) fn complete(self, outcome: Outcome) {
        self.reporter.finish(outcome);
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if self
            .reporter
            .finish(Outcome::Failure(FailureReason::Interrupted))
        {
            tracing::warn!(job_id = self.reporter.job_id.0, "job interrupted before completion");
        }
    }
}
