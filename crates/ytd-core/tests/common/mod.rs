#![allow(dead_code)]

pub mod fake_source;
pub mod media_server;

use std::collections::HashMap;
use std::time::Duration;

use ytd_core::notify::{JobEvent, NotificationReceiver};
use ytd_core::JobId;

/// Reads events until `jobs` terminal notifications have arrived, grouped by job.
pub async fn collect_until_terminals(
    rx: &mut NotificationReceiver,
    jobs: usize,
    limit: Duration,
) -> HashMap<JobId, Vec<JobEvent>> {
    let mut by_job: HashMap<JobId, Vec<JobEvent>> = HashMap::new();
    let mut terminals = 0;
    while terminals < jobs {
        let event = tokio::time::timeout(limit, rx.recv())
            .await
            .expect("timed out waiting for notifications")
            .expect("notification channel closed");
        if event.notification.is_terminal() {
            terminals += 1;
        }
        by_job.entry(event.job_id).or_default().push(event);
    }
    by_job
}
