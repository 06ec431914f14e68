//! Video/audio commands: validate input, run the jobs on a task executor and
//! print their notifications until every job has finished.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ytd_core::config::YtdConfig;
use ytd_core::notify::{self, JobEvent, NotificationReceiver};
use ytd_core::{proxy, sources};
use ytd_core::{JobHandle, JobId, JobRequest, MediaKind, Notification, Outcome, TaskExecutor};

use crate::cli::FetchArgs;

/// Runs one job per target. Returns Ok(false) if any job failed.
pub fn run_fetch(cfg: &YtdConfig, kind: MediaKind, args: &FetchArgs) -> Result<bool> {
    let requests = build_requests(cfg, kind, args)?;

    let (tx, mut rx) = notify::channel();
    let executor = TaskExecutor::new(sources::build_source(cfg), tx, cfg.executor_config());
    executor.start()?;

    let result = submit_and_wait(&executor, requests, &mut rx, args.json);
    executor.shutdown();
    result
}

/// Checks done before anything is submitted: non-empty targets, an existing
/// writable destination, and a well-formed proxy.
fn build_requests(cfg: &YtdConfig, kind: MediaKind, args: &FetchArgs) -> Result<Vec<JobRequest>> {
    let dir = match args.dir.clone().or_else(|| cfg.download_dir.clone()) {
        Some(d) => d,
        None => std::env::current_dir().context("current directory")?,
    };
    check_destination(&dir)?;

    let proxy = proxy::parse_proxy(args.proxy.as_deref().or(cfg.proxy.as_deref()))?;

    args.targets
        .iter()
        .map(|t| JobRequest::new(t, &dir, proxy.as_deref(), kind).map_err(anyhow::Error::from))
        .collect()
}

fn check_destination(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("directory does not exist: {}", dir.display());
    }
    if !is_writable(dir) {
        anyhow::bail!("directory is not writable: {}", dir.display());
    }
    Ok(())
}

#[cfg(unix)]
fn is_writable(dir: &Path) -> bool {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let Ok(c_path) = CString::new(dir.as_os_str().as_bytes()) else {
        return false;
    };
    // SAFETY: c_path is a valid NUL-terminated string for the duration of the call.
    unsafe { libc::access(c_path.as_ptr(), libc::W_OK) == 0 }
}

#[cfg(not(unix))]
fn is_writable(dir: &Path) -> bool {
    std::fs::metadata(dir)
        .map(|m| !m.permissions().readonly())
        .unwrap_or(false)
}

fn submit_and_wait(
    executor: &TaskExecutor,
    requests: Vec<JobRequest>,
    rx: &mut NotificationReceiver,
    json: bool,
) -> Result<bool> {
    let mut pending: HashMap<JobId, JobHandle> = HashMap::new();
    for request in requests {
        let handle = executor.submit(request)?;
        if !json {
            println!("[job {}] queued: {}", handle.id(), handle.target());
        }
        pending.insert(handle.id(), handle);
    }

    let mut all_ok = true;
    while !pending.is_empty() {
        let Some(event) = rx.blocking_recv() else {
            anyhow::bail!("notification channel closed with {} job(s) pending", pending.len());
        };
        if json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            println!("{}", render(&event));
        }
        if let Notification::Terminal(outcome) = &event.notification {
            if let Some(handle) = pending.remove(&event.job_id) {
                tracing::debug!(job = %handle, "job finished");
            }
            all_ok &= matches!(outcome, Outcome::Success { .. });
        }
    }
    Ok(all_ok)
}

fn render(event: &JobEvent) -> String {
    let id = event.job_id;
    match &event.notification {
        Notification::Progress { percent } => format!("[job {}] {}%", id, percent),
        Notification::Terminal(Outcome::Success { path }) => {
            format!("[job {}] saved: {}", id, path.display())
        }
        Notification::Terminal(Outcome::Failure(reason)) => {
            format!("[job {}] failed: {}", id, reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ytd_core::FailureReason;

    fn args(targets: &[&str], dir: Option<PathBuf>, proxy: Option<&str>) -> FetchArgs {
        FetchArgs {
            targets: targets.iter().map(|s| s.to_string()).collect(),
            dir,
            proxy: proxy.map(str::to_string),
            json: false,
        }
    }

    #[test]
    fn requests_use_dir_and_proxy() {
        let tmp = tempfile::tempdir().unwrap();
        let a = args(
            &["https://example.com/watch?v=1", "https://example.com/a.mp3"],
            Some(tmp.path().to_path_buf()),
            Some("http://127.0.0.1:8881"),
        );
        let reqs = build_requests(&YtdConfig::default(), MediaKind::Audio, &a).unwrap();
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[0].destination_dir(), tmp.path());
        assert_eq!(reqs[1].proxy(), Some("http://127.0.0.1:8881"));
        assert_eq!(reqs[1].kind(), MediaKind::Audio);
    }

    #[test]
    fn config_supplies_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = YtdConfig {
            download_dir: Some(tmp.path().to_path_buf()),
            proxy: Some("https://proxy.local:3128".to_string()),
            ..YtdConfig::default()
        };
        let reqs = build_requests(&cfg, MediaKind::Video, &args(&["x"], None, None)).unwrap();
        assert_eq!(reqs[0].destination_dir(), tmp.path());
        assert_eq!(reqs[0].proxy(), Some("https://proxy.local:3128"));
    }

    #[test]
    fn rejects_bad_input() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Some(tmp.path().to_path_buf());
        let cfg = YtdConfig::default();

        let err = build_requests(&cfg, MediaKind::Video, &args(&["  "], dir.clone(), None))
            .unwrap_err();
        assert_eq!(err.to_string(), "target is required");

        let err = build_requests(&cfg, MediaKind::Video, &args(&["x"], dir.clone(), Some("socks5://h:1")))
            .unwrap_err();
        assert!(err.to_string().contains("invalid proxy format"));

        let missing = tmp.path().join("nope");
        let err = build_requests(&cfg, MediaKind::Video, &args(&["x"], Some(missing), None))
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn render_lines() {
        let ev = |n| JobEvent {
            job_id: JobId(3),
            notification: n,
        };
        assert_eq!(render(&ev(Notification::Progress { percent: 42 })), "[job 3] 42%");
        assert_eq!(
            render(&ev(Notification::Terminal(Outcome::Success {
                path: "/tmp/a.mp4".into()
            }))),
            "[job 3] saved: /tmp/a.mp4"
        );
        assert_eq!(
            render(&ev(Notification::Terminal(Outcome::Failure(
                FailureReason::NoStreamAvailable(MediaKind::Audio)
            )))),
            "[job 3] failed: no suitable audio stream found"
        );
    }
}
