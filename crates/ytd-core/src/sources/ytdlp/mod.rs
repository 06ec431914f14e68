//! Site pages (YouTube and friends) through a yt-dlp subprocess.

mod parse;

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;

use crate::config::YtDlpConfig;
use crate::media::{MediaSource, ProgressFn, StreamDescriptor};

use self::parse::{parse_formats, parse_progress_line, PROGRESS_PREFIX, PROGRESS_TEMPLATE};

const SEARCH_PATHS: &[&str] = &[
    "/usr/local/bin/yt-dlp",
    "/usr/bin/yt-dlp",
    "/opt/homebrew/bin/yt-dlp",
];

pub struct YtDlpSource {
    binary: PathBuf,
}

impl YtDlpSource {
    pub fn new(cfg: &YtDlpConfig) -> Self {
        let binary = cfg.binary.clone().unwrap_or_else(locate_binary);
        Self { binary }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// True if `yt-dlp --version` runs and exits successfully.
    pub fn is_runnable(&self) -> bool {
        match Command::new(&self.binary)
            .arg("--version")
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
        {
            Ok(out) if out.status.success() => {
                tracing::debug!(
                    binary = %self.binary.display(),
                    version = String::from_utf8_lossy(&out.stdout).trim(),
                    "found yt-dlp"
                );
                true
            }
            _ => false,
        }
    }

    fn command(&self, proxy: Option<&str>) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.stdin(Stdio::null()).arg("--no-playlist");
        if let Some(p) = proxy {
            cmd.args(["--proxy", p]);
        }
        cmd
    }
}

/// Falls back to a bare `yt-dlp` so PATH lookup happens at spawn time.
fn locate_binary() -> PathBuf {
    SEARCH_PATHS
        .iter()
        .map(Path::new)
        .find(|p| p.exists())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("yt-dlp"))
}

/// Kills and reaps the child unless [`ChildGuard::wait`] ran, so an early
/// return never leaves yt-dlp running.
struct ChildGuard {
    child: Option<Child>,
}

impl ChildGuard {
    fn new(child: Child) -> Self {
        Self { child: Some(child) }
    }

    fn get_mut(&mut self) -> Option<&mut Child> {
        self.child.as_mut()
    }

    fn wait(mut self) -> std::io::Result<ExitStatus> {
        match self.child.take() {
            Some(mut child) => child.wait(),
            None => Err(std::io::Error::new(std::io::ErrorKind::Other, "child already reaped")),
        }
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            tracing::debug!(pid = child.id(), "killing yt-dlp");
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Last non-empty stderr line, which is where yt-dlp puts its `ERROR:` message.
fn stderr_summary(stderr: &str) -> &str {
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("no error output")
}

impl MediaSource for YtDlpSource {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    fn resolve(&self, target: &str, proxy: Option<&str>) -> Result<Vec<StreamDescriptor>> {
        let output = self
            .command(proxy)
            .arg("--dump-json")
            .arg("--")
            .arg(target)
            .output()
            .with_context(|| format!("run {}", self.binary.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp {}: {}", output.status, stderr_summary(&stderr));
        }
        let streams = parse_formats(&output.stdout)?;
        tracing::debug!(target, formats = streams.len(), "yt-dlp listed formats");
        Ok(streams)
    }

    fn transfer(
        &self,
        target: &str,
        stream: &StreamDescriptor,
        destination_dir: &Path,
        proxy: Option<&str>,
        on_progress: &mut ProgressFn<'_>,
    ) -> Result<PathBuf> {
        let child = self
            .command(proxy)
            .arg("-f")
            .arg(&stream.id)
            .arg("-P")
            .arg(destination_dir)
            .args(["--newline", "--progress", "--progress-template", PROGRESS_TEMPLATE])
            .args(["--print", "after_move:filepath"])
            .arg("--")
            .arg(target)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawn {}", self.binary.display()))?;
        let mut child = ChildGuard::new(child);

        let stderr_reader = child.get_mut().and_then(|c| c.stderr.take()).map(|mut stderr| {
            thread::spawn(move || {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf);
                buf
            })
        });

        let mut saved: Option<PathBuf> = None;
        if let Some(stdout) = child.get_mut().and_then(|c| c.stdout.take()) {
            for line in BufReader::new(stdout).lines() {
                let line = line.context("read yt-dlp output")?;
                if line.starts_with(PROGRESS_PREFIX) {
                    if let Some((done, total)) = parse_progress_line(&line) {
                        let total = if total > 0 { total } else { stream.total_size_bytes };
                        on_progress(done, total);
                    }
                } else if !line.trim().is_empty() {
                    saved = Some(PathBuf::from(line.trim()));
                }
            }
        }

        let status = child.wait().context("wait for yt-dlp")?;
        let stderr = stderr_reader
            .and_then(|h| h.join().ok())
            .unwrap_or_default();
        if !status.success() {
            anyhow::bail!("yt-dlp {}: {}", status, stderr_summary(&stderr));
        }
        saved.context("yt-dlp did not report an output file")
    }
}
