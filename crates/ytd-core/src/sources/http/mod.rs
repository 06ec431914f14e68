//! Direct http(s) media URLs fetched with libcurl.
//!
//! A target resolves to exactly one stream. Its kind comes from the
//! `Content-Type` of a HEAD probe: `audio/*` is audio-only, anything else is
//! treated as a combined stream. The stream id is the local file name.

mod probe;

use anyhow::{Context, Result};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::HttpConfig;
use crate::media::{MediaSource, ProgressFn, StreamDescriptor, StreamKind};

use super::filename::media_filename;

/// curl settings shared by HEAD and GET.
#[derive(Debug, Clone)]
pub(crate) struct Transport {
    connect_timeout: Duration,
    low_speed_limit: u32,
    low_speed_time: Duration,
}

impl Transport {
    fn new(cfg: &HttpConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            low_speed_limit: cfg.low_speed_limit,
            low_speed_time: Duration::from_secs(cfg.low_speed_time_secs),
        }
    }

    pub(crate) fn easy(&self, url: &str, proxy: Option<&str>) -> Result<curl::easy::Easy> {
        let mut easy = curl::easy::Easy::new();
        easy.url(url).context("invalid URL")?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(self.connect_timeout)?;
        easy.low_speed_limit(self.low_speed_limit)
            .map_err(|e| anyhow::anyhow!("curl: {}", e))?;
        easy.low_speed_time(self.low_speed_time)?;
        if let Some(p) = proxy {
            easy.proxy(p)?;
        }
        Ok(easy)
    }
}

pub struct HttpSource {
    transport: Transport,
}

impl HttpSource {
    pub fn new(cfg: &HttpConfig) -> Self {
        Self {
            transport: Transport::new(cfg),
        }
    }
}

impl Default for HttpSource {
    fn default() -> Self {
        Self::new(&HttpConfig::default())
    }
}

fn check_target(target: &str) -> Result<url::Url> {
    let parsed = url::Url::parse(target).with_context(|| format!("not a URL: {:?}", target))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => anyhow::bail!("unsupported scheme {:?} in {}", other, target),
    }
}

fn stream_kind(content_type: Option<&str>) -> StreamKind {
    match content_type {
        Some(ct) if ct.trim_start().to_ascii_lowercase().starts_with("audio/") => {
            StreamKind::AudioOnly
        }
        _ => StreamKind::Combined,
    }
}

impl MediaSource for HttpSource {
    fn name(&self) -> &'static str {
        "http"
    }

    fn resolve(&self, target: &str, proxy: Option<&str>) -> Result<Vec<StreamDescriptor>> {
        let url = check_target(target)?;
        let head = probe::probe(url.as_str(), &self.transport, proxy)?;
        tracing::debug!(
            target,
            content_type = head.content_type.as_deref().unwrap_or("-"),
            length = head.content_length,
            "probed media url"
        );

        let id = media_filename(
            url.as_str(),
            head.content_disposition.as_deref(),
            head.content_type.as_deref(),
        );
        Ok(vec![StreamDescriptor {
            id,
            kind: stream_kind(head.content_type.as_deref()),
            total_size_bytes: head.content_length.unwrap_or(0),
            quality_rank: 0,
        }])
    }

    fn transfer(
        &self,
        target: &str,
        stream: &StreamDescriptor,
        destination_dir: &Path,
        proxy: Option<&str>,
        on_progress: &mut ProgressFn<'_>,
    ) -> Result<PathBuf> {
        let url = check_target(target)?;
        let (file, path) = create_unique(destination_dir, &stream.id)?;
        let result = download_to(&self.transport, url.as_str(), file, &path, stream, proxy, on_progress);
        if result.is_err() {
            // only ever the file claimed above
            if let Err(e) = fs::remove_file(&path) {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), "could not remove partial file: {}", e);
                }
            }
        }
        result.map(|()| path)
    }
}

const MAX_NAME_ATTEMPTS: u32 = 1000;

/// `name`, then `stem (1).ext`, `stem (2).ext`, ...
fn candidate_name(name: &str, attempt: u32) -> String {
    if attempt == 0 {
        return name.to_string();
    }
    let path = Path::new(name);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(name);
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{} ({}).{}", stem, attempt, ext),
        None => format!("{} ({})", stem, attempt),
    }
}

/// Creates a file in `dir` that did not exist before, never touching an
/// existing one.
fn create_unique(dir: &Path, name: &str) -> Result<(fs::File, PathBuf)> {
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let path = dir.join(candidate_name(name, attempt));
        match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => {
                if attempt > 0 {
                    tracing::debug!(path = %path.display(), "target name taken, saving under new name");
                }
                return Ok((file, path));
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!("create {}", path.display())))
            }
        }
    }
    anyhow::bail!("no free file name for {} in {}", name, dir.display())
}

fn download_to(
    transport: &Transport,
    url: &str,
    mut file: fs::File,
    path: &Path,
    stream: &StreamDescriptor,
    proxy: Option<&str>,
    on_progress: &mut ProgressFn<'_>,
) -> Result<()> {
    let mut written: u64 = 0;
    let mut write_err: Option<io::Error> = None;

    let mut easy = transport.easy(url, proxy)?;
    easy.progress(true)?;

    let performed = {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| match file.write_all(data) {
            Ok(()) => {
                written += data.len() as u64;
                Ok(data.len())
            }
            Err(e) => {
                write_err = Some(e);
                Ok(0) // abort transfer
            }
        })?;
        transfer.progress_function(|dltotal, dlnow, _, _| {
            let total = if dltotal > 0.0 {
                dltotal as u64
            } else {
                stream.total_size_bytes
            };
            on_progress(dlnow as u64, total);
            true
        })?;
        transfer.perform()
    };
    if let Some(e) = write_err {
        return Err(anyhow::Error::new(e).context(format!("write {}", path.display())));
    }
    performed.context("GET request failed")?;

    let code = easy.response_code().context("no response code")?;
    if !(200..300).contains(&code) {
        anyhow::bail!("GET {} returned HTTP {}", url, code);
    }
    if stream.total_size_bytes > 0 && written != stream.total_size_bytes {
        anyhow::bail!("partial transfer: wrote {} of {}", written, stream.total_size_bytes);
    }
    file.flush()?;
    on_progress(written, written.max(stream.total_size_bytes));
    Ok(())
}
