//! Parsing of yt-dlp output: `--dump-json` metadata and templated progress lines.

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use crate::media::{StreamDescriptor, StreamKind};

pub(super) const PROGRESS_PREFIX: &str = "ytd-progress";

/// Passed to `--progress-template`; every field may render as `NA`.
pub(super) const PROGRESS_TEMPLATE: &str = "download:ytd-progress %(progress.downloaded_bytes)s %(progress.total_bytes)s %(progress.total_bytes_estimate)s";

static PROGRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ytd-progress\s+(\d+|NA)\s+(\d+|NA)\s+(\d+(?:\.\d+)?|NA)\s*$")
        .expect("progress regex")
});

#[derive(Debug, Deserialize)]
struct Info {
    #[serde(default)]
    formats: Vec<Format>,
}

#[derive(Debug, Deserialize)]
struct Format {
    format_id: String,
    #[serde(default)]
    vcodec: Option<String>,
    #[serde(default)]
    acodec: Option<String>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    abr: Option<f64>,
    #[serde(default)]
    filesize: Option<u64>,
    #[serde(default)]
    filesize_approx: Option<f64>,
}

fn has_codec(codec: &Option<String>) -> bool {
    matches!(codec.as_deref(), Some(c) if !c.is_empty() && c != "none")
}

impl Format {
    fn kind(&self) -> Option<StreamKind> {
        match (has_codec(&self.vcodec), has_codec(&self.acodec)) {
            (true, true) => Some(StreamKind::Combined),
            (true, false) => Some(StreamKind::VideoOnly),
            (false, true) => Some(StreamKind::AudioOnly),
            // storyboards, thumbnails
            (false, false) => None,
        }
    }

    fn into_descriptor(self) -> Option<StreamDescriptor> {
        let kind = self.kind()?;
        let quality_rank = match kind {
            StreamKind::AudioOnly => self.abr.map(|k| k.round() as u32).unwrap_or(0),
            StreamKind::Combined | StreamKind::VideoOnly => self.height.unwrap_or(0),
        };
        let total_size_bytes = self
            .filesize
            .or_else(|| self.filesize_approx.map(|n| n as u64))
            .unwrap_or(0);
        Some(StreamDescriptor {
            id: self.format_id,
            kind,
            total_size_bytes,
            quality_rank,
        })
    }
}

/// Streams listed in a `--dump-json` document, in yt-dlp's order.
pub(super) fn parse_formats(json: &[u8]) -> Result<Vec<StreamDescriptor>> {
    let info: Info = serde_json::from_slice(json).context("parse yt-dlp metadata")?;
    Ok(info
        .formats
        .into_iter()
        .filter_map(Format::into_descriptor)
        .collect())
}

/// `(downloaded, total)` from one progress line. Missing totals fall back to
/// the estimate, then to 0.
pub(super) fn parse_progress_line(line: &str) -> Option<(u64, u64)> {
    let caps = PROGRESS_RE.captures(line.trim())?;
    let downloaded: u64 = caps[1].parse().ok()?;
    let total = caps[2]
        .parse::<u64>()
        .ok()
        .or_else(|| caps[3].parse::<f64>().ok().map(|n| n as u64))
        .unwrap_or(0);
    Some((downloaded, total))
}
