//! Job request model and the handle returned on submission.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::ValidationError;
use crate::proxy;

/// Identifier assigned by the executor when a job is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What to fetch from the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// A single stream carrying both audio and video.
    Video,
    /// An audio-only stream.
    Audio,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

/// One "fetch this target into that directory" request. Immutable once built.
///
/// `destination_dir` is taken as given: checking that it exists and is
/// writable is the caller's responsibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    target: String,
    destination_dir: PathBuf,
    proxy: Option<String>,
    kind: MediaKind,
}

impl JobRequest {
    /// Builds a request, trimming the target and proxy. Fails on an empty target
    /// or a proxy that does not pass [`proxy::is_valid_proxy`].
    pub fn new(
        target: impl AsRef<str>,
        destination_dir: impl Into<PathBuf>,
        proxy: Option<&str>,
        kind: MediaKind,
    ) -> Result<Self, ValidationError> {
        let target = target.as_ref().trim();
        if target.is_empty() {
            return Err(ValidationError::EmptyTarget);
        }
        let proxy = proxy::parse_proxy(proxy)?;
        Ok(Self {
            target: target.to_string(),
            destination_dir: destination_dir.into(),
            proxy,
            kind,
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn destination_dir(&self) -> &Path {
        &self.destination_dir
    }

    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }
}

/// Opaque reference to a submitted job, for identity and logging only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle {
    id: JobId,
    target: String,
}

impl JobHandle {
    pub(crate) fn new(id: JobId, target: &str) -> Self {
        Self {
            id,
            target: target.to_string(),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job {} ({})", self.id, self.target)
    }
}
