//! Media source interface.
//!
//! The core only depends on [`MediaSource`]: turn a target into a list of
//! selectable streams, then transfer one of them to disk while reporting
//! progress. Concrete implementations live in [`crate::sources`].
//!
//! Both calls are blocking. The executor always runs them on the offload pool,
//! never on the scheduling thread.

mod select;

pub use select::select_stream;

use std::path::{Path, PathBuf};

/// What a stream carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// Audio and video in one stream.
    Combined,
    /// Audio only.
    AudioOnly,
    /// Video only (needs a separate audio stream; never selected).
    VideoOnly,
}

/// One resolved, selectable stream. Produced by a [`MediaSource`]; the runner
/// only picks among them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDescriptor {
    /// Source-specific identifier (format id, URL, ...), used by `transfer`.
    pub id: String,
    pub kind: StreamKind,
    /// Expected size in bytes; 0 if unknown.
    pub total_size_bytes: u64,
    /// Ordering key: resolution height for video, bitrate (kbps) for audio.
    pub quality_rank: u32,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
pub type ProgressFn<'a> = dyn FnMut(u64, u64) + Send + 'a;

/// External collaborator that resolves targets and performs transfers.
pub trait MediaSource: Send + Sync {
    /// Name of the source (for logging).
    fn name(&self) -> &'static str;

    /// Looks up `target` and returns the streams it offers.
    fn resolve(&self, target: &str, proxy: Option<&str>) -> anyhow::Result<Vec<StreamDescriptor>>;

    /// Downloads `stream` into `destination_dir`, calling `on_progress` as bytes
    /// arrive. Returns the path of the saved file.
    fn transfer(
        &self,
        target: &str,
        stream: &StreamDescriptor,
        destination_dir: &Path,
        proxy: Option<&str>,
        on_progress: &mut ProgressFn<'_>,
    ) -> anyhow::Result<PathBuf>;
}
