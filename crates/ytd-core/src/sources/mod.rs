//! Concrete [`MediaSource`] implementations and backend selection.

mod filename;
pub mod http;
pub mod ytdlp;

use std::sync::Arc;

use crate::config::{SourceBackend, YtdConfig};
use crate::media::MediaSource;

pub use self::http::HttpSource;
pub use self::ytdlp::YtDlpSource;

/// Builds the source named by `cfg.source`. `Auto` uses yt-dlp when it can be
/// run and falls back to direct HTTP otherwise.
pub fn build_source(cfg: &YtdConfig) -> Arc<dyn MediaSource> {
    let ytdlp = || YtDlpSource::new(&cfg.ytdlp.clone().unwrap_or_default());
    match cfg.source {
        SourceBackend::Http => Arc::new(HttpSource::new(&cfg.http_or_default())),
        SourceBackend::YtDlp => Arc::new(ytdlp()),
        SourceBackend::Auto => {
            let candidate = ytdlp();
            if candidate.is_runnable() {
                Arc::new(candidate)
            } else {
                tracing::info!(
                    binary = %candidate.binary().display(),
                    "yt-dlp not runnable, using direct http source"
                );
                Arc::new(HttpSource::new(&cfg.http_or_default()))
            }
        }
    }
}
