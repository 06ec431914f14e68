//! Stream selection policy.

use super::{StreamDescriptor, StreamKind};
use crate::job::MediaKind;

/// Picks the best stream for `kind`: combined audio+video for [`MediaKind::Video`],
/// audio-only for [`MediaKind::Audio`], highest `quality_rank` wins. Among
/// equal ranks the first listed stream is kept.
pub fn select_stream(streams: &[StreamDescriptor], kind: MediaKind) -> Option<&StreamDescriptor> {
    let wanted = match kind {
        MediaKind::Video => StreamKind::Combined,
        MediaKind::Audio => StreamKind::AudioOnly,
    };
    streams
        .iter()
        .filter(|s| s.kind == wanted)
        .fold(None, |best: Option<&StreamDescriptor>, s| match best {
            Some(b) if b.quality_rank >= s.quality_rank => Some(b),
            _ => Some(s),
        })
}
