//! Local file names for direct downloads.
//!
//! Content-Disposition wins over the URL path; whatever is chosen is made safe
//! for a single path component.

const FALLBACK_STEM: &str = "media";
const NAME_MAX: usize = 255;

/// Picks a file name for `url`, appending an extension derived from
/// `content_type` when the chosen name has none.
pub(crate) fn media_filename(
    url: &str,
    content_disposition: Option<&str>,
    content_type: Option<&str>,
) -> String {
    let candidate = content_disposition
        .and_then(disposition_filename)
        .or_else(|| last_path_segment(url))
        .map(|raw| sanitize(&raw))
        .filter(|s| !s.is_empty() && s != "." && s != "..");

    let name = candidate.unwrap_or_else(|| FALLBACK_STEM.to_string());
    if name.contains('.') {
        return name;
    }
    match content_type.and_then(extension_for) {
        Some(ext) => format!("{}.{}", name, ext),
        None => name,
    }
}

fn last_path_segment(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let decoded = percent_decode(segment);
    (decoded != "." && decoded != "..").then_some(decoded)
}

/// `filename*=UTF-8''...` takes precedence over `filename=`.
fn disposition_filename(header: &str) -> Option<String> {
    let mut plain = None;
    for param in header.split(';') {
        let Some((key, value)) = param.trim().split_once('=') else {
            continue;
        };
        let value = value.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                let encoded = value
                    .split_once("''")
                    .filter(|(charset, _)| charset.eq_ignore_ascii_case("utf-8"))
                    .map(|(_, rest)| rest);
                if let Some(name) = encoded.map(percent_decode).filter(|s| !s.is_empty()) {
                    return Some(name);
                }
            }
            "filename" => {
                let unquoted = value
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .map(unescape_quoted)
                    .unwrap_or_else(|| value.to_string());
                if !unquoted.is_empty() {
                    plain = Some(unquoted);
                }
            }
            _ => {}
        }
    }
    plain
}

fn unescape_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) => out.push(next),
                None => out.push(c),
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|h| u8::from_str_radix(h, 16).ok());
            if let Some(b) = hex {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Replaces separators, control characters and whitespace runs with a single
/// `_`, trims dots and underscores from both ends, and caps the length at
/// NAME_MAX bytes.
fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_sep = false;
    for c in name.chars() {
        let bad = matches!(c, '/' | '\\' | '\0') || c.is_control() || c.is_whitespace();
        if bad {
            if !last_was_sep {
                out.push('_');
            }
            last_was_sep = true;
        } else {
            out.push(c);
            last_was_sep = false;
        }
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    let mut end = trimmed.len().min(NAME_MAX);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    trimmed[..end].to_string()
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next()?.trim().to_ascii_lowercase();
    let ext = match mime.as_str() {
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/x-matroska" => "mkv",
        "video/quicktime" => "mov",
        "audio/mp4" => "m4a",
        "audio/mpeg" => "mp3",
        "audio/webm" => "weba",
        "audio/ogg" => "ogg",
        "audio/opus" => "opus",
        "audio/flac" => "flac",
        "audio/wav" | "audio/x-wav" => "wav",
        _ => return None,
    };
    Some(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_from_url_path() {
        assert_eq!(
            media_filename("https://cdn.example.com/v/clip.mp4?sig=abc", None, None),
            "clip.mp4"
        );
        assert_eq!(
            media_filename("https://example.com/my%20song.mp3", None, None),
            "my_song.mp3"
        );
    }

    #[test]
    fn disposition_overrides_url() {
        assert_eq!(
            media_filename(
                "https://example.com/download?id=7",
                Some("attachment; filename=\"talk.webm\""),
                Some("video/webm"),
            ),
            "talk.webm"
        );
        assert_eq!(
            media_filename(
                "https://example.com/x",
                Some("attachment; filename=\"fallback.bin\"; filename*=UTF-8''caf%C3%A9.m4a"),
                None,
            ),
            "café.m4a"
        );
    }

    #[test]
    fn extension_from_content_type() {
        assert_eq!(
            media_filename("https://example.com/stream", None, Some("audio/mpeg; charset=binary")),
            "stream.mp3"
        );
        assert_eq!(
            media_filename("https://example.com/", None, Some("video/mp4")),
            "media.mp4"
        );
        assert_eq!(media_filename("https://example.com/", None, None), "media");
    }

    #[test]
    fn unsafe_names_are_sanitized() {
        assert_eq!(sanitize("../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize("  a\tb\nc.mp4 "), "a_b_c.mp4");
        assert_eq!(
            media_filename("https://example.com/..", Some("attachment; filename=\"..\""), None),
            "media"
        );
        let long = "x".repeat(400);
        assert_eq!(sanitize(&long).len(), NAME_MAX);
    }
}
