//! HEAD probing for direct media URLs.

use anyhow::{Context, Result};
use std::str;

use super::Transport;

/// Headers that describe a direct media resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct MediaHead {
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
}

/// Issues a HEAD request through `transport` and returns the final response's
/// media headers. Redirects are followed.
pub(crate) fn probe(url: &str, transport: &Transport, proxy: Option<&str>) -> Result<MediaHead> {
    let mut lines: Vec<String> = Vec::new();

    let mut easy = transport.easy(url, proxy)?;
    easy.nobody(true)?;

    {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                lines.push(s.trim_end().to_string());
            }
            true
        })?;
        transfer.perform().context("HEAD request failed")?;
    }

    let code = easy.response_code().context("no response code")?;
    if !(200..300).contains(&code) {
        anyhow::bail!("HEAD {} returned HTTP {}", url, code);
    }

    Ok(parse_headers(&lines))
}

/// With redirects libcurl reports every hop's headers; only the block after the
/// last status line counts.
pub(crate) fn parse_headers(lines: &[String]) -> MediaHead {
    let start = lines
        .iter()
        .rposition(|l| l.starts_with("HTTP/"))
        .map(|i| i + 1)
        .unwrap_or(0);

    let mut head = MediaHead::default();
    for line in &lines[start..] {
        let Some((name, value)) = line.trim().split_once(':') else {
            continue;
        };
        let (name, value) = (name.trim(), value.trim());
        if name.eq_ignore_ascii_case("content-length") {
            head.content_length = value.parse().ok();
        } else if name.eq_ignore_ascii_case("content-type") {
            head.content_type = Some(value.to_string());
        } else if name.eq_ignore_ascii_case("content-disposition") {
            head.content_disposition = Some(value.to_string());
        }
    }
    head
}
