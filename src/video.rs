//! Video references: seek-time rewriting and id extraction.

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

static VIDEO_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:https?://)?(?:www\.|m\.)?",
        r"(?:youtu\.be/|youtube\.com/(?:watch\?(?:[^#]*&)?v=|embed/|shorts/|live/))",
        r"([A-Za-z0-9_-]{6,})",
    ))
    .expect("valid video id regex")
});

/// Chess.com game pages that occasionally end up in the video column.
pub static GAME_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://(www\.)?chess\.com/game/live/\d+").expect("valid game link regex")
});

/// Byte range of the value of the `t` query parameter, if any.
fn time_param_span(url: &str) -> Option<(usize, usize)> {
    let query_start = url.find('?')?;
    let fragment_start = url[query_start..]
        .find('#')
        .map_or(url.len(), |i| query_start + i);

    let mut offset = query_start + 1;
    let mut found = None;
    for param in url[offset..fragment_start].split('&') {
        if let Some(value) = param.strip_prefix("t=") {
            let start = offset + 2;
            found = Some((start, start + value.len()));
        }
        offset += param.len() + 1;
    }
    found
}

/// The offset already encoded in a reference: `t=123` or `t=123s`.
pub fn start_offset(url: &str) -> Option<u64> {
    let (start, end) = time_param_span(url)?;
    let value = &url[start..end];
    value.strip_suffix('s').unwrap_or(value).parse().ok()
}

/// Rewrite `url` so that its `t` parameter is `seconds`.
///
/// The last `t` parameter is replaced in place; other parameters and any
/// fragment are kept. Without one, `t` is appended.
pub fn with_seek(url: &str, seconds: u64) -> String {
    if let Some((start, end)) = time_param_span(url) {
        return format!("{}{}{}", &url[..start], seconds, &url[end..]);
    }

    let (base, fragment) = match url.find('#') {
        Some(i) => url.split_at(i),
        None => (url, ""),
    };
    let separator = if !base.contains('?') {
        '?'
    } else if base.ends_with('?') || base.ends_with('&') {
        return format!("{base}t={seconds}{fragment}");
    } else {
        '&'
    };
    format!("{base}{separator}t={seconds}{fragment}")
}

/// Seek point for a ply: base offset plus whole seconds of elapsed play.
pub fn seek_seconds(base_offset: u64, elapsed: Duration) -> u64 {
    base_offset.saturating_add(elapsed.as_secs())
}

/// YouTube video id of a reference, used to join titles.
pub fn video_id(url: &str) -> Option<&str> {
    VIDEO_ID_RE
        .captures(url.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
