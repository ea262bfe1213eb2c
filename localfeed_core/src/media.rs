// Copyright 2026 the LocalFeed Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Media identifiers and kind classification.
//!
//! A media identifier is whatever the feed server hands out for one item:
//! usually a URL of the form `/image?path=<percent-encoded file path>` or
//! `/thumbnail?path=...`, occasionally a bare path or an absolute URL. Every
//! other module branches on [`MediaKind`], so [`classify`] is kept pure and
//! cheap enough to call on every event.

use alloc::borrow::Cow;
use alloc::format;
use alloc::string::String;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// File extensions (lowercase, without the dot) treated as video.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "m4v", "mov", "webm"];

/// File extensions (lowercase, without the dot) treated as animated GIF.
pub const GIF_EXTENSIONS: &[&str] = &["gif"];

/// Query parameter carrying the file path in server-issued identifiers.
const PATH_PARAM: &str = "path=";

/// Characters left unescaped when encoding a path into a query value.
///
/// Matches Python's `urllib.parse.quote(path, safe="")`, which is what the
/// feed server uses to build its identifiers.
const PATH_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// The kind of content behind a media identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// A still image (JPEG, PNG, WebP, HEIC, or anything unrecognized).
    Image,
    /// An animated GIF, frozen while off-screen.
    Gif,
    /// A video, always played muted with sound from an audio carrier.
    Video,
}

impl MediaKind {
    /// Returns `true` for [`MediaKind::Video`].
    #[inline]
    #[must_use]
    pub const fn is_video(self) -> bool {
        matches!(self, Self::Video)
    }

    /// Returns a short label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Gif => "gif",
            Self::Video => "video",
        }
    }
}

/// Classifies a media identifier by its file extension.
///
/// The identifier is decoded first (see [`source_path`]), then the extension
/// of the final path component is compared case-insensitively against
/// [`GIF_EXTENSIONS`] and [`VIDEO_EXTENSIONS`]. Anything else, including a
/// missing extension, is an [`MediaKind::Image`].
#[must_use]
pub fn classify(media_id: &str) -> MediaKind {
    let path = source_path(media_id);
    match extension(&path) {
        Some(ext) if GIF_EXTENSIONS.iter().any(|g| ext.eq_ignore_ascii_case(g)) => MediaKind::Gif,
        Some(ext) if VIDEO_EXTENSIONS.iter().any(|v| ext.eq_ignore_ascii_case(v)) => {
            MediaKind::Video
        }
        _ => MediaKind::Image,
    }
}

/// Extracts the decoded file path from a media identifier.
///
/// Identifiers with a `path=` query parameter yield that parameter's decoded
/// value. Anything else is decoded as-is with its query and fragment removed.
#[must_use]
pub fn source_path(media_id: &str) -> Cow<'_, str> {
    let (base, query) = match media_id.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (media_id, None),
    };

    if let Some(query) = query {
        let query = query.split_once('#').map_or(query, |(q, _)| q);
        for pair in query.split('&') {
            if let Some(value) = pair.strip_prefix(PATH_PARAM) {
                return percent_decode_str(value).decode_utf8_lossy();
            }
        }
    }

    let base = base.split_once('#').map_or(base, |(b, _)| b);
    percent_decode_str(base).decode_utf8_lossy()
}

/// Returns the extension of the last path component, without the dot.
///
/// Dot-files (`.gif`) and names without a dot have no extension, as with
/// Python's `Path.suffix`.
fn extension(path: &str) -> Option<&str> {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
        _ => None,
    }
}

/// Returns the poster-frame URL for a video identifier.
///
/// The server extracts and caches the first frame at `/video-poster`. Images
/// and GIFs have no poster and yield `None`.
#[must_use]
pub fn poster_url(media_id: &str) -> Option<String> {
    if !classify(media_id).is_video() {
        return None;
    }
    let path = source_path(media_id);
    Some(format!(
        "/video-poster?path={}",
        utf8_percent_encode(&path, PATH_VALUE)
    ))
}

/// Resolves a media identifier against a page origin.
///
/// Relative, root-relative, protocol-relative and absolute forms of the same
/// resource all resolve to the same string, so the result can be compared
/// directly. `origin` is `scheme://host[:port]`; a trailing slash is ignored.
#[must_use]
pub fn resolve(origin: &str, media_id: &str) -> String {
    let origin = origin.trim_end_matches('/');

    if has_scheme(media_id) {
        return String::from(media_id);
    }
    if let Some(rest) = media_id.strip_prefix("//") {
        let scheme = origin.split_once("://").map_or("http", |(s, _)| s);
        return format!("{scheme}://{rest}");
    }
    if media_id.starts_with('/') {
        return format!("{origin}{media_id}");
    }
    format!("{origin}/{media_id}")
}

fn has_scheme(url: &str) -> bool {
    match url.split_once("://") {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && scheme
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.'))
        }
        None => false,
    }
}
