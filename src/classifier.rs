//! Media request classification.
//!
//! Decides, from the request alone, whether a resource fetch is media
//! (image/video) and should be blocked. Rules are applied in order and the
//! first match wins:
//!
//! 1. Main-frame navigations and `Accept` headers asking for markup → Allow
//! 2. `Accept` primary media range `image/*` or `video/*` → Block
//! 3. URL path ending in a known media extension → Block
//! 4. Anything else → [`UnknownResourcePolicy`] (Allow by default)
//!
//! The classifier is a pure value: no cache, no history. The same request
//! always yields the same decision, so it can be shared across network
//! threads without locking.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

/// Extensions matched (case-insensitively) against the request path.
pub const DEFAULT_MEDIA_EXTENSIONS: [&str; 9] = [
    ".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg", ".mp4", ".webm", ".ogg",
];

/// Media ranges in an `Accept` header that mean "this is a document load".
const DOCUMENT_MEDIA_TYPES: [&str; 2] = ["text/html", "application/xhtml+xml"];

// ─────────────────────────────────────────────────────────────────────────────
// ResourceRequest
// ─────────────────────────────────────────────────────────────────────────────

/// A single resource fetch as seen by the host, before it hits the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    url: String,
    /// Header names are stored lowercased.
    headers: BTreeMap<String, String>,
    /// Host hint: this request is the top-level document of the webview.
    for_main_frame: bool,
}

impl ResourceRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
            for_main_frame: false,
        }
    }

    /// Adds a header. Names are case-insensitive, a later value replaces an
    /// earlier one.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Shorthand for `with_header("Accept", ...)`.
    pub fn with_accept(self, accept: impl Into<String>) -> Self {
        self.with_header("accept", accept)
    }

    /// Marks the request as the main-frame navigation.
    pub fn with_main_frame(mut self, for_main_frame: bool) -> Self {
        self.for_main_frame = for_main_frame;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The `Accept` header, lowercased and trimmed. `None` when absent or blank.
    pub fn accept(&self) -> Option<String> {
        self.header("accept")
            .map(|value| value.trim().to_ascii_lowercase())
            .filter(|value| !value.is_empty())
    }

    /// True for the top-level document: either flagged by the host or
    /// declared through the `Accept` header.
    pub fn is_main_document_navigation(&self) -> bool {
        self.for_main_frame
            || self
                .accept()
                .is_some_and(|accept| accepts_document(&accept))
    }

    /// The path component of the URL, without query or fragment.
    ///
    /// Unparseable URLs (relative references handed over raw by some hosts)
    /// fall back to stripping `?` and `#` from the raw string.
    pub fn path(&self) -> String {
        match Url::parse(&self.url) {
            Ok(url) => url.path().to_string(),
            Err(_) => strip_query_fragment(&self.url).to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Classifier
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of classifying one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Allow,
    Block,
}

/// What to do when neither the headers nor the URL say anything useful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownResourcePolicy {
    /// Fail open: keep the page working.
    #[default]
    Allow,
    /// Fail closed: block requests with no usable `Accept` header and no
    /// extension at all in their path.
    Block,
}

/// Stateless media classifier.
#[derive(Debug, Clone)]
pub struct RequestClassifier {
    /// Lowercased, each starting with `.`.
    extensions: Vec<String>,
    unknown: UnknownResourcePolicy,
}

impl Default for RequestClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_MEDIA_EXTENSIONS, UnknownResourcePolicy::Allow)
    }
}

impl RequestClassifier {
    /// Builds a classifier. Extensions may be given with or without the
    /// leading dot and in any case.
    pub fn new<I, S>(extensions: I, unknown: UnknownResourcePolicy) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .map(|ext| format!(".{ext}"))
            .collect();
        Self { extensions, unknown }
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn unknown_policy(&self) -> UnknownResourcePolicy {
        self.unknown
    }

    pub fn classify(&self, request: &ResourceRequest) -> Classification {
        if request.is_main_document_navigation() {
            return Classification::Allow;
        }

        let accept = request.accept();
        if let Some(ref accept) = accept
            && is_media_range(primary_media_range(accept))
        {
            return Classification::Block;
        }

        let path = request.path();
        if self
            .extensions
            .iter()
            .any(|ext| ends_with_ignore_ascii_case(&path, ext))
        {
            return Classification::Block;
        }

        match self.unknown {
            UnknownResourcePolicy::Allow => Classification::Allow,
            UnknownResourcePolicy::Block => {
                let usable_accept = accept.as_deref().is_some_and(|a| !is_wildcard_only(a));
                if usable_accept || has_extension(&path) {
                    Classification::Allow
                } else {
                    Classification::Block
                }
            }
        }
    }

    pub fn is_media_request(&self, request: &ResourceRequest) -> bool {
        self.classify(request) == Classification::Block
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Header / path helpers
// ─────────────────────────────────────────────────────────────────────────────

fn accepts_document(accept: &str) -> bool {
    accept
        .split(',')
        .map(media_type_of)
        .any(|range| DOCUMENT_MEDIA_TYPES.contains(&range))
}

/// First media range of an `Accept` header, parameters stripped.
fn primary_media_range(accept: &str) -> &str {
    media_type_of(accept.split(',').next().unwrap_or(""))
}

fn media_type_of(range: &str) -> &str {
    range.split(';').next().unwrap_or("").trim()
}

fn is_media_range(range: &str) -> bool {
    range.starts_with("image/") || range.starts_with("video/")
}

fn is_wildcard_only(accept: &str) -> bool {
    accept.split(',').map(media_type_of).all(|range| range == "*/*" || range.is_empty())
}

/// True if the last path segment carries a `.ext` suffix.
fn has_extension(path: &str) -> bool {
    let segment = path.rsplit('/').next().unwrap_or("");
    segment
        .rfind('.')
        .is_some_and(|dot| dot > 0 && dot + 1 < segment.len())
}

/// "/a/b.png?x=1#y" → "/a/b.png"
#[inline]
fn strip_query_fragment(s: &str) -> &str {
    match s.find(['?', '#']) {
        Some(i) => &s[..i],
        None => s,
    }
}

#[inline]
fn ends_with_ignore_ascii_case(hay: &str, suffix: &str) -> bool {
    hay.len() >= suffix.len()
        && hay.as_bytes()[hay.len() - suffix.len()..].eq_ignore_ascii_case(suffix.as_bytes())
}
