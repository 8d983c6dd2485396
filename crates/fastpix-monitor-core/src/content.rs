//! Request classification from the `content-type` header

use crate::headers::FilteredHeaders;
use serde::{Deserialize, Serialize};

/// MIME prefixes identifying a manifest response
pub const MANIFEST_TYPES: [&str; 4] = [
    "application/x-mpegurl",
    "application/vnd.apple.mpegurl",
    "application/dash+xml",
    "audio/mpegurl",
];

/// Kind of resource a request fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    Manifest,
    Audio,
    Video,
    Unknown,
}

impl std::fmt::Display for RequestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestType::Manifest => write!(f, "manifest"),
            RequestType::Audio => write!(f, "audio"),
            RequestType::Video => write!(f, "video"),
            RequestType::Unknown => write!(f, "unknown"),
        }
    }
}

fn has_prefix_ignore_case(value: &str, prefix: &str) -> bool {
    value
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Classify a bare content-type value
pub fn classify_content_type(content_type: &str) -> RequestType {
    if content_type.is_empty() {
        RequestType::Unknown
    } else if MANIFEST_TYPES
        .iter()
        .any(|manifest| has_prefix_ignore_case(content_type, manifest))
    {
        RequestType::Manifest
    } else if has_prefix_ignore_case(content_type, "audio") {
        RequestType::Audio
    } else if has_prefix_ignore_case(content_type, "video") {
        RequestType::Video
    } else {
        RequestType::Unknown
    }
}

/// Classify a response by its (exact, lowercase) `content-type` header
pub fn classify(headers: &FilteredHeaders) -> RequestType {
    headers
        .get("content-type")
        .map(|value| classify_content_type(value))
        .unwrap_or(RequestType::Unknown)
}
