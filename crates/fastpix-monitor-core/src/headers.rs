//! Response header allow-listing
//!
//! Only a fixed set of CDN/diagnostic headers is forwarded with request
//! telemetry. Names are matched case-insensitively but stored with the case
//! they arrived in.

use std::collections::BTreeMap;

/// Headers forwarded with `requestCompleted`
pub const ALLOWED_HEADERS: [&str; 9] = [
    "x-cdn",
    "content-type",
    "content-length",
    "last-modified",
    "server",
    "x-request-id",
    "cf-ray",
    "x-amz-cf-id",
    "x-akamai-request-id",
];

/// Allow-listed headers of a single response
pub type FilteredHeaders = BTreeMap<String, String>;

fn is_allowed(name: &str) -> bool {
    ALLOWED_HEADERS
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(name))
}

/// Filter a raw `getAllResponseHeaders()` blob down to the allow-list
///
/// Lines are separated by runs of CR/LF. Each line is split on the first
/// `": "`; the remainder (including any further `": "`) is the value.
pub fn filter_headers(raw: &str) -> FilteredHeaders {
    let mut filtered = FilteredHeaders::new();

    for line in raw.trim().split(['\r', '\n']) {
        let (name, value) = line.split_once(": ").unwrap_or((line, ""));
        if !name.is_empty() && is_allowed(name) {
            filtered.insert(name.to_string(), value.to_string());
        }
    }

    filtered
}

/// Render headers back into the CRLF blob format
pub fn to_header_blob(headers: &FilteredHeaders) -> String {
    headers
        .iter()
        .map(|(name, value)| format!("{name}: {value}\r\n"))
        .collect()
}
