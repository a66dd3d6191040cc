//! Reference resolution and canonical percent-encoding for chart links.

use crate::utils::error::{ChartError, Result};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

/// Everything except RFC 3986 unreserved characters gets escaped inside a
/// path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Resolves `href` against `base` and returns an absolute URL whose path is
/// encoded exactly once.
///
/// The fragment is dropped. Each path segment is decoded once and re-encoded,
/// so pre-encoded, partially encoded and raw hrefs all converge on the same
/// string and `normalize(normalize(u)) == normalize(u)`.
pub fn normalize(href: &str, base: &str) -> Result<String> {
    let href = href.trim();
    if href.is_empty() {
        return Err(malformed(href, "empty reference"));
    }

    let base = Url::parse(base).map_err(|e| malformed(base, &format!("bad base URL: {}", e)))?;
    let mut url = base.join(href).map_err(|e| malformed(href, &e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(malformed(href, &format!("unsupported scheme '{}'", scheme))),
    }

    url.set_fragment(None);
    let path = encode_path(url.path());
    url.set_path(&path);

    Ok(url.to_string())
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            let decoded: Vec<u8> = percent_decode_str(segment).collect();
            match String::from_utf8(decoded) {
                Ok(text) => utf8_percent_encode(&text, SEGMENT).to_string(),
                // not UTF-8 once decoded: escape the raw bytes
                Err(err) => percent_encoding::percent_encode(err.as_bytes(), SEGMENT).to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Last path segment of `url`, percent-decoded.
pub fn decoded_filename(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let segment = without_query.rsplit('/').next()?;
    if segment.is_empty() {
        return None;
    }
    Some(percent_decode_str(segment).decode_utf8_lossy().into_owned())
}

fn malformed(href: &str, reason: &str) -> ChartError {
    ChartError::MalformedUrl {
        href: href.to_string(),
        reason: reason.to_string(),
    }
}
