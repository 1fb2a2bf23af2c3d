//! Utility functions and helpers.

pub mod http;
pub mod retry;
pub mod shutdown;

#[cfg(test)]
pub(crate) mod mock_server;

use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// URL of page `index` of a list.
///
/// A `{page}` placeholder in the base is substituted; otherwise the index is
/// appended as a path segment.
pub fn page_url(base: &str, index: usize) -> String {
    if base.contains("{page}") {
        base.replace("{page}", &index.to_string())
    } else {
        format!("{}/{}", base.trim_end_matches('/'), index)
    }
}
