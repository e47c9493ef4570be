//! URL handling module for qa-harvest
//!
//! This module provides URL normalization and the link resolution rules used when
//! harvesting links from theme pages.

mod normalize;

pub use normalize::normalize_url;

use url::Url;

/// Schemes that mark an href as already absolute
const ABSOLUTE_PREFIXES: &[&str] = &["http://", "https://", "//"];

/// Schemes that never lead to a crawlable page
const SKIPPED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Returns true if the href already carries a full scheme (or is protocol-relative)
///
/// Content links on the target site are always relative; absolute links point off-site
/// or to non-content targets and are never followed.
pub fn is_absolute_href(href: &str) -> bool {
    let lower = href.trim_start().to_ascii_lowercase();
    ABSOLUTE_PREFIXES.iter().any(|p| lower.starts_with(p))
}

/// Resolves a relative content link against the site's base URL
///
/// Returns None if the link should be excluded:
/// - empty or fragment-only hrefs
/// - hrefs that are already absolute (see [`is_absolute_href`])
/// - javascript:, mailto:, tel: and data: links
/// - anything that does not resolve to an HTTP(S) URL
///
/// # Examples
///
/// ```
/// use qa_harvest::url::resolve_link;
/// use url::Url;
///
/// let base = Url::parse("https://www.example.org/").unwrap();
/// let url = resolve_link("grace.html", &base).unwrap();
/// assert_eq!(url.as_str(), "https://www.example.org/grace.html");
/// assert!(resolve_link("https://elsewhere.com/", &base).is_none());
/// ```
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if is_absolute_href(href) {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if SKIPPED_SCHEMES.iter().any(|s| lower.starts_with(s)) {
        return None;
    }

    let joined = base_url.join(href).ok()?;
    normalize::normalize_parsed(joined).ok()
}
