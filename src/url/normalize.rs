use crate::{UrlError, UrlResult};
use url::Url;

/// Normalizes a URL according to the crawler's normalization rules
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything that is not HTTP or HTTPS
/// 3. Require a host and lowercase it
/// 4. Remove fragment (everything after #)
///
/// Paths and query strings are left alone: the target site serves distinct pages
/// for paths that differ only in case or trailing slash.
///
/// # Examples
///
/// ```
/// use qa_harvest::url::normalize_url;
///
/// let url = normalize_url("https://WWW.Example.COM/Page.html#top").unwrap();
/// assert_eq!(url.as_str(), "https://www.example.com/Page.html");
/// ```
pub fn normalize_url(url_str: &str) -> UrlResult<Url> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(url)
}

/// Applies the normalization rules to an already parsed URL
pub(crate) fn normalize_parsed(mut url: Url) -> UrlResult<Url> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    // The url crate already lowercases domain hosts; IP hosts pass through untouched
    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);

    Ok(url)
}
