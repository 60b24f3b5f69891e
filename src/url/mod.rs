//! URL handling module for Catalog-Harvest
//!
//! Links on the shop's pages are often relative; everything the crawler stores
//! or follows is resolved against the page it came from. Page identity for
//! cycle detection uses a normalized form of the url.

mod normalize;

pub use normalize::page_key;

use crate::{UrlError, UrlResult};
use url::Url;

/// Parses an absolute http(s) url with a host, such as the crawl's root url
pub fn parse_site_url(raw: &str) -> UrlResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(UrlError::InvalidScheme(other.to_string())),
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}

/// Resolves an href against the url of the page it was found on
///
/// Returns None for empty hrefs, fragment-only anchors, non-navigational
/// schemes (`javascript:`, `mailto:`, `tel:`), and anything that does not
/// resolve to an http(s) url.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use catalog_harvest::url::resolve_href;
///
/// let base = Url::parse("https://shop.example.com/category/fans/").unwrap();
/// let url = resolve_href(&base, "page/2/").unwrap();
/// assert_eq!(url.as_str(), "https://shop.example.com/category/fans/page/2/");
/// ```
pub fn resolve_href(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:") || href.starts_with("mailto:") || href.starts_with("tel:")
    {
        return None;
    }

    let resolved = base.join(href).ok()?;
    match resolved.scheme() {
        "http" | "https" => Some(resolved),
        _ => None,
    }
}

/// Resolves an image source, keeping it verbatim when it cannot be joined
///
/// Image sources are best effort: a `data:` uri or an odd value is still more
/// useful to the consumer than nothing.
pub fn resolve_src(base: &Url, src: &str) -> Option<String> {
    let src = src.trim();
    if src.is_empty() {
        return None;
    }

    match base.join(src) {
        Ok(url) => Some(url.to_string()),
        Err(_) => Some(src.to_string()),
    }
}
