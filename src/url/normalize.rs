use url::Url;

/// Computes the identity key of a listing page
///
/// Two urls that a shop would serve as the same page map to the same key, so
/// a "next" link pointing back at an already visited page is recognized even
/// when it is spelled differently.
///
/// # Normalization Steps
///
/// 1. Host is lowercased (done by the `url` crate for http(s))
/// 2. Fragment is removed
/// 3. Path: empty segments dropped, trailing slash removed (except root)
/// 4. Query parameters sorted by key; an empty query is removed
///
/// The scheme is kept: a shop serving the same listing over http and https is
/// not something the pager should paper over.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use catalog_harvest::url::page_key;
///
/// let a = Url::parse("https://Shop.Example.com/fans/page/2/#top").unwrap();
/// let b = Url::parse("https://shop.example.com/fans//page/2").unwrap();
/// assert_eq!(page_key(&a), page_key(&b));
/// ```
pub fn page_key(url: &Url) -> String {
    let mut url = url.clone();

    url.set_fragment(None);

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    if url.query().is_some() {
        let params = sorted_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            // Re-encoded so an escaped `&` or `=` stays part of its value
            url.query_pairs_mut().clear().extend_pairs(params.iter());
        }
    }

    url.to_string()
}

/// Drops empty segments and the trailing slash
fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

fn sorted_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort();
    params
}
