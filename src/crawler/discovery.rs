//! Category discovery from the root page

use crate::crawler::fetcher::{FetchError, FetchedPage, PageFetcher};
use crate::crawler::parser::{extract_categories, SiteSelectors};
use crate::model::CategoryRef;
use url::Url;

/// Reads the categories from an already fetched root page
///
/// A page without the category widget yields no categories; that is an empty
/// shop, not an error.
pub fn discover_categories(root: &FetchedPage, selectors: &SiteSelectors) -> Vec<CategoryRef> {
    let document = root.document();
    let categories = extract_categories(&document, &root.url, selectors);

    if categories.is_empty() {
        tracing::warn!("No categories found on {}", root.url);
    } else {
        tracing::info!("Discovered {} categories on {}", categories.len(), root.url);
    }

    categories
}

/// Fetches the root page and reads its categories
///
/// # Returns
///
/// * `Ok(Vec<CategoryRef>)` - Categories in widget order, possibly empty
/// * `Err(FetchError)` - The root page could not be fetched
pub async fn fetch_categories(
    fetcher: &PageFetcher,
    selectors: &SiteSelectors,
    root_url: &Url,
) -> Result<Vec<CategoryRef>, FetchError> {
    let root = fetcher.fetch(root_url).await?;
    Ok(discover_categories(&root, selectors))
}
