//! HTML extraction rules for the shop's pages
//!
//! This module turns parsed pages into catalog data:
//! - Category entries from the navigation widget
//! - Product stubs from listing pages
//! - The "next page" link
//! - Image and short description from product detail pages
//!
//! All functions are pure and synchronous. Missing markup is never an error;
//! it shows up as an empty vector, `None`, or an empty string.

use crate::config::SelectorConfig;
use crate::model::{CategoryRef, ProductStub};
use crate::url::{resolve_href, resolve_src};
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Compiled selectors for one shop layout
#[derive(Debug, Clone)]
pub struct SiteSelectors {
    category_widget: Selector,
    category_item: Selector,
    category_link: Selector,
    product_block: Selector,
    product_link: Selector,
    next_page: Selector,
    gallery_image: Selector,
    fallback_image: Selector,
    short_description: Selector,
}

impl SiteSelectors {
    /// Compiles every selector of the configuration
    ///
    /// # Returns
    ///
    /// * `Ok(SiteSelectors)` - All selectors compiled
    /// * `Err(ConfigError::InvalidSelector)` - The first selector that did not
    pub fn compile(config: &SelectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            category_widget: compile_selector(&config.category_widget)?,
            category_item: compile_selector(&config.category_item)?,
            category_link: compile_selector("a[href]")?,
            product_block: compile_selector(&config.product_block)?,
            product_link: compile_selector(&config.product_link)?,
            next_page: compile_selector(&config.next_page)?,
            gallery_image: compile_selector(&config.gallery_image)?,
            fallback_image: compile_selector(&config.fallback_image)?,
            short_description: compile_selector(&config.short_description)?,
        })
    }
}

fn compile_selector(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// Where to look for a product's representative image, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStrategy {
    /// First image inside the product gallery, if it has a source
    GalleryImage,
    /// First image anywhere on the page with a source
    FirstImage,
}

impl ImageStrategy {
    /// Strategies tried by [`extract_image`]; the first hit wins
    pub const PRIORITY: [ImageStrategy; 2] = [Self::GalleryImage, Self::FirstImage];

    /// Applies this strategy to a detail page
    pub fn extract(
        &self,
        document: &Html,
        base_url: &Url,
        selectors: &SiteSelectors,
    ) -> Option<String> {
        match self {
            Self::GalleryImage => document
                .select(&selectors.gallery_image)
                .next()
                .and_then(|img| img.value().attr("src"))
                .and_then(|src| resolve_src(base_url, src)),
            Self::FirstImage => document.select(&selectors.fallback_image).find_map(|img| {
                img.value()
                    .attr("src")
                    .and_then(|src| resolve_src(base_url, src))
            }),
        }
    }
}

/// Extracts the categories listed in the navigation widget
///
/// Only the first widget on the page is read. For each entry the first anchor
/// with an href gives the url and its text gives the name. Entries without a
/// usable anchor are skipped; a url seen earlier in the widget is dropped.
///
/// # Example
///
/// ```
/// use catalog_harvest::config::SelectorConfig;
/// use catalog_harvest::crawler::{extract_categories, SiteSelectors};
/// use scraper::Html;
/// use url::Url;
///
/// let html = r#"<aside class="widget_product_categories"><ul>
///     <li class="cat-item"><a href="/c/fans/">Fans</a></li>
/// </ul></aside>"#;
/// let document = Html::parse_document(html);
/// let base = Url::parse("https://shop.example.com/").unwrap();
/// let selectors = SiteSelectors::compile(&SelectorConfig::default()).unwrap();
/// let categories = extract_categories(&document, &base, &selectors);
/// assert_eq!(categories[0].name, "Fans");
/// assert_eq!(categories[0].url, "https://shop.example.com/c/fans/");
/// ```
pub fn extract_categories(
    document: &Html,
    base_url: &Url,
    selectors: &SiteSelectors,
) -> Vec<CategoryRef> {
    let widget = match document.select(&selectors.category_widget).next() {
        Some(widget) => widget,
        None => return Vec::new(),
    };

    let mut categories: Vec<CategoryRef> = Vec::new();

    for item in widget.select(&selectors.category_item) {
        let anchor = match item.select(&selectors.category_link).next() {
            Some(a) => a,
            None => continue,
        };

        let url = match anchor
            .value()
            .attr("href")
            .and_then(|href| resolve_href(base_url, href))
        {
            Some(url) => url.to_string(),
            None => continue,
        };

        if categories.iter().any(|c| c.url == url) {
            continue;
        }

        categories.push(CategoryRef {
            name: stripped_text(&anchor),
            url,
        });
    }

    categories
}

/// Extracts the product stubs of a listing page in document order
///
/// The name is the anchor's `title` attribute when present and non-empty,
/// otherwise its text. Blocks without a product anchor are dropped.
pub fn extract_product_stubs(
    document: &Html,
    base_url: &Url,
    selectors: &SiteSelectors,
) -> Vec<ProductStub> {
    let mut stubs = Vec::new();

    for block in document.select(&selectors.product_block) {
        let anchor = match block.select(&selectors.product_link).next() {
            Some(a) => a,
            None => continue,
        };

        let url = match anchor
            .value()
            .attr("href")
            .and_then(|href| resolve_href(base_url, href))
        {
            Some(url) => url,
            None => continue,
        };

        let name = anchor
            .value()
            .attr("title")
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| stripped_text(&anchor));

        stubs.push(ProductStub {
            name,
            url: url.to_string(),
        });
    }

    stubs
}

/// Finds the url of the next listing page
pub fn find_next_page(document: &Html, base_url: &Url, selectors: &SiteSelectors) -> Option<Url> {
    document
        .select(&selectors.next_page)
        .filter_map(|a| a.value().attr("href"))
        .find_map(|href| resolve_href(base_url, href))
}

/// Extracts the representative image of a product detail page
///
/// Tries each [`ImageStrategy`] in priority order.
pub fn extract_image(document: &Html, base_url: &Url, selectors: &SiteSelectors) -> Option<String> {
    ImageStrategy::PRIORITY
        .iter()
        .find_map(|strategy| strategy.extract(document, base_url, selectors))
}

/// Extracts the short description, or an empty string when the block is absent
pub fn extract_description(document: &Html, selectors: &SiteSelectors) -> String {
    document
        .select(&selectors.short_description)
        .next()
        .map(|block| stripped_text(&block))
        .unwrap_or_default()
}

/// Text of an element with every text node trimmed and empty ones dropped
fn stripped_text(element: &ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .concat()
}
