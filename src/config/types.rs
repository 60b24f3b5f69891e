use serde::Deserialize;

/// Browser identity sent with every request; the shop rejects bare client agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Category page whose sidebar lists the categories to crawl
pub const DEFAULT_ROOT_URL: &str =
    "https://defrost.ir/shop/product-category/spare-parts-for-refrigerators/";

/// Main configuration structure for Catalog-Harvest
///
/// Every section is optional; a missing section takes its defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    pub selectors: SelectorConfig,
}

/// Target site configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Page holding the category navigation widget
    #[serde(rename = "root-url")]
    pub root_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root_url: DEFAULT_ROOT_URL.to_string(),
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Pause between two listing pages of the same category (milliseconds)
    #[serde(rename = "page-delay")]
    pub page_delay: u64,

    /// Maximum number of listing pages fetched for one category
    #[serde(rename = "max-pages-per-category")]
    pub max_pages_per_category: u32,

    /// Number of product detail pages enriched concurrently
    #[serde(rename = "enrich-concurrency")]
    pub enrich_concurrency: u32,

    /// Maximum number of requests in flight at once
    #[serde(rename = "max-concurrent-requests")]
    pub max_concurrent_requests: u32,

    /// Minimum time between the start of two requests (milliseconds)
    #[serde(rename = "request-interval")]
    pub request_interval: u64,

    /// Whole-request timeout (seconds)
    #[serde(rename = "request-timeout")]
    pub request_timeout: u64,

    /// Connection timeout (seconds)
    #[serde(rename = "connect-timeout")]
    pub connect_timeout: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            page_delay: 1000,
            max_pages_per_category: 200,
            enrich_concurrency: 1,
            max_concurrent_requests: 1,
            request_interval: 0,
            request_timeout: 30,
            connect_timeout: 10,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Full `User-Agent` header value
    pub value: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            value: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving the per-category files and `all_products.json`
    pub directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: ".".to_string(),
        }
    }
}

/// CSS selectors describing the shop's markup
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    #[serde(rename = "category-widget")]
    pub category_widget: String,

    #[serde(rename = "category-item")]
    pub category_item: String,

    #[serde(rename = "product-block")]
    pub product_block: String,

    /// Anchor inside a product block carrying the product url and title
    #[serde(rename = "product-link")]
    pub product_link: String,

    #[serde(rename = "next-page")]
    pub next_page: String,

    /// Main image inside the product gallery
    #[serde(rename = "gallery-image")]
    pub gallery_image: String,

    /// Any image, used when the gallery has none
    #[serde(rename = "fallback-image")]
    pub fallback_image: String,

    #[serde(rename = "short-description")]
    pub short_description: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            category_widget: "aside.widget_product_categories".to_string(),
            category_item: "li.cat-item".to_string(),
            product_block: "div.product-block, div.product".to_string(),
            product_link: "a.product-image[href]".to_string(),
            next_page: "a.next[href]".to_string(),
            gallery_image: "figure.woocommerce-product-gallery__wrapper img".to_string(),
            fallback_image: "img[src]".to_string(),
            short_description: "div.woocommerce-product-details__short-description"
                .to_string(),
        }
    }
}
