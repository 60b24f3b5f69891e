//! Crawler module for catalog fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - Paced HTTP fetching with per-request timeouts
//! - Selector-driven extraction of categories, products, and details
//! - Pagination with cycle and page-limit protection
//! - Overall crawl coordination and progress events

mod coordinator;
mod discovery;
mod enricher;
mod fetcher;
mod pager;
mod parser;
mod scheduler;

pub use coordinator::{run_crawl, Coordinator, CrawlEvent, CrawlOutcome};
pub use discovery::{discover_categories, fetch_categories};
pub use enricher::{Enrichment, ProductEnricher};
pub use fetcher::{build_http_client, FetchError, FetchedPage, PageFetcher};
pub use pager::{ListingPage, PageOutcome, PagerOptions, PaginationStop, ProductListPager};
pub use parser::{
    extract_categories, extract_description, extract_image, extract_product_stubs,
    find_next_page, ImageStrategy, SiteSelectors,
};
pub use scheduler::{PacedPermit, RequestPacer};
