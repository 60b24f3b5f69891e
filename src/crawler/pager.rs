//! Paginated listing traversal for one category
//!
//! The pager walks a category's listing by following its "next" links, one
//! page per poll, pausing between pages. The walk is bounded: it stops at the
//! page limit, on a next link that points back at a visited page, on a failed
//! fetch, or when the run is cancelled.

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::{FetchError, FetchedPage, PageFetcher};
use crate::crawler::parser::{extract_product_stubs, find_next_page, SiteSelectors};
use crate::model::ProductStub;
use crate::url::page_key;
use futures::stream::{self, Stream, StreamExt};
use std::collections::HashSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Limits applied to one category's pagination
#[derive(Debug, Clone, Copy)]
pub struct PagerOptions {
    /// Pause before every page after the first
    pub page_delay: Duration,

    /// Maximum number of pages fetched
    pub max_pages: usize,
}

impl PagerOptions {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            page_delay: Duration::from_millis(config.page_delay),
            max_pages: config.max_pages_per_category as usize,
        }
    }
}

impl Default for PagerOptions {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}

/// Why pagination ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaginationStop {
    /// The last page had no next link
    Exhausted,
    /// The next link pointed at a page already visited
    CycleDetected,
    /// The page limit was reached with more pages announced
    PageLimit,
    /// A listing page could not be fetched
    FetchFailed,
    /// The run was cancelled
    Cancelled,
}

impl PaginationStop {
    /// Returns true if pagination ended before the listing was exhausted
    pub fn is_early(&self) -> bool {
        !matches!(self, Self::Exhausted)
    }
}

/// What one listing page produced
#[derive(Debug)]
pub enum PageOutcome {
    /// Stubs found on the page, in page order
    Listed(Vec<ProductStub>),
    /// The page could not be fetched; it is skipped
    Failed(FetchError),
}

/// One polled listing page
#[derive(Debug)]
pub struct ListingPage {
    /// Url of the page (final url after redirects when fetched)
    pub url: Url,

    /// 1-based position of the page within the category
    pub page_number: usize,

    pub outcome: PageOutcome,
}

impl ListingPage {
    /// Stubs of the page; a failed page has none
    pub fn into_stubs(self) -> Vec<ProductStub> {
        match self.outcome {
            PageOutcome::Listed(stubs) => stubs,
            PageOutcome::Failed(_) => Vec::new(),
        }
    }
}

/// Walks the listing pages of one category
///
/// Finite and not restartable. No request is made until the first poll.
pub struct ProductListPager<'a> {
    fetcher: &'a PageFetcher,
    selectors: &'a SiteSelectors,
    options: PagerOptions,
    cancel: CancellationToken,

    /// Page to fetch on the next poll
    next_url: Option<Url>,

    /// Keys of every page fetched so far
    visited: HashSet<String>,

    /// Product urls already yielded for this category
    seen_products: HashSet<String>,

    pages_fetched: usize,
    duplicates_dropped: usize,
    stop: Option<PaginationStop>,
}

impl<'a> ProductListPager<'a> {
    pub fn new(
        fetcher: &'a PageFetcher,
        selectors: &'a SiteSelectors,
        start_url: Url,
        options: PagerOptions,
    ) -> Self {
        Self {
            fetcher,
            selectors,
            options,
            cancel: CancellationToken::new(),
            next_url: Some(start_url),
            visited: HashSet::new(),
            seen_products: HashSet::new(),
            pages_fetched: 0,
            duplicates_dropped: 0,
            stop: None,
        }
    }

    /// Observes a run cancellation token before every page
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Why pagination ended, once it has
    pub fn stop_reason(&self) -> Option<PaginationStop> {
        self.stop
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Product blocks dropped because their url was already yielded
    pub fn duplicates_dropped(&self) -> usize {
        self.duplicates_dropped
    }

    /// Fetches the next listing page
    ///
    /// # Returns
    ///
    /// * `Some(ListingPage)` - A page was attempted; a failed page ends the walk
    /// * `None` - Pagination has ended; see [`stop_reason`](Self::stop_reason)
    pub async fn next_page(&mut self) -> Option<ListingPage> {
        if self.stop.is_some() {
            return None;
        }

        let url = match self.next_url.take() {
            Some(url) => url,
            None => return self.finish(PaginationStop::Exhausted),
        };

        if self.cancel.is_cancelled() {
            return self.finish(PaginationStop::Cancelled);
        }

        if self.pages_fetched >= self.options.max_pages {
            tracing::warn!(
                "Page limit of {} reached, not following {}",
                self.options.max_pages,
                url
            );
            return self.finish(PaginationStop::PageLimit);
        }

        if self.pages_fetched > 0 && !self.options.page_delay.is_zero() {
            let cancelled = tokio::select! {
                _ = tokio::time::sleep(self.options.page_delay) => false,
                _ = self.cancel.cancelled() => true,
            };
            if cancelled {
                return self.finish(PaginationStop::Cancelled);
            }
        }

        self.visited.insert(page_key(&url));
        self.pages_fetched += 1;
        let page_number = self.pages_fetched;

        let fetched = match self.fetcher.fetch(&url).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Skipping listing page {}: {}", url, e);
                self.stop = Some(PaginationStop::FetchFailed);
                return Some(ListingPage {
                    url,
                    page_number,
                    outcome: PageOutcome::Failed(e),
                });
            }
        };

        // A redirect may land on a page visited under another url
        self.visited.insert(page_key(&fetched.url));

        let (stubs, next) = self.read_page(&fetched);
        tracing::debug!(
            "Listing page {} ({}): {} products",
            page_number,
            fetched.url,
            stubs.len()
        );

        match next {
            Some(next) if self.visited.contains(&page_key(&next)) => {
                tracing::warn!(
                    "Next link on {} points back to visited page {}, stopping",
                    fetched.url,
                    next
                );
                self.stop = Some(PaginationStop::CycleDetected);
            }
            Some(next) => self.next_url = Some(next),
            None => self.stop = Some(PaginationStop::Exhausted),
        }

        Some(ListingPage {
            url: fetched.url,
            page_number,
            outcome: PageOutcome::Listed(stubs),
        })
    }

    /// Extracts new stubs and the next link from a fetched page
    fn read_page(&mut self, page: &FetchedPage) -> (Vec<ProductStub>, Option<Url>) {
        let document = page.document();
        let found = extract_product_stubs(&document, &page.url, self.selectors);
        let next = find_next_page(&document, &page.url, self.selectors);

        let mut stubs = Vec::with_capacity(found.len());
        for stub in found {
            if self.seen_products.insert(stub.url.clone()) {
                stubs.push(stub);
            } else {
                tracing::debug!("Dropping repeated product {}", stub.url);
                self.duplicates_dropped += 1;
            }
        }

        (stubs, next)
    }

    fn finish(&mut self, reason: PaginationStop) -> Option<ListingPage> {
        self.stop = Some(reason);
        None
    }

    /// Turns the pager into a lazy stream of stubs across all pages
    pub fn into_stub_stream(self) -> impl Stream<Item = ProductStub> + 'a {
        stream::unfold(self, |mut pager| async move {
            let page = pager.next_page().await?;
            Some((page, pager))
        })
        .flat_map(|page| stream::iter(page.into_stubs()))
    }
}
