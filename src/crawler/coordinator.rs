//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the run loop that sequences one crawl:
//! - Discovering the categories on the root page
//! - Paging through every category listing
//! - Enriching each product from its detail page
//! - Saving each category as it completes and the combined result at the end
//!
//! Progress is reported as `CrawlEvent`s on an optional channel. Failures of
//! a single listing page or product are logged, counted, and skipped; only an
//! unreachable root page (or an unwritable combined file) fails the run.

use crate::config::Config;
use crate::crawler::discovery::fetch_categories;
use crate::crawler::enricher::ProductEnricher;
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::pager::{PageOutcome, PagerOptions, ProductListPager};
use crate::crawler::parser::SiteSelectors;
use crate::model::{CategoryRef, CategoryResult, CrawlResult, ProductStub};
use crate::output::{CrawlReport, ResultStore};
use crate::state::{RunPhase, RunTracker};
use crate::url::parse_site_url;
use crate::HarvestError;
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Progress of a run, in the order it happens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlEvent {
    /// Root page read
    DiscoveryFinished { category_count: usize },

    /// A category is about to be paged (index is 1-based)
    CategoryStarted {
        category_index: usize,
        category_count: usize,
        category_name: String,
    },

    /// A listing page of the current category failed and was skipped
    PageSkipped {
        category_name: String,
        url: String,
        reason: String,
    },

    /// A category is complete
    CategoryFinished {
        category_index: usize,
        category_count: usize,
        category_name: String,
        products_in_category: usize,
        products_so_far: usize,
        saved_to: Option<PathBuf>,
    },

    /// The run is complete
    Finished { total_products: usize },
}

/// What a completed run produced
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub result: CrawlResult,
    pub report: CrawlReport,
}

/// Main crawler coordinator structure
///
/// A coordinator runs once; calling [`run`](Self::run) again fails with
/// `InvalidTransition`.
pub struct Coordinator {
    fetcher: PageFetcher,
    selectors: SiteSelectors,
    root_url: Url,
    pager_options: PagerOptions,
    enrich_concurrency: usize,
    events: Option<UnboundedSender<CrawlEvent>>,
    store: Option<ResultStore>,
    cancel: CancellationToken,
    phase: RunPhase,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(HarvestError)` - Invalid selectors, root url, or HTTP client setup
    pub fn new(config: Config) -> Result<Self, HarvestError> {
        let selectors = SiteSelectors::compile(&config.selectors)?;
        let root_url = parse_site_url(&config.site.root_url)?;
        let fetcher = PageFetcher::new(&config)?;

        Ok(Self {
            fetcher,
            selectors,
            root_url,
            pager_options: PagerOptions::from_config(&config.crawler),
            enrich_concurrency: (config.crawler.enrich_concurrency as usize).max(1),
            events: None,
            store: None,
            cancel: CancellationToken::new(),
            phase: RunPhase::Idle,
        })
    }

    /// Sends progress events to `events`
    pub fn with_events(mut self, events: UnboundedSender<CrawlEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Saves each category and the combined result to `store`
    pub fn with_store(mut self, store: ResultStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Stops the run at the next page or product boundary once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Current phase of the run
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Runs the crawl
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlOutcome)` - Result and report, possibly partial if cancelled
    /// * `Err(HarvestError)` - Root page unreachable, combined file not
    ///   written, or the coordinator already ran
    pub async fn run(&mut self) -> Result<CrawlOutcome, HarvestError> {
        let mut tracker = RunTracker::resume(self.phase);
        let outcome = self.execute(&mut tracker).await;
        self.phase = tracker.phase();
        outcome
    }

    async fn execute(&self, tracker: &mut RunTracker) -> Result<CrawlOutcome, HarvestError> {
        tracker.transition(RunPhase::Discovering)?;
        let mut report = CrawlReport::started();

        tracing::info!("Starting crawl at {}", self.root_url);

        let categories = match fetch_categories(&self.fetcher, &self.selectors, &self.root_url).await
        {
            Ok(categories) => categories,
            Err(e) => {
                tracing::error!("Root page unreachable: {}", e);
                tracker.transition(RunPhase::Failed)?;
                return Err(e.into());
            }
        };

        let category_count = categories.len();
        report.categories_discovered = category_count;
        self.emit(CrawlEvent::DiscoveryFinished { category_count });

        let mut results = Vec::with_capacity(category_count);
        let mut products_so_far = 0;

        for (index, category) in categories.iter().enumerate() {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let category_index = index + 1;
            tracing::info!(
                "Category {} of {}: {}",
                category_index,
                category_count,
                category.name
            );
            self.emit(CrawlEvent::CategoryStarted {
                category_index,
                category_count,
                category_name: category.name.clone(),
            });

            let category_result = self.crawl_category(category, tracker, &mut report).await?;
            products_so_far += category_result.len();
            let saved_to = self.save_category(&category_result, &mut report);

            tracing::info!(
                "Category {} done: {} products ({} so far)",
                category.name,
                category_result.len(),
                products_so_far
            );
            self.emit(CrawlEvent::CategoryFinished {
                category_index,
                category_count,
                category_name: category.name.clone(),
                products_in_category: category_result.len(),
                products_so_far,
                saved_to,
            });

            results.push(category_result);

            if report.cancelled {
                tracing::warn!("Crawl cancelled after {} categories", results.len());
                break;
            }
        }

        tracker.transition(RunPhase::Aggregating)?;
        let result = CrawlResult::from_categories(results);

        if let Some(store) = &self.store {
            match store.write_combined(&result) {
                Ok(path) => tracing::info!("Wrote combined result to {}", path.display()),
                Err(e) => {
                    tracing::error!("Could not write combined result: {}", e);
                    tracker.transition(RunPhase::Failed)?;
                    return Err(e);
                }
            }
        }

        report.finish();
        tracker.transition(RunPhase::Done)?;

        tracing::info!(
            "Crawl completed: {} products in {} categories",
            result.total_products,
            result.categories.len()
        );
        self.emit(CrawlEvent::Finished {
            total_products: result.total_products,
        });

        Ok(CrawlOutcome { result, report })
    }

    /// Pages through one category and enriches its products
    async fn crawl_category(
        &self,
        category: &CategoryRef,
        tracker: &mut RunTracker,
        report: &mut CrawlReport,
    ) -> Result<CategoryResult, HarvestError> {
        tracker.transition(RunPhase::Paging)?;
        let mut result = CategoryResult::new(category);

        let start_url = match Url::parse(&category.url) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Skipping category {}: bad url {}: {}", category.name, category.url, e);
                report.pages_failed += 1;
                return Ok(result);
            }
        };

        let mut pager =
            ProductListPager::new(&self.fetcher, &self.selectors, start_url, self.pager_options)
                .with_cancellation(self.cancel.clone());
        let enricher = ProductEnricher::new(&self.fetcher, &self.selectors);

        while let Some(page) = pager.next_page().await {
            match page.outcome {
                PageOutcome::Failed(error) => {
                    report.pages_failed += 1;
                    self.emit(CrawlEvent::PageSkipped {
                        category_name: category.name.clone(),
                        url: page.url.to_string(),
                        reason: error.to_string(),
                    });
                }
                PageOutcome::Listed(stubs) => {
                    report.pages_fetched += 1;
                    if stubs.is_empty() {
                        continue;
                    }

                    tracker.transition(RunPhase::Enriching)?;
                    let cancelled = self.enrich_page(&enricher, stubs, &mut result, report).await;
                    tracker.transition(RunPhase::Paging)?;

                    if cancelled {
                        break;
                    }
                }
            }
        }

        if let Some(stop) = pager.stop_reason() {
            tracing::debug!("Pagination of {} ended: {:?}", category.name, stop);
            report.record_stop(stop);
        }
        report.duplicates_dropped += pager.duplicates_dropped();

        if !report.cancelled {
            report.categories_completed += 1;
        }

        Ok(result)
    }

    /// Enriches the stubs of one listing page, keeping their order
    ///
    /// Returns true if the run was cancelled while enriching.
    async fn enrich_page(
        &self,
        enricher: &ProductEnricher<'_>,
        stubs: Vec<ProductStub>,
        result: &mut CategoryResult,
        report: &mut CrawlReport,
    ) -> bool {
        // buffered() yields in input order whatever order the fetches finish in
        let mut enrichments = stream::iter(stubs)
            .map(move |stub| enricher.enrich(stub))
            .buffered(self.enrich_concurrency);

        while let Some(enrichment) = enrichments.next().await {
            report.products_enriched += 1;
            if enrichment.is_degraded() {
                report.products_degraded += 1;
            }
            result.push(enrichment.product);

            if self.cancel.is_cancelled() {
                report.cancelled = true;
                return true;
            }
        }

        false
    }

    /// Writes a finished category; a failure is counted, not fatal
    fn save_category(&self, category: &CategoryResult, report: &mut CrawlReport) -> Option<PathBuf> {
        let store = self.store.as_ref()?;

        match store.write_category(category) {
            Ok(path) => {
                tracing::debug!("Saved {} to {}", category.category_name, path.display());
                Some(path)
            }
            Err(e) => {
                tracing::warn!("Could not save category {}: {}", category.category_name, e);
                report.write_failures += 1;
                None
            }
        }
    }

    fn emit(&self, event: CrawlEvent) {
        if let Some(events) = &self.events {
            // A gone listener does not stop the crawl
            let _ = events.send(event);
        }
    }
}

/// Runs a complete crawl with results written to the configured directory
///
/// # Example
///
/// ```no_run
/// use catalog_harvest::config::Config;
/// use catalog_harvest::crawler::run_crawl;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let outcome = run_crawl(Config::default()).await?;
/// println!("{} products", outcome.result.total_products);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> Result<CrawlOutcome, HarvestError> {
    let store = ResultStore::new(&config.output.directory)?;
    let mut coordinator = Coordinator::new(config)?.with_store(store);
    coordinator.run().await
}
