//! Run report with skip counts
//!
//! Recoverable failures never stop a crawl; this report is where they become
//! visible after the run instead of disappearing.

use crate::crawler::PaginationStop;
use chrono::{DateTime, Utc};

/// Counters and timings collected during one run
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Categories listed by the root page
    pub categories_discovered: usize,

    /// Categories whose pagination ran to an end (any stop reason)
    pub categories_completed: usize,

    pub pages_fetched: usize,

    /// Listing pages that could not be fetched
    pub pages_failed: usize,

    pub products_enriched: usize,

    /// Products kept without image/description because their page failed
    pub products_degraded: usize,

    /// Repeated product urls dropped within a category
    pub duplicates_dropped: usize,

    /// Categories cut short by a cyclic next link
    pub cycles_detected: usize,

    /// Categories cut short by the page limit
    pub page_limits_hit: usize,

    /// Category files that could not be written
    pub write_failures: usize,

    pub cancelled: bool,
}

impl CrawlReport {
    /// Creates a report stamped with the current time as start
    pub fn started() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Stamps the finish time
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Records why a category's pagination ended
    pub fn record_stop(&mut self, stop: PaginationStop) {
        match stop {
            PaginationStop::CycleDetected => self.cycles_detected += 1,
            PaginationStop::PageLimit => self.page_limits_hit += 1,
            PaginationStop::Cancelled => self.cancelled = true,
            PaginationStop::Exhausted | PaginationStop::FetchFailed => {}
        }
    }

    /// Run duration in seconds, once finished
    pub fn duration_seconds(&self) -> Option<i64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some((end - start).num_seconds()),
            _ => None,
        }
    }

    /// Total of pages and products skipped or degraded
    pub fn skipped_total(&self) -> usize {
        self.pages_failed + self.products_degraded
    }

    /// Returns true if nothing was skipped, cut short, or left unwritten
    pub fn is_clean(&self) -> bool {
        self.skipped_total() == 0
            && self.cycles_detected == 0
            && self.page_limits_hit == 0
            && self.write_failures == 0
            && !self.cancelled
    }
}

/// Prints the report to stdout in a formatted manner
pub fn print_report(report: &CrawlReport, total_products: usize) {
    println!("=== Crawl Report ===\n");

    if let Some(started) = report.started_at {
        println!("Started:  {}", started.to_rfc3339());
    }
    if let Some(finished) = report.finished_at {
        println!("Finished: {}", finished.to_rfc3339());
    }
    if let Some(seconds) = report.duration_seconds() {
        println!("Duration: {}s", seconds);
    }
    println!();

    println!("Overview:");
    println!(
        "  Categories: {} completed of {} discovered",
        report.categories_completed, report.categories_discovered
    );
    println!("  Listing pages fetched: {}", report.pages_fetched);
    println!("  Products: {}", total_products);
    println!();

    if !report.is_clean() {
        println!("Skipped:");
        println!("  Listing pages failed: {}", report.pages_failed);
        println!(
            "  Products without detail page: {}",
            report.products_degraded
        );
        if report.duplicates_dropped > 0 {
            println!("  Repeated products dropped: {}", report.duplicates_dropped);
        }
        if report.cycles_detected > 0 {
            println!("  Categories with cyclic pagination: {}", report.cycles_detected);
        }
        if report.page_limits_hit > 0 {
            println!("  Categories at page limit: {}", report.page_limits_hit);
        }
        if report.write_failures > 0 {
            println!("  Category files not written: {}", report.write_failures);
        }
        if report.cancelled {
            println!("  Run was cancelled before completion");
        }
        println!();
    }

    let success_rate = if report.products_enriched > 0 {
        let complete = report.products_enriched - report.products_degraded;
        (complete as f64 / report.products_enriched as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Enrichment Rate: {:.1}% ({} / {} products with detail page)",
        success_rate,
        report.products_enriched - report.products_degraded,
        report.products_enriched
    );
}
