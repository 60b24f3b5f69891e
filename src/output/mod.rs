//! Output module for crawl results and reports
//!
//! This module handles:
//! - Writing per-category and combined JSON result files
//! - Deriving file names from category names
//! - Recording and printing run statistics

pub mod json;
pub mod report;

pub use json::{category_file_name, slugify, to_pretty_json, ResultStore, COMBINED_FILE_NAME};
pub use report::{print_report, CrawlReport};
