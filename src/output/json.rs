//! JSON result files
//!
//! One file per category, named after the category, plus `all_products.json`
//! with the whole run. Files are pretty-printed UTF-8 with non-ASCII text left
//! as is.

use crate::model::{CategoryResult, CrawlResult};
use crate::HarvestError;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Name of the combined result file
pub const COMBINED_FILE_NAME: &str = "all_products.json";

/// Fallback stem for a category whose name has no usable characters
const FALLBACK_STEM: &str = "category";

/// Turns a category name into a file name stem
///
/// # Rules
///
/// 1. Trim surrounding whitespace
/// 2. Replace each run of whitespace or zero-width (non-)joiners with `_`
/// 3. Drop every character that is not alphanumeric, `_`, or `-`, and drop
///    combining diacritics (Arabic harakat, Latin accents written separately)
///
/// Applying it twice gives the same result as applying it once.
///
/// # Examples
///
/// ```
/// use catalog_harvest::output::slugify;
///
/// assert_eq!(slugify("  Door Gaskets (new) "), "Door_Gaskets_new");
/// assert_eq!(slugify("فن\u{200c}های یخچال"), "فن_های_یخچال");
/// ```
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut in_separator_run = false;

    for c in name.trim().chars() {
        if is_separator(c) {
            if !in_separator_run {
                slug.push('_');
                in_separator_run = true;
            }
            continue;
        }

        in_separator_run = false;
        if (c.is_alphanumeric() && !is_combining_diacritic(c)) || c == '_' || c == '-' {
            slug.push(c);
        }
    }

    slug
}

/// Nonspacing marks `is_alphanumeric` accepts but a file name should not carry
const COMBINING_DIACRITICS: &[(char, char)] = &[
    ('\u{0300}', '\u{036F}'),
    ('\u{0610}', '\u{061A}'),
    ('\u{064B}', '\u{065F}'),
    ('\u{0670}', '\u{0670}'),
    ('\u{06D6}', '\u{06DC}'),
    ('\u{06DF}', '\u{06E4}'),
    ('\u{06E7}', '\u{06E8}'),
    ('\u{06EA}', '\u{06ED}'),
    ('\u{08D3}', '\u{08FF}'),
];

fn is_combining_diacritic(c: char) -> bool {
    COMBINING_DIACRITICS
        .iter()
        .any(|&(start, end)| (start..=end).contains(&c))
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == '\u{200c}' || c == '\u{200d}'
}

/// File name for a category's result file
pub fn category_file_name(category_name: &str) -> String {
    let slug = slugify(category_name);
    if slug.is_empty() {
        format!("{}.json", FALLBACK_STEM)
    } else {
        format!("{}.json", slug)
    }
}

/// Serializes a value as indented JSON
pub fn to_pretty_json<T: Serialize>(value: &T) -> Result<String, HarvestError> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Writes result files into one directory
#[derive(Debug, Clone)]
pub struct ResultStore {
    directory: PathBuf,
}

impl ResultStore {
    /// Opens a store, creating the directory if needed
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self, HarvestError> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory)?;
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Writes one category's result and returns the file path
    pub fn write_category(&self, category: &CategoryResult) -> Result<PathBuf, HarvestError> {
        let path = self
            .directory
            .join(category_file_name(&category.category_name));
        self.write_json(&path, category)?;
        Ok(path)
    }

    /// Writes the combined result and returns the file path
    pub fn write_combined(&self, result: &CrawlResult) -> Result<PathBuf, HarvestError> {
        let path = self.directory.join(COMBINED_FILE_NAME);
        self.write_json(&path, result)?;
        Ok(path)
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), HarvestError> {
        let json = to_pretty_json(value)?;
        std::fs::write(path, json)?;
        tracing::debug!("Wrote {}", path.display());
        Ok(())
    }
}
