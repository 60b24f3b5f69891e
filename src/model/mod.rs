//! Catalog data model
//!
//! Types produced by a crawl, from the references found on listing pages up to
//! the combined result of a whole run. The serialized field names are the
//! on-disk format of the result files.

use serde::{Deserialize, Serialize};

/// A category found in the root page's navigation widget
///
/// Identified by its url.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub name: String,
    pub url: String,
}

/// A product reference read from a listing page, before enrichment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductStub {
    pub name: String,
    pub url: String,
}

/// A product enriched with its detail page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub url: String,
    /// Representative image url, `null` when the detail page had none
    pub image: Option<String>,
    /// Short description, empty when absent
    pub description: String,
}

impl Product {
    /// Builds a product carrying only the stub's identity
    pub fn bare(stub: ProductStub) -> Self {
        Self {
            name: stub.name,
            url: stub.url,
            image: None,
            description: String::new(),
        }
    }
}

/// Products of one category in listing order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryResult {
    pub category_name: String,
    pub category_url: String,
    pub products: Vec<Product>,
}

impl CategoryResult {
    /// Starts an empty result for a category
    pub fn new(category: &CategoryRef) -> Self {
        Self {
            category_name: category.name.clone(),
            category_url: category.url.clone(),
            products: Vec::new(),
        }
    }

    /// Appends a product, keeping traversal order
    pub fn push(&mut self, product: Product) {
        self.products.push(product);
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

/// Terminal artifact of a run
///
/// Built only through [`CrawlResult::from_categories`] so `total_products`
/// always equals the sum of the per-category counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlResult {
    pub total_products: usize,
    pub categories: Vec<CategoryResult>,
}

impl CrawlResult {
    pub fn from_categories(categories: Vec<CategoryResult>) -> Self {
        let total_products = categories.iter().map(CategoryResult::len).sum();
        Self {
            total_products,
            categories,
        }
    }

    pub fn empty() -> Self {
        Self::from_categories(Vec::new())
    }
}
