//! Product enrichment from detail pages
//!
//! Enrichment never fails: a detail page that cannot be fetched still yields a
//! product with the stub's name and url, marked as degraded so the run report
//! can count it.

use crate::crawler::fetcher::{FetchError, FetchedPage, PageFetcher};
use crate::crawler::parser::{extract_description, extract_image, SiteSelectors};
use crate::model::{Product, ProductStub};
use url::Url;

/// Result of enriching one stub
#[derive(Debug)]
pub struct Enrichment {
    pub product: Product,

    /// Set when the detail page could not be fetched
    pub degraded: Option<FetchError>,
}

impl Enrichment {
    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}

/// Fetches detail pages and fills in image and description
pub struct ProductEnricher<'a> {
    fetcher: &'a PageFetcher,
    selectors: &'a SiteSelectors,
}

impl<'a> ProductEnricher<'a> {
    pub fn new(fetcher: &'a PageFetcher, selectors: &'a SiteSelectors) -> Self {
        Self { fetcher, selectors }
    }

    /// Enriches a stub with one fetch of its detail page
    pub async fn enrich(&self, stub: ProductStub) -> Enrichment {
        let url = match Url::parse(&stub.url) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Product {} has an unusable url: {}", stub.url, e);
                let error = FetchError::Request {
                    url: stub.url.clone(),
                    message: e.to_string(),
                };
                return degraded(stub, error);
            }
        };

        match self.fetcher.fetch(&url).await {
            Ok(page) => Enrichment {
                product: self.read_detail_page(stub, &page),
                degraded: None,
            },
            Err(e) => {
                tracing::warn!("Could not enrich {}: {}", stub.url, e);
                degraded(stub, e)
            }
        }
    }

    fn read_detail_page(&self, stub: ProductStub, page: &FetchedPage) -> Product {
        let document = page.document();
        let image = extract_image(&document, &page.url, self.selectors);
        let description = extract_description(&document, self.selectors);

        if image.is_none() {
            tracing::debug!("No image found for {}", stub.url);
        }

        Product {
            image,
            description,
            ..Product::bare(stub)
        }
    }
}

fn degraded(stub: ProductStub, error: FetchError) -> Enrichment {
    Enrichment {
        product: Product::bare(stub),
        degraded: Some(error),
    }
}
