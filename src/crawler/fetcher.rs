//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the browser identity header and timeouts
//! - GET requests to fetch page content, paced by the shared `RequestPacer`
//! - Error classification
//!
//! The fetcher never retries; deciding what a failure means is up to the caller.

use crate::config::Config;
use crate::crawler::scheduler::RequestPacer;
use reqwest::{redirect::Policy, Client};
use scraper::Html;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Maximum number of redirects followed for one request
const MAX_REDIRECTS: usize = 10;

/// Why a single page could not be fetched
#[derive(Debug, Error)]
pub enum FetchError {
    /// Server answered with a non-success status
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// Request did not complete within the timeout
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    /// Connection could not be established (DNS, refused, TLS)
    #[error("Connection failed for {url}: {message}")]
    Connect { url: String, message: String },

    /// Any other transport or body error
    #[error("Request failed for {url}: {message}")]
    Request { url: String, message: String },

    /// The pacer was closed while waiting for a slot
    #[error("Fetcher closed before requesting {url}")]
    Closed { url: String },
}

impl FetchError {
    /// The url the failed request was made for
    pub fn url(&self) -> &str {
        match self {
            Self::Status { url, .. }
            | Self::Timeout { url }
            | Self::Connect { url, .. }
            | Self::Request { url, .. }
            | Self::Closed { url } => url,
        }
    }

    /// Classifies a reqwest error
    fn from_reqwest(url: &Url, error: reqwest::Error) -> Self {
        let url = url.to_string();
        if error.is_timeout() {
            Self::Timeout { url }
        } else if error.is_connect() {
            Self::Connect {
                url,
                message: error.to_string(),
            }
        } else {
            Self::Request {
                url,
                message: error.to_string(),
            }
        }
    }
}

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final url after redirects; relative links resolve against it
    pub url: Url,

    /// Page body
    pub body: String,
}

impl FetchedPage {
    /// Parses the body into a document
    ///
    /// `Html` is not `Send`; parse, extract, and drop it between awaits.
    pub fn document(&self) -> Html {
        Html::parse_document(&self.body)
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.value.trim())
        .timeout(Duration::from_secs(config.crawler.request_timeout))
        .connect_timeout(Duration::from_secs(config.crawler.connect_timeout))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches pages with the configured identity, timeouts, and pacing
pub struct PageFetcher {
    client: Client,
    pacer: RequestPacer,
}

impl PageFetcher {
    /// Creates a fetcher from the crawler configuration
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = build_http_client(config)?;
        let pacer = RequestPacer::new(
            config.crawler.max_concurrent_requests as usize,
            Duration::from_millis(config.crawler.request_interval),
        );

        Ok(Self::with_client(client, pacer))
    }

    /// Creates a fetcher around an existing client and pacer
    pub fn with_client(client: Client, pacer: RequestPacer) -> Self {
        Self { client, pacer }
    }

    /// Fetches a page with a single GET request
    ///
    /// # Error Classification
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | 2xx | `Ok(FetchedPage)` |
    /// | Other status | `FetchError::Status` |
    /// | Timeout | `FetchError::Timeout` |
    /// | DNS / refused / TLS | `FetchError::Connect` |
    /// | Anything else | `FetchError::Request` |
    pub async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let _permit = self.pacer.acquire().await.ok_or_else(|| FetchError::Closed {
            url: url.to_string(),
        })?;

        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        Ok(FetchedPage {
            url: final_url,
            body,
        })
    }

    /// Closes the fetcher; requests waiting for a slot fail with `Closed`
    pub fn close(&self) {
        self.pacer.close();
    }
}
