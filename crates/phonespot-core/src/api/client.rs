//! HTTP client for the Phone Spot content endpoint.
//!
//! The whole site is served as one JSON document from `GET {base}/api`;
//! every resource (categories, navbar links, hero slide) is cut from it.

use std::time::Duration;

use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::models::{Category, CategoryRoute, ContentDocument, Slide};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Default host of the content API and its assets
pub const DEFAULT_BASE_URL: &str = "https://phonespotbackend.blacktechcorp.com";

/// Path of the site document relative to the base URL
const CONTENT_PATH: &str = "api";

/// HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Content API client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ContentClient {
    client: Client,
    base_url: String,
    initial_backoff: Duration,
}

impl ContentClient {
    /// Create a client for the default endpoint
    pub fn new() -> Result<Self, ApiError> {
        Self::with_base_url(DEFAULT_BASE_URL, Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        })
    }

    /// Override the first rate-limit backoff; it doubles on every retry.
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Base URL that asset paths in the document are relative to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn content_url(&self) -> String {
        format!("{}/{}", self.base_url, CONTENT_PATH)
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>, ApiError> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let mut retries = 0;
        let mut backoff = self.initial_backoff;

        loop {
            let response = self
                .client
                .get(url)
                .header(header::ACCEPT, "application/json")
                .send()
                .await?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => {
                    // Read text first so a bad body is a decode error, not a network one
                    let text = response.text().await?;
                    debug!(url, bytes = text.len(), "Content response received");
                    return Ok(serde_json::from_str(&text)?);
                }
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited);
                    }
                    warn!(url, retry = retries, backoff_ms = backoff.as_millis() as u64, "Rate limited, backing off");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }
    }

    // ===== Data Fetching Methods =====

    /// Fetch the whole site document
    pub async fn fetch_document(&self) -> Result<ContentDocument, ApiError> {
        self.get(&self.content_url()).await
    }

    /// Service cards: categories linking to `/services/<slug>`
    pub async fn fetch_service_categories(&self) -> Result<Vec<Category>, ApiError> {
        let doc = self.fetch_document().await?;
        Ok(doc.categories(&self.base_url, CategoryRoute::ServicePage))
    }

    /// Navbar dropdown: categories with their bare slug
    pub async fn fetch_nav_categories(&self) -> Result<Vec<Category>, ApiError> {
        let doc = self.fetch_document().await?;
        Ok(doc.categories(&self.base_url, CategoryRoute::Bare))
    }

    /// Hero banner: the first slide, if the document has one
    pub async fn fetch_hero_slide(&self) -> Result<Option<Slide>, ApiError> {
        let doc = self.fetch_document().await?;
        Ok(doc.hero_slide(&self.base_url))
    }
}
