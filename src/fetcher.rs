//! Page fetching for source sites.
//!
//! [`WebFetcher`] is a browser-looking HTTP client: realistic headers, a
//! cookie jar shared across requests, and a Referer that follows the last
//! page visited. Failed attempts are retried a fixed number of times with a
//! fixed delay in between.

use crate::config::ScrapingConfig;
use crate::cookies::seed_jar_from_dir;
use crate::error::FetchError;
use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Retrieves the raw HTML of a page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `url`, returning the response body as text.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// HTTP page fetcher with retry and Referer continuity.
///
/// One instance models one scraping session: the Referer of each request is
/// the URL of the previous successful one.
pub struct WebFetcher {
    client: reqwest::Client,
    config: ScrapingConfig,
    last_url: Mutex<Option<String>>,
}

impl WebFetcher {
    /// Creates a fetcher from scraping settings.
    ///
    /// Cookie files in `cookie_directory` are loaded into the jar. A cookie
    /// directory that can't be read is logged and skipped.
    pub fn new(config: ScrapingConfig) -> Result<Self, FetchError> {
        let jar = Arc::new(Jar::default());

        if let Some(dir) = &config.cookie_directory {
            let now = chrono::Utc::now().timestamp().max(0) as u64;
            match seed_jar_from_dir(&jar, dir, now) {
                Ok(files) => info!(count = files.len(), dir = %dir.display(), "loaded cookie files"),
                Err(e) => warn!(dir = %dir.display(), error = %e, "failed to load cookies"),
            }
        }

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(browser_headers())
            .cookie_provider(jar)
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            config,
            last_url: Mutex::new(None),
        })
    }

    /// Returns the URL that will be sent as Referer on the next request.
    pub fn last_url(&self) -> Option<String> {
        self.last_url.lock().ok().and_then(|last| last.clone())
    }

    fn remember(&self, url: &str) {
        if let Ok(mut last) = self.last_url.lock() {
            *last = Some(url.to_string());
        }
    }

    async fn attempt(&self, url: &str) -> Result<String, FetchError> {
        rate_limit(self.config.delay_between_requests_sec).await;

        let mut request = self.client.get(url);
        if let Some(referer) = self.last_url() {
            request = request.header(REFERER, referer);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl PageFetcher for WebFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        url::Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;

        let attempts = self.config.retries.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.attempt(url).await {
                Ok(body) => {
                    debug!(url, attempt, bytes = body.len(), "fetched page");
                    self.remember(url);
                    return Ok(body);
                }
                Err(e) => {
                    warn!(url, attempt, attempts, error = %e, "page fetch failed");
                    last_error = e.to_string();
                    if attempt < attempts {
                        tokio::time::sleep(self.config.retry_delay()).await;
                    }
                }
            }
        }

        Err(FetchError::RetriesExhausted {
            url: url.to_string(),
            attempts,
            last_error,
        })
    }
}

/// Headers a desktop browser sends for a top-level navigation.
fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "Accept",
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        "Accept-Language",
        HeaderValue::from_static("zh-CN,zh;q=0.9,ja;q=0.8,en-US;q=0.7,en;q=0.6"),
    );
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));
    headers
}

/// Applies rate limiting delay.
pub async fn rate_limit(delay_sec: f64) {
    if delay_sec > 0.0 {
        tokio::time::sleep(Duration::from_secs_f64(delay_sec)).await;
    }
}
