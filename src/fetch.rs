use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use tracing::debug;

use crate::config::FetchSettings;
use crate::error::FetchError;

const MAX_REDIRECTS: usize = 5;

/// Retrieves documents over HTTP.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GET a posting page.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;

    /// GET a platform API endpoint. Uses the page timeout unless overridden.
    async fn fetch_api(&self, url: &str) -> Result<String, FetchError> {
        self.fetch(url).await
    }
}

pub struct HttpFetcher {
    client: reqwest::Client,
    api_timeout: Duration,
}

impl HttpFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.clone())
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_timeout: Duration::from_secs(settings.api_timeout_secs),
        })
    }

    async fn get(&self, url: &str, timeout: Option<Duration>) -> Result<String, FetchError> {
        let mut request = self.client.get(url);
        if let Some(t) = timeout {
            request = request.timeout(t);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = response.text().await?;
        debug!(url, bytes = body.len(), "fetched");
        Ok(body)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.get(url, None).await
    }

    async fn fetch_api(&self, url: &str) -> Result<String, FetchError> {
        self.get(url, Some(self.api_timeout)).await
    }
}
