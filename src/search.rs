use std::sync::LazyLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::{Html, Selector};
use spider_client::shapes::request::{ReturnFormat, ReturnFormatHandling};
use spider_client::{RequestParams, Spider};
use tracing::{debug, warn};
use url::Url;

use crate::canonical::dedup_page;
use crate::discovery::SearchEngine;

const SEARCH_URL: &str = "https://www.google.com/search";
const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 2000;

static RESULTS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div#search").unwrap());
static ANCHORS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Google results pages rendered through the spider.cloud browser API.
pub struct SpiderSearch {
    spider: Spider,
}

impl SpiderSearch {
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("SPIDER_API_KEY")
            .context("SPIDER_API_KEY environment variable must be set")?;
        let spider = Spider::new(Some(api_key))
            .map_err(|e| anyhow::anyhow!("Failed to create Spider client: {}", e))?;
        Ok(Self { spider })
    }

    async fn render_with_retry(&self, url: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.render(url).await {
                Ok(html) => return Ok(html),
                Err(e) if attempt < MAX_RETRIES && is_retryable(&e.to_string()) => {
                    let backoff = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt));
                    warn!(
                        "Search rate limited (attempt {}/{}), backing off {:.1}s",
                        attempt + 1,
                        MAX_RETRIES,
                        backoff.as_secs_f64()
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn render(&self, url: &str) -> Result<String> {
        let params = RequestParams {
            return_format: Some(ReturnFormatHandling::Single(ReturnFormat::Raw)),
            ..Default::default()
        };

        let start = Instant::now();
        let response = self
            .spider
            .scrape_url(url, Some(params), "application/json")
            .await
            .map_err(|e| anyhow::anyhow!("Spider scrape failed: {}", e))?;
        debug!(elapsed_ms = start.elapsed().as_millis() as u64, "search page rendered");

        let parsed: serde_json::Value = match response.as_str() {
            Some(s) => serde_json::from_str(s).unwrap_or(response.clone()),
            None => response,
        };
        let first = parsed.as_array().and_then(|arr| arr.first());

        if let Some(status) = first.and_then(|obj| obj.get("status")).and_then(|s| s.as_i64()) {
            if !(200..300).contains(&status) {
                anyhow::bail!("search page returned HTTP {}", status);
            }
        }

        first
            .and_then(|obj| obj.get("content"))
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("No content in spider response"))
    }
}

#[async_trait]
impl SearchEngine for SpiderSearch {
    async fn search(
        &self,
        query: &str,
        page_size: usize,
        recency_code: &str,
        start: usize,
    ) -> Result<Vec<String>> {
        let url = search_url(query, page_size, recency_code, start)?;
        let html = self.render_with_retry(url.as_str()).await?;
        Ok(harvest_links(&html))
    }
}

fn is_retryable(error: &str) -> bool {
    ["429", "rate", "500", "502", "503"]
        .iter()
        .any(|code| error.contains(code))
}

pub fn search_url(query: &str, page_size: usize, recency_code: &str, start: usize) -> Result<Url> {
    let url = Url::parse_with_params(
        SEARCH_URL,
        &[
            ("q", query.to_string()),
            ("num", page_size.to_string()),
            ("start", start.to_string()),
            ("tbs", format!("qdr:{}", recency_code)),
            ("hl", "en".to_string()),
        ],
    )?;
    Ok(url)
}

/// Job-platform links in the results container (whole page when absent),
/// canonicalized and deduplicated in page order.
pub fn harvest_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let hrefs: Vec<String> = match document.select(&RESULTS).next() {
        Some(results) => results
            .select(&ANCHORS)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(unwrap_redirect)
            .collect(),
        None => document
            .select(&ANCHORS)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(unwrap_redirect)
            .collect(),
    };
    dedup_page(hrefs)
        .into_iter()
        .map(|key| key.as_str().to_string())
        .collect()
}

// Result links are sometimes wrapped as `/url?q=<target>&sa=...`.
fn unwrap_redirect(href: &str) -> Option<String> {
    if href.starts_with("/url?") {
        let wrapped = Url::parse("https://www.google.com").ok()?.join(href).ok()?;
        return wrapped
            .query_pairs()
            .find(|(k, _)| k == "q" || k == "url")
            .map(|(_, v)| v.into_owned());
    }
    Some(href.to_string())
}
