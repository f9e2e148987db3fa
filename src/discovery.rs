use std::collections::HashSet;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use tracing::{info, warn};

use crate::canonical::RawResult;
use crate::error::ParseCountError;

static COUNT_UNIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)[- ]?(.+)$").unwrap());
static CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([hdwmy])(\d*)$").unwrap());

/// How many results to ask discovery for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCount {
    /// Keep paging until a short page.
    Exhaustive,
    Exact(usize),
}

impl FromStr for ResultCount {
    type Err = ParseCountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "max" | "exhaustive" | "all" => Ok(ResultCount::Exhaustive),
            n => match n.parse::<usize>() {
                Ok(n) if n > 0 => Ok(ResultCount::Exact(n)),
                _ => Err(ParseCountError(s.to_string())),
            },
        }
    }
}

/// Recency filter code understood by the search engine: `h`, `d3`, `w2`, ...
///
/// Accepts `3-hours`, `3 hours`, `3h`, `day`, `d` and friends. Unrecognized
/// input is passed through unchanged.
pub fn recency_code(input: &str) -> String {
    let input = input.trim().to_lowercase();

    if let Some(caps) = COUNT_UNIT_RE.captures(&input) {
        if let (Ok(count), Some(unit)) = (caps[1].parse::<u64>(), unit_code(caps[2].trim())) {
            return if count <= 1 {
                unit.to_string()
            } else {
                format!("{unit}{count}")
            };
        }
    }
    if CODE_RE.is_match(&input) {
        return input;
    }
    match unit_code(&input) {
        Some(unit) => unit.to_string(),
        None => input,
    }
}

fn unit_code(unit: &str) -> Option<&'static str> {
    match unit {
        "hour" | "hours" | "h" => Some("h"),
        "day" | "days" | "d" => Some("d"),
        "week" | "weeks" | "w" => Some("w"),
        "month" | "months" | "m" => Some("m"),
        "year" | "years" | "y" => Some("y"),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub count: ResultCount,
    pub recency: String,
}

/// One page of search results.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Posting links on the page at offset `start`, already reduced by
    /// [`crate::canonical::dedup_page`].
    async fn search(
        &self,
        query: &str,
        page_size: usize,
        recency_code: &str,
        start: usize,
    ) -> Result<Vec<String>>;
}

/// Produces candidate posting URLs for a cycle.
#[async_trait]
pub trait Discovery: Send + Sync {
    async fn discover(&self, request: &SearchRequest) -> Result<Vec<RawResult>>;
}

/// Pages through a [`SearchEngine`] with a politeness delay between pages.
pub struct Paginator<E> {
    engine: E,
    page_size: usize,
    /// Cap for [`ResultCount::Exhaustive`].
    max_pages: usize,
    page_delay: Duration,
}

impl<E: SearchEngine> Paginator<E> {
    pub fn new(engine: E, page_size: usize, max_pages: usize, page_delay: Duration) -> Self {
        Self {
            engine,
            page_size: page_size.max(1),
            max_pages: max_pages.max(1),
            page_delay,
        }
    }

    async fn page(
        &self,
        request: &SearchRequest,
        n: usize,
        ask: usize,
        start: usize,
    ) -> Result<Vec<String>> {
        if n > 0 && !self.page_delay.is_zero() {
            tokio::time::sleep(self.page_delay).await;
        }
        let links = self
            .engine
            .search(&request.query, ask, &request.recency, start)
            .await?;
        info!(page = n + 1, results = links.len(), "search page");
        Ok(links)
    }
}

#[async_trait]
impl<E: SearchEngine> Discovery for Paginator<E> {
    async fn discover(&self, request: &SearchRequest) -> Result<Vec<RawResult>> {
        let mut pages: Vec<Vec<String>> = Vec::new();
        match request.count {
            ResultCount::Exhaustive => loop {
                let n = pages.len();
                let links = self.page(request, n, self.page_size, n * self.page_size).await?;
                let short = links.len() < self.page_size;
                pages.push(links);
                if short {
                    break;
                }
                if pages.len() >= self.max_pages {
                    warn!(max_pages = self.max_pages, "page limit reached before results ran out");
                    break;
                }
            },
            ResultCount::Exact(total) => {
                let mut remaining = total;
                for n in 0..total.div_ceil(self.page_size) {
                    let ask = remaining.min(self.page_size);
                    let links = self.page(request, n, ask, n * self.page_size).await?;
                    let short = links.len() < ask;
                    pages.push(links);
                    remaining -= ask;
                    if short {
                        break;
                    }
                }
            }
        }

        let total: usize = pages.iter().map(Vec::len).sum();
        let mut seen = HashSet::new();
        let results: Vec<RawResult> = pages
            .into_iter()
            .flatten()
            .filter(|url| seen.insert(url.clone()))
            .map(RawResult::new)
            .collect();
        info!(total, unique = results.len(), "discovery finished");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serves `total` synthetic links, recording every request.
    struct FakeEngine {
        total: usize,
        calls: Mutex<Vec<(usize, usize)>>,
    }

    impl FakeEngine {
        fn new(total: usize) -> Self {
            Self {
                total,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SearchEngine for FakeEngine {
        async fn search(&self, _: &str, page_size: usize, _: &str, start: usize) -> Result<Vec<String>> {
            self.calls.lock().unwrap().push((page_size, start));
            let end = (start + page_size).min(self.total);
            Ok((start..end)
                .map(|i| format!("https://jobs.lever.co/acme/{}", i % 7))
                .collect())
        }
    }

    fn request(count: ResultCount) -> SearchRequest {
        SearchRequest {
            query: "q".into(),
            count,
            recency: "h".into(),
        }
    }

    #[test]
    fn parses_result_counts() {
        assert_eq!("max".parse::<ResultCount>().unwrap(), ResultCount::Exhaustive);
        assert_eq!(" ALL ".parse::<ResultCount>().unwrap(), ResultCount::Exhaustive);
        assert_eq!("250".parse::<ResultCount>().unwrap(), ResultCount::Exact(250));
        assert!("0".parse::<ResultCount>().is_err());
        assert!("-3".parse::<ResultCount>().is_err());
        assert!("lots".parse::<ResultCount>().is_err());
    }

    #[test]
    fn recency_codes() {
        assert_eq!(recency_code("3-hours"), "h3");
        assert_eq!(recency_code("3 hours"), "h3");
        assert_eq!(recency_code("3h"), "h3");
        assert_eq!(recency_code("1 day"), "d");
        assert_eq!(recency_code("day"), "d");
        assert_eq!(recency_code("d"), "d");
        assert_eq!(recency_code("w2"), "w2");
        assert_eq!(recency_code("2 Weeks"), "w2");
        assert_eq!(recency_code("fortnight"), "fortnight");
    }

    #[tokio::test]
    async fn exact_count_asks_for_remaining() {
        let p = Paginator::new(FakeEngine::new(1000), 100, 10, Duration::ZERO);
        p.discover(&request(ResultCount::Exact(250))).await.unwrap();
        let calls = p.engine.calls.lock().unwrap().clone();
        assert_eq!(calls, vec![(100, 0), (100, 100), (50, 200)]);
    }

    #[tokio::test]
    async fn exact_count_stops_on_short_page() {
        let p = Paginator::new(FakeEngine::new(130), 100, 10, Duration::ZERO);
        p.discover(&request(ResultCount::Exact(500))).await.unwrap();
        assert_eq!(p.engine.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn exhaustive_pages_until_short() {
        let p = Paginator::new(FakeEngine::new(200), 100, 10, Duration::ZERO);
        p.discover(&request(ResultCount::Exhaustive)).await.unwrap();
        let calls = p.engine.calls.lock().unwrap().clone();
        assert_eq!(calls, vec![(100, 0), (100, 100), (100, 200)]);
    }

    #[tokio::test]
    async fn exhaustive_stops_at_page_limit() {
        let p = Paginator::new(FakeEngine::new(usize::MAX), 100, 3, Duration::ZERO);
        let results = p.discover(&request(ResultCount::Exhaustive)).await.unwrap();
        let calls = p.engine.calls.lock().unwrap().clone();
        assert_eq!(calls, vec![(100, 0), (100, 100), (100, 200)]);
        assert_eq!(results.len(), 7);
    }

    #[tokio::test]
    async fn cross_page_duplicates_removed_first_seen() {
        let p = Paginator::new(FakeEngine::new(20), 10, 10, Duration::ZERO);
        let results = p.discover(&request(ResultCount::Exact(20))).await.unwrap();
        let urls: Vec<&str> = results.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls.len(), 7);
        assert_eq!(urls[0], "https://jobs.lever.co/acme/0");
        assert_eq!(urls[6], "https://jobs.lever.co/acme/6");
    }
}
