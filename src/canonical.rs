use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::platform::{CanonicalRule, Platform};

/// Platform-normalized identity of a posting, used for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[cfg(test)]
    pub fn platform(&self) -> Platform {
        Platform::detect(&self.0)
    }

    /// Wrap a value read back from storage. Stored keys were canonical when
    /// written, so this does not re-run the rules.
    pub fn from_stored(value: String) -> Self {
        CanonicalKey(value)
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A discovered URL tagged with the platform its domain maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResult {
    pub url: String,
    pub platform: Platform,
}

impl RawResult {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let platform = Platform::detect(&url);
        Self { url, platform }
    }

    pub fn canonicalize(&self) -> CanonicalKey {
        canonicalize(&self.url)
    }
}

/// Map a raw posting URL to its canonical key.
///
/// Pure and idempotent. URLs on unregistered domains only lose their fragment;
/// URLs with fewer segments than a rule expects come back unmodified.
pub fn canonicalize(raw: &str) -> CanonicalKey {
    let url = strip_fragment(raw.trim());
    let canonical = match Platform::detect(url).rule() {
        CanonicalRule::TruncateId(len) => truncate_id(url, len),
        CanonicalRule::NumericId => numeric_id(url),
        CanonicalRule::StripQuery => strip_query(url).to_string(),
        CanonicalRule::Verbatim => url.to_string(),
    };
    CanonicalKey(canonical)
}

/// True for absolute links on a registered job platform.
pub fn is_job_platform_link(url: &str) -> bool {
    url.starts_with("http") && Platform::detect(url).is_known()
}

/// Canonicalize one page of search results, keeping only job-platform links
/// and dropping later duplicates in first-seen order.
pub fn dedup_page<I, S>(links: I) -> Vec<CanonicalKey>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut keys = Vec::new();
    for link in links {
        let link = strip_fragment(link.as_ref().trim());
        if !is_job_platform_link(link) {
            continue;
        }
        let key = canonicalize(link);
        if seen.insert(key.clone()) {
            keys.push(key);
        }
    }
    keys
}

fn strip_fragment(url: &str) -> &str {
    url.split('#').next().unwrap_or(url)
}

fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

// "https:", "", host, company, id, ...
fn truncate_id(url: &str, len: usize) -> String {
    let parts: Vec<&str> = url.split('/').collect();
    if parts.len() < 5 {
        return url.to_string();
    }
    let id: String = parts[4].chars().take(len).collect();
    format!("{}/{}", parts[..4].join("/"), id)
}

// "https:", "", host, company, "jobs", id-with-slug, ...
fn numeric_id(url: &str) -> String {
    let parts: Vec<&str> = url.split('/').collect();
    if parts.len() <= 5 {
        return url.to_string();
    }
    let digits: String = strip_query(parts[5])
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    format!("{}/{}", parts[..5].join("/"), digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEVER_ID: &str = "1f2e3d4c-5b6a-7980-a1b2-c3d4e5f6a7b8";

    fn samples() -> Vec<String> {
        vec![
            format!("https://jobs.lever.co/acme/{LEVER_ID}"),
            format!("https://jobs.lever.co/acme/{LEVER_ID}/apply?lever-source=LinkedIn"),
            "https://jobs.lever.co/acme".to_string(),
            "https://job-boards.greenhouse.io/acme/jobs/4412345006?gh_jid=4412345006".to_string(),
            "https://boards.greenhouse.io/acme/jobs/4412345006-software-engineer".to_string(),
            "https://boards.greenhouse.io/embed/job_app?for=acme&token=123".to_string(),
            "https://acme.wd5.myworkdayjobs.com/en-US/External/job/Austin-TX/Software-Engineer_R123?source=google".to_string(),
            "https://jobs.ashbyhq.com/acme/9d1c2b3a?utm_source=x".to_string(),
            "https://careers-acme.icims.com/jobs/1234/software-engineer/job?in_iframe=1".to_string(),
            "https://jobs.smartrecruiters.com/Acme/744000012345-software-engineer?trid=abc".to_string(),
            "https://careers.oracle.com/jobs/#en/sites/jobsearch/job/123".to_string(),
            "https://example.com/careers/42?ref=x#apply".to_string(),
        ]
    }

    #[test]
    fn idempotent_for_every_rule() {
        for url in samples() {
            let once = canonicalize(&url);
            let twice = canonicalize(once.as_str());
            assert_eq!(once, twice, "not idempotent for {url}");
        }
    }

    #[test]
    fn lever_extra_segment_collapses() {
        let base = format!("https://jobs.lever.co/acme/{LEVER_ID}");
        let apply = format!("https://jobs.lever.co/acme/{LEVER_ID}/apply");
        assert_eq!(canonicalize(&apply), canonicalize(&base));
        assert_eq!(canonicalize(&base).as_str(), base);
    }

    #[test]
    fn lever_id_suffix_truncated() {
        let noisy = format!("https://jobs.lever.co/acme/{LEVER_ID}?lever-origin=applied");
        assert_eq!(
            canonicalize(&noisy).as_str(),
            format!("https://jobs.lever.co/acme/{LEVER_ID}")
        );
    }

    #[test]
    fn greenhouse_keeps_digits_only() {
        let a = canonicalize("https://boards.greenhouse.io/acme/jobs/4412345006-software-engineer");
        let b = canonicalize("https://boards.greenhouse.io/acme/jobs/4412345006?gh_jid=4412345006");
        assert_eq!(a.as_str(), "https://boards.greenhouse.io/acme/jobs/4412345006");
        assert_eq!(a, b);
    }

    #[test]
    fn greenhouse_drops_trailing_segments() {
        let key = canonicalize("https://job-boards.greenhouse.io/acme/jobs/77/apply");
        assert_eq!(key.as_str(), "https://job-boards.greenhouse.io/acme/jobs/77");
    }

    #[test]
    fn query_sensitive_hosts_strip_query() {
        let key = canonicalize("https://jobs.ashbyhq.com/acme/9d1c2b3a?utm_source=x");
        assert_eq!(key.as_str(), "https://jobs.ashbyhq.com/acme/9d1c2b3a");
        let key = canonicalize("https://jobs.smartrecruiters.com/Acme/7440?trid=abc");
        assert_eq!(key.as_str(), "https://jobs.smartrecruiters.com/Acme/7440");
    }

    #[test]
    fn short_urls_are_left_alone() {
        assert_eq!(canonicalize("https://jobs.lever.co/acme").as_str(), "https://jobs.lever.co/acme");
        assert_eq!(
            canonicalize("https://boards.greenhouse.io/acme/jobs").as_str(),
            "https://boards.greenhouse.io/acme/jobs"
        );
    }

    #[test]
    fn unknown_domain_only_loses_fragment() {
        let key = canonicalize("https://example.com/careers/42?ref=x#apply");
        assert_eq!(key.as_str(), "https://example.com/careers/42?ref=x");
    }

    #[test]
    fn page_dedup_keeps_first_seen_order() {
        let links = [
            "https://jobs.ashbyhq.com/acme/2?src=a",
            "/url?q=relative",
            "https://www.google.com/search?q=x",
            "https://jobs.ashbyhq.com/acme/1",
            "https://jobs.ashbyhq.com/acme/2?src=b#top",
        ];
        let keys = dedup_page(links);
        let keys: Vec<&str> = keys.iter().map(|k| k.as_str()).collect();
        assert_eq!(
            keys,
            vec!["https://jobs.ashbyhq.com/acme/2", "https://jobs.ashbyhq.com/acme/1"]
        );
    }

    #[test]
    fn raw_result_carries_platform() {
        let raw = RawResult::new("https://jobs.lever.co/acme/x");
        assert_eq!(raw.platform, Platform::Lever);
        assert_eq!(raw.canonicalize().platform(), Platform::Lever);
    }
}
