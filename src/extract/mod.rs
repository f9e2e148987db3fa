pub mod ashby;
pub mod fields;
pub mod generic;
pub mod greenhouse;
pub mod icims;
pub mod lever;
pub mod oracle;
pub mod workday;

use std::sync::Arc;

use scraper::Html;
use tracing::{debug, warn};

use crate::canonical::CanonicalKey;
use crate::config::FetchSettings;
use crate::fetch::Fetcher;
use crate::platform::Platform;
use crate::record::JobRecord;
use fields::{run_chain, Fields, Page, Strategy};

/// Ordered strategy chain for each platform.
pub fn chain(platform: Platform) -> &'static [Strategy] {
    match platform {
        Platform::Greenhouse => greenhouse::CHAIN,
        Platform::Lever => lever::CHAIN,
        Platform::Workday => workday::CHAIN,
        Platform::Ashby => ashby::CHAIN,
        Platform::Icims => icims::CHAIN,
        Platform::Oracle => oracle::CHAIN,
        Platform::SmartRecruiters => generic::SMARTRECRUITERS,
        Platform::Unknown => generic::UNKNOWN,
    }
}

/// Structured fields of one posting document. Never fails: whatever the
/// document does not yield stays unknown.
pub fn extract(platform: Platform, html: &str, url: &CanonicalKey) -> JobRecord {
    let document = Html::parse_document(html);
    run_chain(&Page::new(&document, url.as_str()), chain(platform)).into_record(url.clone())
}

/// Fetches posting pages and turns them into records.
pub struct Extractor {
    fetcher: Arc<dyn Fetcher>,
    description_limit: usize,
    ashby_api_base: String,
}

impl Extractor {
    pub fn new(fetcher: Arc<dyn Fetcher>, settings: &FetchSettings) -> Self {
        Self {
            fetcher,
            description_limit: settings.description_limit,
            ashby_api_base: settings.ashby_api_base.clone(),
        }
    }

    /// `None` when the posting page could not be fetched. `platform` is the
    /// tag discovery attached to the URL.
    pub async fn extract_url(&self, key: &CanonicalKey, platform: Platform) -> Option<JobRecord> {
        let body = match self.fetcher.fetch(key.as_str()).await {
            Ok(body) => body,
            Err(e) => {
                warn!(url = %key, %platform, error = %e, "fetch failed");
                return None;
            }
        };

        let mut record = extract(platform, &body, key);
        if platform == Platform::Ashby {
            if let Some(api) = self.ashby_lookup(key).await {
                api.apply(&mut record);
            }
        }
        Some(record)
    }

    async fn ashby_lookup(&self, key: &CanonicalKey) -> Option<Fields> {
        let (endpoint, job_id) = ashby::lookup_target(&self.ashby_api_base, key.as_str())?;
        match self.fetcher.fetch_api(&endpoint).await {
            Ok(body) => {
                let found = ashby::parse_board(&body, &job_id, self.description_limit);
                if found.is_none() {
                    debug!(url = %key, job_id = %job_id, "posting not on job board");
                }
                found
            }
            Err(e) => {
                debug!(url = %key, error = %e, "job board lookup failed");
                None
            }
        }
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::canonicalize;
    use crate::error::FetchError;
    use crate::record::UNKNOWN;
    use async_trait::async_trait;
    use std::collections::HashMap;

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    fn parse(name: &str, url: &str) -> JobRecord {
        let key = canonicalize(url);
        extract(key.platform(), &fixture(name), &key)
    }

    #[test]
    fn greenhouse_current_template() {
        let r = parse("greenhouse", "https://job-boards.greenhouse.io/acmerobotics/jobs/4412345006");
        assert_eq!(r.title, "Backend Software Engineer");
        assert_eq!(r.location, "Austin, TX");
        assert_eq!(r.company, "Acme Robotics");
        assert!(r.description.starts_with("We are hiring a backend engineer"));
    }

    #[test]
    fn greenhouse_legacy_template() {
        let r = parse("greenhouse_legacy", "https://boards.greenhouse.io/widgetco/jobs/99887766");
        assert_eq!(r.company, "WidgetCo");
        assert_eq!(r.title, "Full Stack Engineer");
        assert_eq!(r.location, "Remote - US");
        assert!(r.description.contains("React and Node"));
    }

    #[test]
    fn greenhouse_slug_when_page_is_empty() {
        let key = canonicalize("https://job-boards.greenhouse.io/blue-sky-labs/jobs/1234");
        let r = extract(Platform::Greenhouse, "<html></html>", &key);
        assert_eq!(r.company, "Blue Sky Labs");
        assert_eq!(r.title, UNKNOWN);
        assert_eq!(r.location, UNKNOWN);
    }

    #[test]
    fn greenhouse_current_page_ignores_legacy_blocks() {
        let key = canonicalize("https://job-boards.greenhouse.io/acme/jobs/555");
        let html = r#"<html><body>
            <div class="job__title"><h1>Backend Engineer</h1></div>
            <div class="location">Office footer, Berlin</div>
            <div id="content">Site navigation and cookie banner</div>
            </body></html>"#;
        let r = extract(Platform::Greenhouse, html, &key);
        assert_eq!(r.title, "Backend Engineer");
        assert_eq!(r.location, UNKNOWN);
        assert_eq!(r.description, UNKNOWN);
        assert_eq!(r.company, "Acme");
    }

    #[test]
    fn lever_posting() {
        let r = parse("lever", "https://jobs.lever.co/northwind/1f2e3d4c-5b6a-7980-a1b2-c3d4e5f6a7b8");
        assert_eq!(r.company, "Northwind");
        assert_eq!(r.title, "Platform Engineer");
        assert_eq!(r.location, "New York, NY");
        assert!(r.description.contains("Kubernetes"));
    }

    #[test]
    fn workday_from_url_only() {
        let key = canonicalize(
            "https://acme-corp.wd5.myworkdayjobs.com/en-US/External/job/Austin---TX/Software-Engineer--Backend_R-1234?source=x",
        );
        let r = extract(Platform::Workday, "<html><body></body></html>", &key);
        assert_eq!(r.company, "Acme Corp");
        assert_eq!(r.location, "Austin, TX");
        assert_eq!(r.title, "Software Engineer - Backend");
        assert_eq!(r.description, UNKNOWN);
    }

    #[test]
    fn icims_url_and_title() {
        let r = parse("icims", "https://careers-globex.icims.com/jobs/5521/software-developer%20ii/job");
        assert_eq!(r.company, "Globex");
        assert_eq!(r.title, "Software Developer Ii");
        assert_eq!(r.description, "Software Developer II in Chicago, IL | Careers at Globex");
        assert_eq!(r.location, UNKNOWN);
    }

    #[test]
    fn oracle_open_graph() {
        let r = parse("oracle", "https://careers.oracle.com/jobs/#en/sites/jobsearch/job/123");
        assert_eq!(r.company, "Oracle");
        assert_eq!(r.title, "Senior Cloud Developer");
        assert!(r.description.starts_with("Design and build OCI services"));
    }

    #[test]
    fn smartrecruiters_generic() {
        let r = parse("smartrecruiters", "https://jobs.smartrecruiters.com/Initech/744000012345-devops-engineer");
        assert_eq!(r.company, "Initech");
        assert_eq!(r.title, "DevOps Engineer");
        assert_eq!(r.description, "Initech is looking for a DevOps Engineer to run our CI/CD.");
    }

    #[test]
    fn unknown_platform_uses_title_suffix() {
        let key = canonicalize("https://example.com/careers/42");
        let html = "<html><head><title>Backend Developer at Hooli</title></head></html>";
        let r = extract(Platform::Unknown, html, &key);
        assert_eq!(r.title, "Backend Developer at Hooli");
        assert_eq!(r.company, "Hooli");
    }

    struct StaticFetcher {
        pages: HashMap<String, String>,
    }

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.pages.get(url).cloned().ok_or_else(|| FetchError::Status {
                status: 404,
                url: url.to_string(),
            })
        }
    }

    fn extractor(pages: &[(&str, &str)]) -> Extractor {
        let fetcher = StaticFetcher {
            pages: pages.iter().map(|(u, b)| (u.to_string(), b.to_string())).collect(),
        };
        Extractor {
            fetcher: Arc::new(fetcher),
            description_limit: 2000,
            ashby_api_base: "https://api.ashbyhq.com".to_string(),
        }
    }

    #[tokio::test]
    async fn ashby_api_supersedes_page() {
        let page = "<html><head><meta property=\"og:title\" content=\"Page Title\"></head></html>";
        let board = r#"{"jobs":[{"id":"abc","title":"Backend Engineer","location":"Remote","descriptionPlain":"Rust"}]}"#;
        let ex = extractor(&[
            ("https://jobs.ashbyhq.com/zeta-ai/abc", page),
            ("https://api.ashbyhq.com/posting-api/job-board/zeta-ai", board),
        ]);
        let key = canonicalize("https://jobs.ashbyhq.com/zeta-ai/abc?utm_source=x");
        let r = ex.extract_url(&key, key.platform()).await.unwrap();
        assert_eq!(r.company, "Zeta Ai");
        assert_eq!(r.title, "Backend Engineer");
        assert_eq!(r.location, "Remote");
        assert_eq!(r.description, "Rust");
    }

    #[tokio::test]
    async fn ashby_api_failure_keeps_page_fields() {
        let page = "<html><head><meta property=\"og:title\" content=\"Page Title\"></head></html>";
        let ex = extractor(&[("https://jobs.ashbyhq.com/zeta-ai/abc", page)]);
        let key = canonicalize("https://jobs.ashbyhq.com/zeta-ai/abc");
        let r = ex.extract_url(&key, key.platform()).await.unwrap();
        assert_eq!(r.title, "Page Title");
        assert_eq!(r.location, UNKNOWN);
    }

    #[tokio::test]
    async fn extract_url_dispatches_on_discovered_platform() {
        let page = r#"<html><body><div class="job__title"><h1>Platform Engineer</h1></div>
            <div class="job__location">Denver, CO</div></body></html>"#;
        let ex = extractor(&[("https://careers.example.com/jobs/42", page)]);
        let key = canonicalize("https://careers.example.com/jobs/42");
        assert_eq!(key.platform(), Platform::Unknown);
        let r = ex.extract_url(&key, Platform::Greenhouse).await.unwrap();
        assert_eq!(r.title, "Platform Engineer");
        assert_eq!(r.location, "Denver, CO");
    }

    #[tokio::test]
    async fn fetch_failure_yields_none() {
        let ex = extractor(&[]);
        let key = canonicalize("https://jobs.lever.co/acme/1");
        assert!(ex.extract_url(&key, key.platform()).await.is_none());
    }
}
