use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime, Timelike};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::canonical::CanonicalKey;
use crate::classify::{Classifier, Verdict};
use crate::corpus::{Corpus, CorpusStore};
use crate::discovery::{recency_code, Discovery, ResultCount, SearchRequest};
use crate::error::CycleError;
use crate::extract::Extractor;
use crate::notify::Notifier;
use crate::platform::Platform;
use crate::record::JobRecord;

const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(30);

/// Parameters of one cycle.
#[derive(Debug, Clone)]
pub struct CycleRequest {
    pub count: ResultCount,
    /// Recency filter, either a code (`h`, `d3`) or a phrase (`3 hours`).
    pub recency: String,
    /// `all` or comma-separated profile names.
    pub roles: String,
}

#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub discovered: usize,
    pub seen: usize,
    pub fetched: usize,
    pub failed: usize,
    pub accepted: usize,
    pub ambiguous: usize,
    pub rejected: usize,
    /// Records installed as the new partition.
    pub new_jobs: Vec<JobRecord>,
}

/// Discovery, extraction, classification and persistence for one cycle.
pub struct Pipeline {
    query: String,
    discovery: Box<dyn Discovery>,
    extractor: Arc<Extractor>,
    classifier: Classifier,
    store: Box<dyn CorpusStore>,
    notifier: Box<dyn Notifier>,
    notify_timeout: Duration,
    concurrency: usize,
}

impl Pipeline {
    pub fn new(
        query: String,
        discovery: Box<dyn Discovery>,
        extractor: Extractor,
        classifier: Classifier,
        store: Box<dyn CorpusStore>,
        notifier: Box<dyn Notifier>,
        concurrency: usize,
    ) -> Self {
        Self {
            query,
            discovery,
            extractor: Arc::new(extractor),
            classifier,
            store,
            notifier,
            notify_timeout: DEFAULT_NOTIFY_TIMEOUT,
            concurrency: concurrency.max(1),
        }
    }

    /// Upper bound on how long a cycle waits for its notification.
    pub fn with_notify_timeout(mut self, timeout: Duration) -> Self {
        self.notify_timeout = timeout;
        self
    }

    pub async fn run_cycle(&self, request: &CycleRequest) -> Result<CycleReport, CycleError> {
        let mut report = CycleReport::default();

        // 1. roles
        let roles = self.classifier.select_roles(&request.roles);
        for name in &roles.unknown {
            warn!(role = %name, "unsupported role profile, ignoring");
        }
        if roles.keywords.is_empty() {
            warn!("no role keywords selected, every posting will be rejected");
        }

        // 2. discovery
        let search = SearchRequest {
            query: self.query.clone(),
            count: request.count,
            recency: recency_code(&request.recency),
        };
        info!(recency = %search.recency, count = ?search.count, "starting discovery");
        let raw = self
            .discovery
            .discover(&search)
            .await
            .map_err(CycleError::Discovery)?;

        // 3. canonicalize and drop what earlier cycles reported
        let corpus = Corpus::load(self.store.as_ref());
        let seen = corpus.seen_keys();
        let mut unique = HashSet::new();
        let candidates: Vec<(CanonicalKey, Platform)> = raw
            .iter()
            .map(|r| (r.canonicalize(), r.platform))
            .filter(|(k, _)| unique.insert(k.clone()))
            .collect();
        report.discovered = candidates.len();
        let unseen: Vec<(CanonicalKey, Platform)> = candidates
            .into_iter()
            .filter(|(k, _)| !seen.contains(k))
            .collect();
        report.seen = report.discovered - unseen.len();
        info!(
            discovered = report.discovered,
            seen = report.seen,
            new = unseen.len(),
            "filtered already-seen postings"
        );

        // 4. fetch + extract
        let records = self.fetch_all(unseen).await;
        report.fetched = records.iter().filter(|r| r.is_some()).count();
        report.failed = records.len() - report.fetched;
        let records: Vec<JobRecord> = records.into_iter().flatten().collect();

        // 5. classify
        let verdicts: Vec<Verdict> = records
            .par_iter()
            .map(|r| self.classifier.classify(r, &roles.keywords))
            .collect();

        let mut accepted = Vec::new();
        let mut ambiguous = Vec::new();
        let mut rejected = Vec::new();
        for (record, verdict) in records.into_iter().zip(verdicts) {
            match verdict {
                Verdict::Accept => accepted.push(record),
                Verdict::AmbiguousAccept => ambiguous.push(record),
                Verdict::Reject(reason) => {
                    debug!(url = %record.url, %reason, "rejected");
                    rejected.push(record);
                }
            }
        }

        // 6. order by company
        for bucket in [&mut accepted, &mut ambiguous, &mut rejected] {
            bucket.sort_by(|a, b| a.company.cmp(&b.company));
        }
        report.accepted = accepted.len();
        report.ambiguous = ambiguous.len();
        report.rejected = rejected.len();
        info!(
            accepted = report.accepted,
            ambiguous = report.ambiguous,
            rejected = report.rejected,
            "classified postings"
        );

        // 7. persist
        let saved = corpus
            .commit(self.store.as_ref(), accepted, ambiguous, rejected, stamp())
            .map_err(CycleError::Persist)?;

        // 8. notify
        let (with_title, without_title): (Vec<JobRecord>, Vec<JobRecord>) =
            saved.new.iter().cloned().partition(|r| r.has_title());
        match tokio::time::timeout(
            self.notify_timeout,
            self.notifier.notify(&with_title, &without_title),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %format!("{e:#}"), "notification failed"),
            Err(_) => warn!(
                timeout_secs = self.notify_timeout.as_secs_f64(),
                "notification failed: timed out"
            ),
        }

        report.new_jobs = saved.new;
        Ok(report)
    }

    /// Fetch and extract every key with bounded concurrency. The result is in
    /// input order; `None` marks a posting that could not be fetched.
    async fn fetch_all(&self, keys: Vec<(CanonicalKey, Platform)>) -> Vec<Option<JobRecord>> {
        if keys.is_empty() {
            return Vec::new();
        }
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let pb = progress_bar(keys.len());

        let mut handles = Vec::with_capacity(keys.len());
        for (key, platform) in keys {
            let extractor = Arc::clone(&self.extractor);
            let sem = Arc::clone(&semaphore);
            let pb = pb.clone();
            handles.push(tokio::spawn(async move {
                let _permit = sem.acquire_owned().await.ok()?;
                let record = extractor.extract_url(&key, platform).await;
                pb.inc(1);
                record
            }));
        }

        let mut records = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(error = %e, "fetch task failed");
                    records.push(None);
                }
            }
        }
        pb.finish_and_clear();
        records
    }
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
    {
        pb.set_style(style.progress_chars("=> "));
    }
    pb
}

// Stored at minute precision, so stamp at minute precision.
fn stamp() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now)
}
