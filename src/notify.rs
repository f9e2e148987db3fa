use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Local;
use serde_json::json;
use tracing::{info, warn};

use crate::record::JobRecord;

/// Delivers a cycle's relevant records to a human.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, accepted: &[JobRecord], ambiguous: &[JobRecord]) -> anyhow::Result<()>;
}

/// `Job Alert: N new jobs found - <time>` followed by one line per job.
pub fn summary(accepted: &[JobRecord], ambiguous: &[JobRecord], time: &str) -> String {
    let total = accepted.len() + ambiguous.len();
    let mut text = format!("Job Alert: {} new jobs found - {}", total, time);
    for job in accepted.iter().chain(ambiguous) {
        text.push_str(&format!(
            "\n{} | {} | {} | {}",
            job.company, job.title, job.location, job.url
        ));
    }
    text
}

fn now_label() -> String {
    Local::now().format("%Y-%m-%d %H:%M").to_string()
}

/// Posts `{ "text", "jobs" }` to a Slack-compatible incoming webhook.
pub struct WebhookNotifier {
    webhook_url: String,
    http: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(webhook_url: String, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create webhook client")?;
        Ok(Self { webhook_url, http })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, accepted: &[JobRecord], ambiguous: &[JobRecord]) -> anyhow::Result<()> {
        if accepted.is_empty() && ambiguous.is_empty() {
            return Ok(());
        }
        let jobs: Vec<&JobRecord> = accepted.iter().chain(ambiguous).collect();
        let payload = json!({
            "text": summary(accepted, ambiguous, &now_label()),
            "jobs": jobs,
        });

        let resp = self
            .http
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
            .context("webhook request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "webhook returned non-success");
            anyhow::bail!("webhook returned {status}");
        }
        info!(jobs = jobs.len(), "notification sent");
        Ok(())
    }
}

/// Writes the alert to the log when no webhook is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, accepted: &[JobRecord], ambiguous: &[JobRecord]) -> anyhow::Result<()> {
        if accepted.is_empty() && ambiguous.is_empty() {
            info!("no new jobs to report");
            return Ok(());
        }
        info!("{}", summary(accepted, ambiguous, &now_label()));
        Ok(())
    }
}
