mod canonical;
mod classify;
mod config;
mod corpus;
mod cycle;
mod discovery;
mod error;
mod extract;
mod fetch;
mod notify;
mod platform;
mod record;
mod search;
mod store;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use tracing::{error, info};

use crate::classify::Classifier;
use crate::config::Settings;
use crate::corpus::{CorpusStore, Partition};
use crate::cycle::{CycleReport, CycleRequest, Pipeline};
use crate::discovery::{Paginator, ResultCount};
use crate::extract::Extractor;
use crate::fetch::HttpFetcher;
use crate::notify::{LogNotifier, Notifier, WebhookNotifier};
use crate::record::JobRecord;
use crate::search::SpiderSearch;
use crate::store::SqliteStore;

#[derive(Parser)]
#[command(name = "job_watch", about = "Job posting watcher: search, extract, classify, dedup")]
struct Cli {
    /// Config file (default: ./jobwatch.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct CycleArgs {
    /// Number of search results, or "max" to page until exhausted
    #[arg(short = 'n', long)]
    results: Option<String>,
    /// Recency window (e.g. "h", "3 hours", "d", "w2")
    #[arg(short, long)]
    period: Option<String>,
    /// Role profiles: "all" or a comma list (fullstack,backend,devops)
    #[arg(short, long)]
    roles: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one discovery/extraction/classification cycle
    Run {
        #[command(flatten)]
        args: CycleArgs,
    },
    /// Run cycles on a fixed interval until interrupted
    Watch {
        /// Minutes between cycles (default from config)
        #[arg(short, long)]
        interval: Option<u64>,
        #[command(flatten)]
        args: CycleArgs,
    },
    /// List stored postings
    Show {
        /// Partition to list
        #[arg(value_enum, default_value = "new")]
        partition: Partition,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Show corpus statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Run { args } => {
            let request = cycle_request(&settings, &args)?;
            let pipeline = build_pipeline(&settings)?;
            let report = pipeline.run_cycle(&request).await?;
            print_report(&report);
            Ok(())
        }
        Commands::Watch { interval, args } => {
            let request = cycle_request(&settings, &args)?;
            let pipeline = build_pipeline(&settings)?;
            let minutes = interval.unwrap_or(settings.schedule.interval_minutes).max(1);
            let pause = Duration::from_secs(minutes * 60);
            info!(minutes, "watching; Ctrl-C to stop");

            loop {
                let t_cycle = Instant::now();
                match pipeline.run_cycle(&request).await {
                    Ok(report) => {
                        print_report(&report);
                        println!("Cycle took {}", format_duration(t_cycle.elapsed()));
                    }
                    Err(e) => error!(error = %e, "cycle failed"),
                }
                info!(minutes, "sleeping until next cycle");
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        info!("interrupted, stopping");
                        break;
                    }
                    _ = tokio::time::sleep(pause) => {}
                }
            }
            Ok(())
        }
        Commands::Show { partition, limit } => {
            let store = SqliteStore::new(settings.storage.path.clone());
            let snapshot = store.load()?;
            let rows = snapshot.partition(partition);
            if rows.is_empty() {
                println!("No {} postings in {}.", partition, store.path().display());
                return Ok(());
            }
            print_table(&rows[..rows.len().min(limit)]);
            println!("\n{} of {} {} postings", rows.len().min(limit), rows.len(), partition);
            Ok(())
        }
        Commands::Stats => {
            let store = SqliteStore::new(settings.storage.path.clone());
            let s = store.stats()?;
            println!("Database: {}", store.path().display());
            println!("New:      {}", s.new);
            println!("Previous: {}", s.previous);
            println!("Rejected: {}", s.rejected);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn cycle_request(settings: &Settings, args: &CycleArgs) -> anyhow::Result<CycleRequest> {
    let results = args
        .results
        .as_deref()
        .unwrap_or(&settings.search.default_results);
    Ok(CycleRequest {
        count: results.parse::<ResultCount>()?,
        recency: args
            .period
            .clone()
            .unwrap_or_else(|| settings.search.default_period.clone()),
        roles: args
            .roles
            .clone()
            .unwrap_or_else(|| settings.search.default_roles.clone()),
    })
}

// Headroom over the webhook client's own request timeout.
const NOTIFY_GRACE: Duration = Duration::from_secs(5);

fn build_pipeline(settings: &Settings) -> anyhow::Result<Pipeline> {
    let discovery = Paginator::new(
        SpiderSearch::from_env()?,
        settings.search.page_size,
        settings.search.max_pages,
        settings.search.page_delay(),
    );
    let fetcher = HttpFetcher::new(&settings.fetch)?;
    let notifier: Box<dyn Notifier> = match &settings.notify.webhook_url {
        Some(url) => Box::new(WebhookNotifier::new(url.clone(), settings.notify.timeout())?),
        None => Box::new(LogNotifier),
    };

    Ok(Pipeline::new(
        settings.search.query.clone(),
        Box::new(discovery),
        Extractor::new(Arc::new(fetcher), &settings.fetch),
        Classifier::new(&settings.classifier),
        Box::new(SqliteStore::new(settings.storage.path.clone())),
        notifier,
        settings.fetch.concurrency,
    )
    .with_notify_timeout(settings.notify.timeout() + NOTIFY_GRACE))
}

fn print_report(report: &CycleReport) {
    println!(
        "Discovered {} postings ({} already seen); fetched {} ({} failed).",
        report.discovered, report.seen, report.fetched, report.failed
    );
    println!(
        "Accepted {}, ambiguous {}, rejected {}.",
        report.accepted, report.ambiguous, report.rejected
    );
    if report.new_jobs.is_empty() {
        println!("No new jobs this cycle.");
        return;
    }
    println!();
    print_table(&report.new_jobs);
}

fn print_table(rows: &[JobRecord]) {
    println!(
        "{:>3} | {:<22} | {:<36} | {:<20} | {:<16} | {}",
        "#", "Company", "Title", "Location", "Found", "URL"
    );
    println!("{}", "-".repeat(130));

    for (i, r) in rows.iter().enumerate() {
        println!(
            "{:>3} | {:<22} | {:<36} | {:<20} | {:<16} | {}",
            i + 1,
            truncate(&r.company, 22),
            truncate(&r.title, 36),
            truncate(&r.location, 20),
            r.found_at_display(),
            r.url
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
