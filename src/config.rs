use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use ::config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

const DEFAULTS: &str = include_str!("defaults.toml");
const DEFAULT_CONFIG_FILE: &str = "jobwatch.toml";
const ENV_PREFIX: &str = "JOBWATCH";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub storage: StorageSettings,
    pub search: SearchSettings,
    pub fetch: FetchSettings,
    pub schedule: ScheduleSettings,
    #[serde(default)]
    pub notify: NotifySettings,
    pub classifier: ClassifierSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    pub query: String,
    pub page_size: usize,
    /// Upper bound on pages fetched when paging until exhausted.
    pub max_pages: usize,
    pub page_delay_ms: u64,
    pub default_results: String,
    pub default_period: String,
    pub default_roles: String,
}

impl SearchSettings {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchSettings {
    pub timeout_secs: u64,
    pub api_timeout_secs: u64,
    pub concurrency: usize,
    pub description_limit: usize,
    pub ashby_api_base: String,
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleSettings {
    pub interval_minutes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifySettings {
    pub webhook_url: Option<String>,
    #[serde(default = "default_notify_timeout")]
    pub timeout_secs: u64,
}

fn default_notify_timeout() -> u64 {
    10
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: default_notify_timeout(),
        }
    }
}

impl NotifySettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Keyword, exclusion and gazetteer tables. Plain data so the classifier can
/// be built from any source.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierSettings {
    pub profiles: BTreeMap<String, Vec<String>>,
    pub exclusions: ExclusionSettings,
    pub gazetteer: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExclusionSettings {
    #[serde(default)]
    pub title: Vec<String>,
    #[serde(default)]
    pub description: Vec<String>,
}

impl Settings {
    /// Layer built-in defaults, an optional TOML file and `JOBWATCH__*`
    /// environment variables, in that order.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => File::from(p.to_path_buf()).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        let settings: Settings = Config::builder()
            .add_source(File::from_str(DEFAULTS, FileFormat::Toml))
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Built-in defaults only.
    #[cfg(test)]
    pub fn defaults() -> Result<Self> {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(DEFAULTS, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.search.page_size > 0, "search.page_size must be > 0");
        anyhow::ensure!(self.search.max_pages > 0, "search.max_pages must be > 0");
        anyhow::ensure!(self.notify.timeout_secs > 0, "notify.timeout_secs must be > 0");
        anyhow::ensure!(self.fetch.concurrency > 0, "fetch.concurrency must be > 0");
        anyhow::ensure!(
            !self.classifier.profiles.is_empty(),
            "classifier.profiles must define at least one role profile"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_parse() {
        let s = Settings::defaults().unwrap();
        assert_eq!(s.search.page_size, 100);
        assert_eq!(s.search.default_roles, "all");
        assert_eq!(s.fetch.description_limit, 2000);
        assert!(s.notify.webhook_url.is_none());
        assert_eq!(s.notify.timeout(), Duration::from_secs(10));
        assert_eq!(s.search.max_pages, 10);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn default_tables_are_populated() {
        let s = Settings::defaults().unwrap();
        let names: Vec<&str> = s.classifier.profiles.keys().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["backend", "devops", "fullstack"]);
        assert!(s.classifier.profiles["backend"].contains(&"backend".to_string()));
        assert!(s.classifier.exclusions.title.contains(&"senior".to_string()));
        assert!(s.classifier.exclusions.description.contains(&"itar".to_string()));
        assert!(s.classifier.gazetteer.contains(&"tx".to_string()));
        assert!(s.classifier.gazetteer.contains(&"remote".to_string()));
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobwatch.toml");
        std::fs::write(&path, "[fetch]\nconcurrency = 2\n[storage]\npath = \"x.sqlite\"\n").unwrap();
        let s = Settings::load(Some(&path)).unwrap();
        assert_eq!(s.fetch.concurrency, 2);
        assert_eq!(s.storage.path, PathBuf::from("x.sqlite"));
        assert_eq!(s.fetch.timeout_secs, 10);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[search]\npage_size = 0\n").unwrap();
        assert!(Settings::load(Some(&path)).is_err());
    }
}
