use std::collections::HashSet;
use std::fmt;

use anyhow::Result;
use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use crate::canonical::CanonicalKey;
use crate::record::JobRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Partition {
    /// Relevant records found by the most recent cycle.
    New,
    /// Every relevant record reported by earlier cycles.
    Previous,
    /// Records the most recent cycle turned down.
    Rejected,
}

impl Partition {
    pub const ALL: [Partition; 3] = [Partition::New, Partition::Previous, Partition::Rejected];
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Partition::New => "new",
            Partition::Previous => "previous",
            Partition::Rejected => "rejected",
        })
    }
}

/// Full persisted state: three ordered partitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub new: Vec<JobRecord>,
    pub previous: Vec<JobRecord>,
    pub rejected: Vec<JobRecord>,
}

impl Snapshot {
    pub fn partition(&self, which: Partition) -> &[JobRecord] {
        match which {
            Partition::New => &self.new,
            Partition::Previous => &self.previous,
            Partition::Rejected => &self.rejected,
        }
    }
}

/// Durable storage for the corpus. `save` replaces prior contents wholesale.
pub trait CorpusStore: Send + Sync {
    fn load(&self) -> Result<Snapshot>;
    fn save(&self, snapshot: &Snapshot) -> Result<()>;
}

/// The corpus as read at the start of a cycle.
pub struct Corpus {
    loaded: Snapshot,
}

impl Corpus {
    /// Read the stored corpus. Unreadable state counts as a cold start.
    pub fn load(store: &dyn CorpusStore) -> Self {
        let loaded = match store.load() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "could not read corpus, starting cold");
                Snapshot::default()
            }
        };
        debug!(
            new = loaded.new.len(),
            previous = loaded.previous.len(),
            rejected = loaded.rejected.len(),
            "corpus loaded"
        );
        Self { loaded }
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> &Snapshot {
        &self.loaded
    }

    /// Keys already reported: everything in `new` and `previous`.
    pub fn seen_keys(&self) -> HashSet<CanonicalKey> {
        self.loaded
            .new
            .iter()
            .chain(&self.loaded.previous)
            .map(|r| r.url.clone())
            .collect()
    }

    /// Move the loaded `new` records into history, install this cycle's
    /// relevant records as `new` and persist the result.
    pub fn commit(
        self,
        store: &dyn CorpusStore,
        accepted: Vec<JobRecord>,
        ambiguous: Vec<JobRecord>,
        rejected: Vec<JobRecord>,
        now: NaiveDateTime,
    ) -> Result<Snapshot> {
        let Snapshot {
            new: old_new,
            previous: old_previous,
            ..
        } = self.loaded;

        let mut history_keys = HashSet::new();
        let previous: Vec<JobRecord> = old_new
            .into_iter()
            .chain(old_previous)
            .filter(|r| history_keys.insert(r.url.clone()))
            .collect();

        let mut new_keys = HashSet::new();
        let mut new = Vec::new();
        for mut record in accepted.into_iter().chain(ambiguous) {
            if history_keys.contains(&record.url) {
                info!(url = %record.url, "already in history, not reported again");
                continue;
            }
            if !new_keys.insert(record.url.clone()) {
                continue;
            }
            record.found_at = Some(now);
            new.push(record);
        }

        let snapshot = Snapshot {
            new,
            previous,
            rejected,
        };
        store.save(&snapshot)?;
        Ok(snapshot)
    }
}

/// In-process store for tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    state: std::sync::Mutex<Option<Snapshot>>,
    fail_load: bool,
    fail_save: bool,
}

#[cfg(test)]
impl MemoryStore {
    pub fn with(snapshot: Snapshot) -> Self {
        Self {
            state: std::sync::Mutex::new(Some(snapshot)),
            ..Default::default()
        }
    }

    pub fn failing_load() -> Self {
        Self {
            fail_load: true,
            ..Default::default()
        }
    }

    pub fn failing_save() -> Self {
        Self {
            fail_save: true,
            ..Default::default()
        }
    }

    pub fn current(&self) -> Snapshot {
        self.state.lock().unwrap().clone().unwrap_or_default()
    }
}

#[cfg(test)]
impl CorpusStore for MemoryStore {
    fn load(&self) -> Result<Snapshot> {
        if self.fail_load {
            anyhow::bail!("corrupt store");
        }
        Ok(self.state.lock().unwrap().clone().unwrap_or_default())
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if self.fail_save {
            anyhow::bail!("disk full");
        }
        *self.state.lock().unwrap() = Some(snapshot.clone());
        Ok(())
    }
}
