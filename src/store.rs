use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::canonical::CanonicalKey;
use crate::corpus::{CorpusStore, Partition, Snapshot};
use crate::record::{parse_found_at, JobRecord, FOUND_AT_FORMAT};

/// Corpus persisted as one SQLite file with a table per partition.
pub struct SqliteStore {
    path: PathBuf,
}

pub struct Stats {
    pub new: usize,
    pub previous: usize,
    pub rejected: usize,
}

fn table(partition: Partition) -> &'static str {
    match partition {
        Partition::New => "new_jobs",
        Partition::Previous => "previous_jobs",
        Partition::Rejected => "rejected_jobs",
    }
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        init_schema(&conn)?;
        Ok(conn)
    }

    // Reads never create the database.
    fn connect_existing(&self) -> Result<Option<Connection>> {
        if !self.path.exists() {
            return Ok(None);
        }
        self.connect().map(Some)
    }

    pub fn stats(&self) -> Result<Stats> {
        let Some(conn) = self.connect_existing()? else {
            return Ok(Stats { new: 0, previous: 0, rejected: 0 });
        };
        let count = |p: Partition| -> Result<usize> {
            let sql = format!("SELECT COUNT(*) FROM {}", table(p));
            Ok(conn.query_row(&sql, [], |r| r.get(0))?)
        };
        Ok(Stats {
            new: count(Partition::New)?,
            previous: count(Partition::Previous)?,
            rejected: count(Partition::Rejected)?,
        })
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    for partition in Partition::ALL {
        conn.execute_batch(&format!(
            "
            CREATE TABLE IF NOT EXISTS {} (
                position    INTEGER PRIMARY KEY,
                url         TEXT NOT NULL,
                company     TEXT NOT NULL,
                title       TEXT NOT NULL,
                location    TEXT NOT NULL,
                description TEXT NOT NULL,
                found_at    TEXT
            );",
            table(partition)
        ))?;
    }
    Ok(())
}

fn read_partition(conn: &Connection, partition: Partition) -> Result<Vec<JobRecord>> {
    let sql = format!(
        "SELECT url, company, title, location, description, found_at
         FROM {} ORDER BY position",
        table(partition)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            let found_at: Option<String> = row.get(5)?;
            Ok(JobRecord {
                url: CanonicalKey::from_stored(row.get(0)?),
                company: row.get(1)?,
                title: row.get(2)?,
                location: row.get(3)?,
                description: row.get(4)?,
                found_at: found_at.as_deref().and_then(parse_found_at),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

impl CorpusStore for SqliteStore {
    fn load(&self) -> Result<Snapshot> {
        let Some(conn) = self.connect_existing()? else {
            return Ok(Snapshot::default());
        };
        Ok(Snapshot {
            new: read_partition(&conn, Partition::New)?,
            previous: read_partition(&conn, Partition::Previous)?,
            rejected: read_partition(&conn, Partition::Rejected)?,
        })
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let conn = self.connect()?;
        let tx = conn.unchecked_transaction()?;
        for partition in Partition::ALL {
            let name = table(partition);
            tx.execute(&format!("DELETE FROM {}", name), [])?;
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} (position, url, company, title, location, description, found_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                name
            ))?;
            for (i, r) in snapshot.partition(partition).iter().enumerate() {
                let found_at = r.found_at.map(|t| t.format(FOUND_AT_FORMAT).to_string());
                stmt.execute(rusqlite::params![
                    i as i64,
                    r.url.as_str(),
                    r.company,
                    r.title,
                    r.location,
                    r.description,
                    found_at,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}
