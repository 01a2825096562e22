//! Results Repository - one JSON file per run
//!
//! Each save writes a temporary file in the results directory, syncs it,
//! and links it to a fresh unique name without replacing anything. A reader
//! listing the directory therefore sees either the complete record or
//! nothing; concurrent saves never collide.

use super::run_record::{DatasetInfo, RepoInfo, RunRecord};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::Builder;
use tracing::{debug, info};

/// Lazily loaded run results; a corrupt record surfaces as an `Err` item
pub type ResultIter<'a> = Box<dyn Iterator<Item = Result<RunResult>> + 'a>;

/// A persisted run read back from storage.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    /// The stored record
    pub record: RunRecord,
    /// Where it was read from
    pub path: PathBuf,
}

impl RunResult {
    /// Ordering key for display.
    #[must_use]
    pub const fn run_start(&self) -> DateTime<Utc> {
        self.record.run_start()
    }
}

/// Storage for run records.
pub trait ResultsStore {
    /// Attach provenance to `record` and persist it durably.
    ///
    /// Returns the location of the new record.
    ///
    /// # Errors
    /// Returns `Persistence` if the record cannot be written.
    fn save(&self, record: RunRecord, dataset: DatasetInfo, repo: RepoInfo) -> Result<PathBuf>;

    /// Enumerate every stored run.
    ///
    /// # Errors
    /// Returns `Persistence` if the store cannot be enumerated.
    fn list(&self) -> Result<ResultIter<'_>>;
}

/// Directory-backed results store.
#[derive(Debug, Clone)]
pub struct ResultsRepo {
    dir: PathBuf,
}

impl ResultsRepo {
    /// Create a store rooted at `dir`. Nothing is created until the first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Get the results directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the results directory if needed; an existing directory is fine.
    ///
    /// # Errors
    /// Returns `Persistence` if the directory cannot be created.
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            Error::Persistence(format!(
                "Failed to create results directory {}: {e}",
                self.dir.display()
            ))
        })
    }

    /// Unique final path for a new record.
    fn next_path(&self) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.6f");
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.dir.join(format!("result-{stamp}-{}.json", &id[..8]))
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let persistence = |what: &str, e: &dyn std::fmt::Display| {
            Error::Persistence(format!("Failed to {what} {}: {e}", path.display()))
        };

        let mut temp = Builder::new()
            .prefix(".result-")
            .suffix(".tmp")
            .tempfile_in(&self.dir)
            .map_err(|e| persistence("create temporary file for", &e))?;
        temp.write_all(bytes)
            .map_err(|e| persistence("write", &e))?;
        temp.flush().map_err(|e| persistence("flush", &e))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| persistence("sync", &e))?;
        temp.persist_noclobber(path)
            .map_err(|e| persistence("persist", &e.error))?;
        Ok(())
    }
}

fn is_record(path: &Path) -> bool {
    let visible = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| !n.starts_with('.'));
    visible && path.extension().is_some_and(|ext| ext == "json")
}

fn load(path: PathBuf) -> Result<RunResult> {
    let corrupt = |reason: String| Error::CorruptRecord {
        path: path.clone(),
        reason,
    };
    let text = fs::read_to_string(&path).map_err(|e| corrupt(e.to_string()))?;
    let record: RunRecord = serde_json::from_str(&text).map_err(|e| corrupt(e.to_string()))?;
    Ok(RunResult { record, path })
}

impl ResultsStore for ResultsRepo {
    fn save(&self, mut record: RunRecord, dataset: DatasetInfo, repo: RepoInfo) -> Result<PathBuf> {
        self.ensure_dir()?;

        let path = self.next_path();
        record.attach_provenance(dataset, repo);
        record.set_path(&path);

        let json = serde_json::to_vec_pretty(&record)?;
        self.write_atomic(&path, &json)?;

        info!(path = %path.display(), "Saved run result");
        Ok(path)
    }

    fn list(&self) -> Result<ResultIter<'_>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(dir = %self.dir.display(), "No results directory yet");
                return Ok(Box::new(std::iter::empty()));
            }
            Err(e) => {
                return Err(Error::Persistence(format!(
                    "Failed to list {}: {e}",
                    self.dir.display()
                )))
            }
        };

        let mut paths = entries
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()
            .map_err(|e| {
                Error::Persistence(format!("Failed to list {}: {e}", self.dir.display()))
            })?;
        paths.retain(|p| is_record(p));
        paths.sort();

        Ok(Box::new(paths.into_iter().map(load)))
    }
}
