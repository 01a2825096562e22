//! Results table and its on-disk cache
//!
//! Printing results must be fast, so the table is rendered once after every
//! run and cached as plain text. [`print_cached`] only reads that file;
//! [`print_display`] falls back to rebuilding it from the results directory.

use super::results::{ResultIter, ResultsRepo, ResultsStore, RunResult};
use super::run_record::DIRTY_PREFIX;
use crate::config::PastryConfig;
use crate::{Error, Result};
use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Characters of a revision or digest shown in the table
pub const SHORT_HASH_LEN: usize = 8;

/// Fixed leading columns
const LEADING: [&str; 4] = ["Revision", "Dataset hash", "Run start", "Model"];
/// Fixed trailing column
const DURATION: &str = "Duration (s)";

/// Presentation of stored results.
pub trait ResultsDisplay {
    /// Rebuild whatever the display shows from `results`.
    ///
    /// # Errors
    /// Returns the first corrupt record, or a failure writing the display.
    fn refresh(&self, results: ResultIter<'_>) -> Result<()>;

    /// Show the most recent `limit` results (all when `None`).
    ///
    /// # Errors
    /// Returns error if the display cannot be read or written.
    fn print(&self, limit: Option<usize>) -> Result<()>;
}

/// First [`SHORT_HASH_LEN`] characters of `hash`.
#[must_use]
pub fn short_hash(hash: &str) -> &str {
    hash.char_indices()
        .nth(SHORT_HASH_LEN)
        .map_or(hash, |(end, _)| &hash[..end])
}

fn revision_cell(revision: &str) -> String {
    revision.strip_prefix(DIRTY_PREFIX).map_or_else(
        || short_hash(revision).to_string(),
        |bare| format!("{}*", short_hash(bare)),
    )
}

fn row(result: &RunResult, metrics: &BTreeSet<&str>) -> Vec<String> {
    let record = &result.record;
    let scores = record.results();

    let mut cells = vec![
        record
            .repo()
            .map_or_else(|| "-".to_string(), |r| revision_cell(&r.revision)),
        record
            .dataset()
            .map_or_else(|| "-".to_string(), |d| short_hash(&d.hash).to_string()),
        record.run_start().format("%Y-%m-%d %H:%M:%S").to_string(),
        record.model_info().type_name.clone(),
    ];
    for metric in metrics {
        let cell = match (scores.test_score.get(*metric), scores.test_score_sem.get(*metric)) {
            (Some(mean), Some(sem)) => format!("{mean:.3} ± {sem:.3}"),
            (Some(mean), None) => format!("{mean:.3}"),
            _ => "-".to_string(),
        };
        cells.push(cell);
    }
    cells.push(format!("{:.2}", record.run_seconds()));
    cells
}

/// Render results as a fixed-width table, oldest run first.
///
/// One column per metric seen in any result, in name order. A dirty
/// revision is marked with a trailing `*`.
#[must_use]
pub fn render_table(results: &[RunResult]) -> String {
    let mut sorted: Vec<&RunResult> = results.iter().collect();
    sorted.sort_by_key(|r| r.run_start());

    let metrics: BTreeSet<&str> = results
        .iter()
        .flat_map(|r| r.record.results().test_score.keys().map(String::as_str))
        .collect();

    let header: Vec<String> = LEADING
        .iter()
        .copied()
        .chain(metrics.iter().copied())
        .chain([DURATION])
        .map(ToString::to_string)
        .collect();
    let rows: Vec<Vec<String>> = sorted.iter().map(|r| row(r, &metrics)).collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for cells in &rows {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut table = String::new();
    for cells in std::iter::once(&header).chain(&rows) {
        let line = cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ");
        table.push_str(line.trim_end());
        table.push('\n');
    }
    table
}

/// Keep the header line and the last `limit` rows.
fn limit_rows(table: &str, limit: Option<usize>) -> String {
    let mut lines = table.lines();
    let Some(header) = lines.next() else {
        return String::new();
    };
    let rows: Vec<&str> = lines.collect();
    let skip = limit.map_or(0, |n| rows.len().saturating_sub(n));

    let mut out = String::from(header);
    out.push('\n');
    for line in &rows[skip..] {
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Read the cached table limited to `limit` rows; `None` if no cache exists.
///
/// # Errors
/// Returns `Io` if the cache exists but cannot be read.
pub fn read_cached(cache_path: &Path, limit: Option<usize>) -> Result<Option<String>> {
    match fs::read_to_string(cache_path) {
        Ok(table) => Ok(Some(limit_rows(&table, limit))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn emit(text: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

/// Fast path: print the cached table if there is one.
///
/// Returns `false` when no cache exists, without touching stored results.
///
/// # Errors
/// Returns error if the cache cannot be read or stdout cannot be written.
pub fn print_cached(cache_path: &Path, limit: Option<usize>) -> Result<bool> {
    match read_cached(cache_path, limit)? {
        Some(text) => {
            emit(&text)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Print results, rebuilding the cache from the results directory on a miss.
///
/// # Errors
/// Returns error if listing, rendering, or printing fails.
pub fn print_display(config: &PastryConfig, limit: Option<usize>) -> Result<()> {
    if print_cached(&config.cache_path, limit)? {
        return Ok(());
    }
    debug!(cache = %config.cache_path.display(), "Display cache missing");
    let display = CacheDisplay::new(&config.cache_path);
    display.refresh(ResultsRepo::new(&config.results_dir).list()?)?;
    display.print(limit)
}

/// Write the limited table to `dest`.
///
/// # Errors
/// Returns `Persistence` if there is no cache or `dest` cannot be written.
pub fn export_rows(cache_path: &Path, limit: Option<usize>, dest: &Path) -> Result<()> {
    let text = read_cached(cache_path, limit)?.ok_or_else(|| {
        Error::Persistence(format!(
            "No display cache at {}; refresh it first",
            cache_path.display()
        ))
    })?;
    fs::write(dest, text)
        .map_err(|e| Error::Persistence(format!("Failed to export to {}: {e}", dest.display())))
}

/// Text-table display backed by a cache file.
#[derive(Debug, Clone)]
pub struct CacheDisplay {
    cache_path: PathBuf,
}

impl CacheDisplay {
    /// Create a display caching its table at `cache_path`.
    #[must_use]
    pub fn new(cache_path: impl Into<PathBuf>) -> Self {
        Self {
            cache_path: cache_path.into(),
        }
    }

    /// Get the cache file location.
    #[must_use]
    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    fn write_cache(&self, table: &str) -> Result<()> {
        let parent = match self.cache_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let failed = |e: &dyn std::fmt::Display| {
            Error::Persistence(format!(
                "Failed to write display cache {}: {e}",
                self.cache_path.display()
            ))
        };

        fs::create_dir_all(&parent).map_err(|e| failed(&e))?;
        let mut temp = tempfile::NamedTempFile::new_in(&parent).map_err(|e| failed(&e))?;
        temp.write_all(table.as_bytes()).map_err(|e| failed(&e))?;
        temp.as_file().sync_all().map_err(|e| failed(&e))?;
        temp.persist(&self.cache_path).map_err(|e| failed(&e.error))?;
        Ok(())
    }
}

impl ResultsDisplay for CacheDisplay {
    fn refresh(&self, results: ResultIter<'_>) -> Result<()> {
        let results = results.collect::<Result<Vec<_>>>()?;
        self.write_cache(&render_table(&results))?;
        info!(results = results.len(), cache = %self.cache_path.display(), "Regenerated display cache");
        Ok(())
    }

    fn print(&self, limit: Option<usize>) -> Result<()> {
        if print_cached(&self.cache_path, limit)? {
            Ok(())
        } else {
            Err(Error::Persistence(format!(
                "Display cache {} is missing",
                self.cache_path.display()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::run_record::{DatasetInfo, ModelInfo, RepoInfo, RunRecord};
    use crate::predictor::DummyPredictor;
    use crate::scoring::ScoreSummary;
    use chrono::{Duration, TimeZone, Utc};

    fn result(start_secs: i64, revision: &str, dirty: bool) -> RunResult {
        let start = Utc.with_ymd_and_hms(2020, 1, 31, 9, 19, 44).unwrap()
            + Duration::seconds(start_secs);
        let mut summary = ScoreSummary::default();
        summary.mean.insert("mean_absolute_error".into(), 100.0);
        summary.sem.insert("mean_absolute_error".into(), 1.0);
        summary.mean.insert("mean_relative_error".into(), 0.5);
        summary.sem.insert("mean_relative_error".into(), 0.01);

        let mut record = RunRecord::builder(
            start,
            ModelInfo::capture(&DummyPredictor::constant(0.0), 1000),
        )
        .summary(summary)
        .finish(start + Duration::milliseconds(4482));
        record.attach_provenance(
            DatasetInfo {
                hash: "998c9dea0afb12d91a8c67f256f80b0a603dd59b".into(),
                columns: vec!["input".into(), "output".into()],
                rows: 10,
            },
            RepoInfo::new(revision, dirty, "msg"),
        );
        RunResult {
            record,
            path: PathBuf::from("results/x.json"),
        }
    }

    #[test]
    fn test_short_hash() {
        assert_eq!(short_hash("998c9dea0afb12d9"), "998c9dea");
        assert_eq!(short_hash("abc"), "abc");
    }

    #[test]
    fn test_render_row_cells() {
        let table = render_table(&[result(0, "abc123def456", false)]);
        let mut lines = table.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("Revision"));
        assert!(header.contains("mean_absolute_error"));
        assert!(header.trim_end().ends_with("Duration (s)"));

        let row = lines.next().unwrap();
        assert!(row.starts_with("abc123de"));
        assert!(row.contains("998c9dea"));
        assert!(row.contains("2020-01-31 09:19:44"));
        assert!(row.contains("DummyPredictor"));
        assert!(row.contains("100.000 ± 1.000"));
        assert!(row.contains("0.500 ± 0.010"));
        assert!(row.ends_with("4.48"));
    }

    #[test]
    fn test_dirty_revision_marked() {
        let table = render_table(&[result(0, "abc123def456", true)]);
        assert!(table.lines().nth(1).unwrap().starts_with("abc123de*"));
    }

    #[test]
    fn test_rows_sorted_and_limited() {
        let tmp = tempfile::tempdir().unwrap();
        let display = CacheDisplay::new(tmp.path().join("cache/display.txt"));
        let results = vec![
            Ok(result(20, "cccccccc", false)),
            Ok(result(0, "aaaaaaaa", false)),
            Ok(result(10, "bbbbbbbb", false)),
        ];
        display.refresh(Box::new(results.into_iter())).unwrap();

        let text = read_cached(display.cache_path(), Some(2)).unwrap().unwrap();
        let revisions: Vec<&str> = text.lines().skip(1).map(|l| &l[..8]).collect();
        assert_eq!(revisions, vec!["bbbbbbbb", "cccccccc"]);
    }

    #[test]
    fn test_refresh_fails_on_corrupt_record() {
        let tmp = tempfile::tempdir().unwrap();
        let display = CacheDisplay::new(tmp.path().join("display.txt"));
        let results = vec![Err(Error::CorruptRecord {
            path: PathBuf::from("results/bad.json"),
            reason: "EOF".into(),
        })];
        assert!(display.refresh(Box::new(results.into_iter())).is_err());
        assert!(!display.cache_path().exists());
    }

    #[test]
    fn test_missing_cache_is_not_printed() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(!print_cached(&tmp.path().join("none.txt"), None).unwrap());
        assert!(export_rows(&tmp.path().join("none.txt"), None, &tmp.path().join("out.txt")).is_err());
    }

    #[test]
    fn test_export_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let display = CacheDisplay::new(tmp.path().join("display.txt"));
        display
            .refresh(Box::new(vec![Ok(result(0, "aaaaaaaa", false))].into_iter()))
            .unwrap();
        let dest = tmp.path().join("export.txt");
        export_rows(display.cache_path(), Some(1), &dest).unwrap();
        assert_eq!(fs::read_to_string(dest).unwrap().lines().count(), 2);
    }
}
