use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::app_dirs::AppDirs;
use crate::error::Result;
use crate::session::SessionResult;

/// One row of the results log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub date: String,
    pub duration_secs: Option<f64>,
    pub elapsed_secs: f64,
    pub gross_wpm: u32,
    pub net_wpm: u32,
    pub accuracy: u8,
    pub consistency: u8,
    pub mistakes: usize,
    pub completed: bool,
}

impl From<&SessionResult> for LogRecord {
    fn from(r: &SessionResult) -> Self {
        Self {
            date: r.finished_at.to_rfc3339(),
            duration_secs: r.duration_secs,
            elapsed_secs: (r.elapsed_secs * 100.0).round() / 100.0,
            gross_wpm: r.gross_wpm,
            net_wpm: r.net_wpm,
            accuracy: r.accuracy,
            consistency: r.consistency,
            mistakes: r.mistakes,
            completed: r.completed,
        }
    }
}

/// Append-only CSV history of finished sessions
#[derive(Debug, Clone)]
pub struct ResultLog {
    path: PathBuf,
}

impl ResultLog {
    pub fn new() -> Self {
        Self {
            path: AppDirs::results_log_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, result: &SessionResult) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // If the log doesn't exist yet, we need to emit a header
        let needs_header = !self.path.exists();

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(LogRecord::from(result))?;
        writer.flush()?;
        Ok(())
    }

    /// Every logged session, oldest first. A missing log is empty.
    pub fn records(&self) -> Result<Vec<LogRecord>> {
        if !self.path.exists() {
            return Ok(vec![]);
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        let records = reader
            .deserialize()
            .collect::<std::result::Result<Vec<LogRecord>, csv::Error>>()?;
        Ok(records)
    }

    /// Last `n` sessions, newest first
    pub fn recent(&self, n: usize) -> Result<Vec<LogRecord>> {
        Ok(self.records()?.into_iter().rev().take(n).collect())
    }

    pub fn best_net_wpm(&self) -> Result<Option<u32>> {
        Ok(self.records()?.iter().map(|r| r.net_wpm).max())
    }
}

impl Default for ResultLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::DisplayTargets;
    use chrono::Local;
    use tempfile::tempdir;

    fn result(net_wpm: u32) -> SessionResult {
        SessionResult {
            gross_wpm: net_wpm + 5,
            net_wpm,
            accuracy: 96,
            consistency: 81,
            elapsed_secs: 12.346,
            mistakes_by_char: [("e".to_string(), 2)].into_iter().collect(),
            typed: 50,
            correct: 48,
            mistakes: 2,
            duration_secs: Some(15.0),
            completed: false,
            wpm_samples: vec![40.0, 50.0],
            finished_at: Local::now(),
            display_targets: DisplayTargets::new(),
        }
    }

    #[test]
    fn missing_log_is_empty() {
        let dir = tempdir().unwrap();
        let log = ResultLog::with_path(dir.path().join("results.csv"));
        assert!(log.records().unwrap().is_empty());
        assert_eq!(log.best_net_wpm().unwrap(), None);
    }

    #[test]
    fn append_writes_single_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state").join("results.csv");
        let log = ResultLog::with_path(&path);

        log.append(&result(40)).unwrap();
        log.append(&result(55)).unwrap();
        log.append(&result(47)).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().filter(|l| l.starts_with("date,")).count(), 1);
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn reads_back_records() {
        let dir = tempdir().unwrap();
        let log = ResultLog::with_path(dir.path().join("results.csv"));
        log.append(&result(40)).unwrap();
        log.append(&result(55)).unwrap();
        log.append(&result(47)).unwrap();

        let records = log.records().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].elapsed_secs, 12.35);
        assert_eq!(records[0].duration_secs, Some(15.0));

        let recent = log.recent(2).unwrap();
        assert_eq!(
            recent.iter().map(|r| r.net_wpm).collect::<Vec<_>>(),
            vec![47, 55]
        );
        assert_eq!(log.best_net_wpm().unwrap(), Some(55));
    }
}
