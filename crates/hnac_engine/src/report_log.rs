use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use hnac_core::JobReport;
use hnac_logging::hnac_warn;

use crate::persist::append_line;
use crate::PersistError;

/// Append-only log of job reports, one JSON document per line.
#[derive(Debug, Clone)]
pub struct ReportLog {
    path: PathBuf,
}

impl ReportLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, report: &JobReport) -> Result<(), PersistError> {
        let line = serde_json::to_string(report)?;
        append_line(&self.path, &line)
    }

    /// The `count` most recent reports, newest first. Unreadable lines are skipped.
    pub fn latest(&self, count: usize) -> Result<Vec<JobReport>, PersistError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut reports: Vec<JobReport> = content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(index, line)| match serde_json::from_str(line) {
                Ok(report) => Some(report),
                Err(err) => {
                    hnac_warn!(
                        "Skipping malformed report on line {} of {:?}: {}",
                        index + 1,
                        self.path,
                        err
                    );
                    None
                }
            })
            .collect();

        reports.sort_by(|a, b| b.start_time().cmp(&a.start_time()));
        reports.truncate(count);
        Ok(reports)
    }
}
