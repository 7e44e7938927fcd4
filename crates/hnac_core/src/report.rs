use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique, never reused identifier of one job run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// What lifecycle hooks learn about the running job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobContext {
    pub job_id: JobId,
    pub started_at: DateTime<Utc>,
}

/// Immutable summary of one job run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReport {
    job_id: JobId,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    processed_item_count: u64,
    failed: bool,
}

impl JobReport {
    pub fn new(
        job_id: JobId,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        processed_item_count: u64,
        failed: bool,
    ) -> Self {
        Self {
            job_id,
            start_time,
            end_time,
            processed_item_count,
            failed,
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    pub fn processed_item_count(&self) -> u64 {
        self.processed_item_count
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn elapsed(&self) -> chrono::TimeDelta {
        self.end_time - self.start_time
    }
}
