use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use hnac_core::{JobContext, Settings, StoryItem};
use hnac_logging::{hnac_debug, hnac_info};
use serde::{Deserialize, Serialize};

use crate::persist::write_atomically;
use crate::processor::Processor;
use crate::source::Source;
use crate::{PersistError, ProcessorError};

/// Source of "now" for `updated_at`; swapped out in tests.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// One persisted story row, keyed by the item's external id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredStory {
    pub external_id: u64,
    pub title: String,
    pub url: String,
    pub author: String,
    pub score: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreAction {
    Created,
    Updated,
}

/// Durable storage sink: a JSON file of story rows.
///
/// Rows are loaded on `job_started`, upserted in memory per item and written
/// back atomically on `job_finished`.
pub struct FileStorage {
    path: PathBuf,
    clock: Clock,
    rows: Option<BTreeMap<u64, StoredStory>>,
    dirty: bool,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            clock: Arc::new(Utc::now),
            rows: None,
            dirty: false,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads all rows from `path`. A missing file is an empty store.
    pub fn load(path: &Path) -> Result<BTreeMap<u64, StoredStory>, PersistError> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(err.into()),
        };
        let rows: Vec<StoredStory> = serde_json::from_str(&content)?;
        Ok(rows.into_iter().map(|row| (row.external_id, row)).collect())
    }

    /// Creates the row for `item`, or refreshes score, comment count and
    /// `updated_at` of the existing one.
    pub fn upsert(&mut self, item: &StoryItem) -> Result<StoreAction, ProcessorError> {
        let now = (self.clock)();
        let rows = self.rows.as_mut().ok_or(ProcessorError::NotStarted)?;
        self.dirty = true;

        if let Some(row) = rows.get_mut(&item.id) {
            hnac_debug!("Updating story {}", item.id);
            row.score = item.score;
            row.comment_count = item.descendant_count;
            row.updated_at = now;
            return Ok(StoreAction::Updated);
        }

        hnac_debug!("Inserting story {}", item.id);
        rows.insert(
            item.id,
            StoredStory {
                external_id: item.id,
                title: item.title.clone(),
                url: item.url.clone(),
                author: item.author.clone(),
                score: item.score,
                comment_count: item.descendant_count,
                created_at: item.created_at().unwrap_or(now),
                updated_at: now,
            },
        );
        Ok(StoreAction::Created)
    }
}

#[async_trait::async_trait]
impl Processor for FileStorage {
    fn name(&self) -> &str {
        "storage"
    }

    fn configure(&mut self, settings: &Settings) -> Result<(), ProcessorError> {
        if settings.storage.path.as_os_str().is_empty() {
            return Err(ProcessorError::Configuration(
                "storage.path must not be empty".to_string(),
            ));
        }
        self.path = settings.storage.path.clone();
        Ok(())
    }

    async fn job_started(&mut self, _job: &JobContext) -> Result<(), ProcessorError> {
        let rows = Self::load(&self.path)?;
        hnac_info!("Loaded {} stored stories from {:?}", rows.len(), self.path);
        self.rows = Some(rows);
        self.dirty = false;
        Ok(())
    }

    async fn job_finished(&mut self, _job: &JobContext) -> Result<(), ProcessorError> {
        let Some(rows) = self.rows.take() else {
            return Ok(());
        };
        if !std::mem::take(&mut self.dirty) {
            return Ok(());
        }
        let rows: Vec<&StoredStory> = rows.values().collect();
        let content = serde_json::to_vec_pretty(&rows)?;
        write_atomically(&self.path, &content)?;
        hnac_info!("Saved {} stories to {:?}", rows.len(), self.path);
        Ok(())
    }

    async fn process_item(
        &mut self,
        _source: &dyn Source,
        item: &StoryItem,
    ) -> Result<(), ProcessorError> {
        self.upsert(item).map(|_| ())
    }
}
