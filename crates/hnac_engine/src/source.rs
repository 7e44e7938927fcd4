use std::collections::VecDeque;
use std::future::Future;

use hnac_core::{JobContext, Settings, SourceSettings, StoryItem};
use hnac_logging::{hnac_debug, hnac_error, hnac_info, hnac_warn};
use tokio::time::Instant;

use crate::fetch::{FetchSettings, HackernewsApi, ReqwestApi};
use crate::{FetchError, Operation, SourceError};

/// Produces the validated items of one run.
///
/// `next_item` is a forward-only pull: `Ok(Some(_))` yields an item, `Ok(None)`
/// means the sequence is exhausted and `Err(_)` is fatal for the run. After
/// either terminal state every further call returns `Ok(None)`.
#[async_trait::async_trait]
pub trait Source: Send + Sync {
    fn name(&self) -> &str;

    fn configure(&mut self, _settings: &Settings) {}

    async fn job_started(&mut self, _job: &JobContext) {}

    async fn job_finished(&mut self, _job: &JobContext) {}

    async fn next_item(&mut self) -> Result<Option<StoryItem>, SourceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SequenceState {
    Fresh,
    Draining,
    Exhausted,
    Failed,
}

/// Counters for one run of [`HackernewsStories`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceStats {
    pub ids_listed: usize,
    pub items_yielded: usize,
    pub items_skipped: usize,
}

/// Newest Hacker News stories, fetched one by one with throttling and retry.
pub struct HackernewsStories {
    api: Box<dyn HackernewsApi>,
    settings: SourceSettings,
    state: SequenceState,
    pending: VecDeque<u64>,
    last_request: Option<Instant>,
    stats: SourceStats,
}

impl HackernewsStories {
    pub fn new(api: impl HackernewsApi + 'static) -> Self {
        Self {
            api: Box::new(api),
            settings: SourceSettings::default(),
            state: SequenceState::Fresh,
            pending: VecDeque::new(),
            last_request: None,
            stats: SourceStats::default(),
        }
    }

    /// Builds a source backed by the HTTP API and applies `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self, FetchError> {
        let api = ReqwestApi::new(FetchSettings::from(&settings.api))?;
        let mut source = Self::new(api);
        source.configure(settings);
        Ok(source)
    }

    pub fn settings(&self) -> &SourceSettings {
        &self.settings
    }

    pub fn stats(&self) -> SourceStats {
        self.stats
    }

    async fn throttle(&self) {
        let Some(last) = self.last_request else {
            return;
        };
        let interval = self.settings.poll_interval();
        let elapsed = last.elapsed();
        if elapsed < interval {
            let sleep_for = interval - elapsed;
            hnac_debug!("Throttling for {:?}", sleep_for);
            tokio::time::sleep(sleep_for).await;
        }
    }

    async fn fetch_story_ids(&mut self) -> Result<Vec<u64>, SourceError> {
        let api = self.api.as_ref();
        let last_request = &mut self.last_request;
        with_retry(&self.settings, Operation::NewStoryIds, move || {
            *last_request = Some(Instant::now());
            api.new_story_ids()
        })
        .await
    }

    async fn fetch_item(&mut self, id: u64) -> Result<serde_json::Value, SourceError> {
        hnac_debug!("Fetching hackernews item {}", id);
        let api = self.api.as_ref();
        let last_request = &mut self.last_request;
        with_retry(&self.settings, Operation::Item(id), move || {
            *last_request = Some(Instant::now());
            api.item(id)
        })
        .await
    }

    async fn advance(&mut self) -> Result<Option<StoryItem>, SourceError> {
        if self.state == SequenceState::Fresh {
            let ids = self.fetch_story_ids().await?;
            hnac_info!("Fetched {} new story ids", ids.len());
            self.stats.ids_listed = ids.len();
            self.pending = ids.into();
            self.state = SequenceState::Draining;
        }

        while let Some(id) = self.pending.pop_front() {
            self.throttle().await;
            let body = self.fetch_item(id).await?;
            match StoryItem::from_value(&body) {
                Some(item) => {
                    self.stats.items_yielded += 1;
                    return Ok(Some(item));
                }
                None => {
                    hnac_debug!("Item {} is not a story, skipping", id);
                    self.stats.items_skipped += 1;
                }
            }
        }

        self.state = SequenceState::Exhausted;
        Ok(None)
    }
}

#[async_trait::async_trait]
impl Source for HackernewsStories {
    fn name(&self) -> &str {
        "hackernews-stories"
    }

    fn configure(&mut self, settings: &Settings) {
        self.settings.apply(&settings.source);
        hnac_debug!("Source settings: {:?}", self.settings);
    }

    async fn job_started(&mut self, _job: &JobContext) {
        self.state = SequenceState::Fresh;
        self.pending.clear();
        self.stats = SourceStats::default();
    }

    async fn job_finished(&mut self, _job: &JobContext) {
        let dropped = self.pending.len();
        self.pending.clear();
        hnac_info!(
            "Source finished: {} ids listed, {} stories yielded, {} items skipped, {} ids not fetched",
            self.stats.ids_listed,
            self.stats.items_yielded,
            self.stats.items_skipped,
            dropped
        );
    }

    async fn next_item(&mut self) -> Result<Option<StoryItem>, SourceError> {
        match self.state {
            SequenceState::Exhausted | SequenceState::Failed => return Ok(None),
            SequenceState::Fresh | SequenceState::Draining => {}
        }
        let next = self.advance().await;
        if next.is_err() {
            self.state = SequenceState::Failed;
            self.pending.clear();
        }
        next
    }
}

/// Fixed-delay retry with a hard ceiling.
///
/// Each transient failure bumps a counter local to this operation; once it
/// exceeds `max_retry_attempts` the operation is abandoned, so at most
/// `max_retry_attempts + 1` attempts are made. Permanent failures are not retried.
pub(crate) async fn with_retry<T, F, Fut>(
    settings: &SourceSettings,
    operation: Operation,
    mut attempt: F,
) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut failures: u32 = 0;
    loop {
        let err = match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.kind.is_transient() {
            hnac_error!("Failed to fetch {}: {}", operation, err);
            return Err(SourceError::Fetch {
                operation,
                source: err,
            });
        }

        failures += 1;
        hnac_warn!("Failed to fetch {} (failure {}): {}", operation, failures, err);
        if failures > settings.max_retry_attempts {
            hnac_error!("Giving up on {} after {} attempts", operation, failures);
            return Err(SourceError::RetryExhausted {
                operation,
                attempts: failures,
                last: err,
            });
        }

        tokio::time::sleep(settings.backoff()).await;
    }
}
