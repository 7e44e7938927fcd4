#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::sync::{Arc, Mutex};

use hnac_core::{JobContext, Settings, StoryItem};
use hnac_engine::{
    FailureKind, FetchError, HackernewsApi, Processor, ProcessorError, Source, SourceError,
};
use serde_json::{json, Value};
use tokio::time::Instant;

pub fn story(id: u64) -> Value {
    json!({
        "by": format!("user{id}"),
        "descendants": 3,
        "id": id,
        "score": 10,
        "time": 1466856540,
        "title": format!("Story {id}"),
        "type": "story",
        "url": format!("http://example.com/{id}")
    })
}

pub fn comment(id: u64) -> Value {
    json!({
        "by": "someone",
        "id": id,
        "parent": 1,
        "text": "nice",
        "time": 1466856540,
        "type": "comment"
    })
}

pub fn story_item(id: u64) -> StoryItem {
    StoryItem::from_value(&story(id)).unwrap()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiCall {
    NewStoryIds,
    Item(u64),
}

#[derive(Default)]
struct FakeApiState {
    ids: Vec<u64>,
    id_list_failures: u32,
    items: HashMap<u64, Value>,
    item_failures: HashMap<u64, u32>,
    calls: Vec<(ApiCall, Instant)>,
}

/// Scripted in-memory API. Failures are transient network errors.
#[derive(Clone, Default)]
pub struct FakeApi {
    state: Arc<Mutex<FakeApiState>>,
}

impl FakeApi {
    pub fn new(ids: Vec<u64>) -> Self {
        let api = Self::default();
        api.state.lock().unwrap().ids = ids;
        api
    }

    pub fn with_item(self, id: u64, body: Value) -> Self {
        self.state.lock().unwrap().items.insert(id, body);
        self
    }

    pub fn failing_id_list(self, times: u32) -> Self {
        self.state.lock().unwrap().id_list_failures = times;
        self
    }

    pub fn failing_item(self, id: u64, times: u32) -> Self {
        self.state.lock().unwrap().item_failures.insert(id, times);
        self
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.state.lock().unwrap().calls.iter().map(|(c, _)| *c).collect()
    }

    pub fn timeline(&self) -> Vec<(ApiCall, Instant)> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, call: ApiCall) -> usize {
        self.calls().into_iter().filter(|c| *c == call).count()
    }
}

#[async_trait::async_trait]
impl HackernewsApi for FakeApi {
    async fn new_story_ids(&self) -> Result<Vec<u64>, FetchError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push((ApiCall::NewStoryIds, Instant::now()));
        if state.id_list_failures > 0 {
            state.id_list_failures -= 1;
            return Err(FetchError::new(FailureKind::Network, "connection reset"));
        }
        Ok(state.ids.clone())
    }

    async fn item(&self, id: u64) -> Result<Value, FetchError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push((ApiCall::Item(id), Instant::now()));
        if let Some(remaining) = state.item_failures.get_mut(&id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(FetchError::new(FailureKind::Timeout, "timed out"));
            }
        }
        Ok(state.items.get(&id).cloned().unwrap_or(Value::Null))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    SourceStarted,
    SourceFinished,
    Started(String),
    Finished(String),
    Item(String, u64),
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn events(log: &EventLog) -> Vec<Event> {
    log.lock().unwrap().clone()
}

pub fn items_seen_by(log: &EventLog, name: &str) -> Vec<u64> {
    events(log)
        .into_iter()
        .filter_map(|event| match event {
            Event::Item(processor, id) if processor == name => Some(id),
            _ => None,
        })
        .collect()
}

/// Records every call; can be told to fail or panic on chosen items or hooks.
pub struct RecordingProcessor {
    name: String,
    log: EventLog,
    fail_on: HashSet<u64>,
    panic_on: HashSet<u64>,
    fail_hooks: bool,
}

impl RecordingProcessor {
    pub fn new(name: &str, log: &EventLog) -> Self {
        Self {
            name: name.to_string(),
            log: log.clone(),
            fail_on: HashSet::new(),
            panic_on: HashSet::new(),
            fail_hooks: false,
        }
    }

    pub fn failing_on(mut self, id: u64) -> Self {
        self.fail_on.insert(id);
        self
    }

    pub fn panicking_on(mut self, id: u64) -> Self {
        self.panic_on.insert(id);
        self
    }

    pub fn failing_hooks(mut self) -> Self {
        self.fail_hooks = true;
        self
    }

    fn push(&self, event: Event) {
        self.log.lock().unwrap().push(event);
    }

    fn hook_result(&self) -> Result<(), ProcessorError> {
        if self.fail_hooks {
            Err(ProcessorError::Io(io::Error::other("hook failed")))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl Processor for RecordingProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn job_started(&mut self, _job: &JobContext) -> Result<(), ProcessorError> {
        self.push(Event::Started(self.name.clone()));
        self.hook_result()
    }

    async fn job_finished(&mut self, _job: &JobContext) -> Result<(), ProcessorError> {
        self.push(Event::Finished(self.name.clone()));
        self.hook_result()
    }

    async fn process_item(
        &mut self,
        _source: &dyn Source,
        item: &StoryItem,
    ) -> Result<(), ProcessorError> {
        self.push(Event::Item(self.name.clone(), item.id));
        if self.panic_on.contains(&item.id) {
            panic!("{} cannot handle item {}", self.name, item.id);
        }
        if self.fail_on.contains(&item.id) {
            return Err(ProcessorError::Io(io::Error::other("sink down")));
        }
        Ok(())
    }
}

/// Wraps a source and records its lifecycle hooks.
pub struct ObservedSource<S> {
    inner: S,
    log: EventLog,
}

impl<S> ObservedSource<S> {
    pub fn new(inner: S, log: &EventLog) -> Self {
        Self {
            inner,
            log: log.clone(),
        }
    }
}

#[async_trait::async_trait]
impl<S: Source> Source for ObservedSource<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn configure(&mut self, settings: &Settings) {
        self.inner.configure(settings);
    }

    async fn job_started(&mut self, job: &JobContext) {
        self.log.lock().unwrap().push(Event::SourceStarted);
        self.inner.job_started(job).await;
    }

    async fn job_finished(&mut self, job: &JobContext) {
        self.inner.job_finished(job).await;
        self.log.lock().unwrap().push(Event::SourceFinished);
    }

    async fn next_item(&mut self) -> Result<Option<StoryItem>, SourceError> {
        self.inner.next_item().await
    }
}

pub enum Step {
    Yield(StoryItem),
    Fail(SourceError),
    Panic,
}

/// Source replaying a fixed script, then exhausted.
pub struct ScriptedSource {
    steps: VecDeque<Step>,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: steps.into(),
        }
    }
}

#[async_trait::async_trait]
impl Source for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn next_item(&mut self) -> Result<Option<StoryItem>, SourceError> {
        match self.steps.pop_front() {
            Some(Step::Yield(item)) => Ok(Some(item)),
            Some(Step::Fail(err)) => Err(err),
            Some(Step::Panic) => panic!("source blew up"),
            None => Ok(None),
        }
    }
}
