use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use hnac_core::{JobContext, Settings, StoryItem};
use hnac_logging::{hnac_debug, hnac_error};

use crate::source::Source;
use crate::types::panic_message;
use crate::ProcessorError;

/// A sink consuming validated items.
///
/// Sinks own their connections: acquire them in `job_started` (or
/// `configure`) and release them in `job_finished`.
#[async_trait::async_trait]
pub trait Processor: Send + Sync {
    fn name(&self) -> &str;

    fn configure(&mut self, _settings: &Settings) -> Result<(), ProcessorError> {
        Ok(())
    }

    async fn job_started(&mut self, _job: &JobContext) -> Result<(), ProcessorError> {
        Ok(())
    }

    async fn job_finished(&mut self, _job: &JobContext) -> Result<(), ProcessorError> {
        Ok(())
    }

    async fn process_item(
        &mut self,
        source: &dyn Source,
        item: &StoryItem,
    ) -> Result<(), ProcessorError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    Configure,
    JobStarted,
    JobFinished,
    ProcessItem,
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hook::Configure => write!(f, "configure"),
            Hook::JobStarted => write!(f, "job_started"),
            Hook::JobFinished => write!(f, "job_finished"),
            Hook::ProcessItem => write!(f, "process_item"),
        }
    }
}

/// One member's failure inside a group call.
#[derive(Debug)]
pub struct ProcessorFailure {
    pub processor: String,
    pub hook: Hook,
    pub error: ProcessorError,
}

/// Ordered fan-out over processors. Insertion order is dispatch order.
///
/// A failing (or panicking) member never keeps the call from reaching the
/// members after it; failures are logged and handed back to the caller.
#[derive(Default)]
pub struct ProcessorGroup {
    processors: Vec<Box<dyn Processor>>,
}

impl ProcessorGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, processor: impl Processor + 'static) {
        self.processors.push(Box::new(processor));
    }

    pub fn add_boxed(&mut self, processor: Box<dyn Processor>) {
        self.processors.push(processor);
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.processors.iter().map(|p| p.name().to_string()).collect()
    }

    /// Configures every member in order, stopping at the first rejection.
    pub fn configure(&mut self, settings: &Settings) -> Result<(), ProcessorFailure> {
        for processor in &mut self.processors {
            if let Err(error) = processor.configure(settings) {
                return Err(ProcessorFailure {
                    processor: processor.name().to_string(),
                    hook: Hook::Configure,
                    error,
                });
            }
        }
        Ok(())
    }

    pub async fn job_started(&mut self, job: &JobContext) -> Vec<ProcessorFailure> {
        let mut failures = Vec::new();
        for processor in &mut self.processors {
            let result = isolated(processor.job_started(job)).await;
            record(&mut failures, processor.name(), Hook::JobStarted, result);
        }
        failures
    }

    pub async fn job_finished(&mut self, job: &JobContext) -> Vec<ProcessorFailure> {
        let mut failures = Vec::new();
        for processor in &mut self.processors {
            let result = isolated(processor.job_finished(job)).await;
            record(&mut failures, processor.name(), Hook::JobFinished, result);
        }
        failures
    }

    pub async fn process_item(
        &mut self,
        source: &dyn Source,
        item: &StoryItem,
    ) -> Vec<ProcessorFailure> {
        let mut failures = Vec::new();
        for processor in &mut self.processors {
            let result = isolated(processor.process_item(source, item)).await;
            if result.is_ok() {
                hnac_debug!("{} processed item {}", processor.name(), item.id);
            }
            record(&mut failures, processor.name(), Hook::ProcessItem, result);
        }
        failures
    }
}

async fn isolated<F>(call: F) -> Result<(), ProcessorError>
where
    F: Future<Output = Result<(), ProcessorError>>,
{
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(ProcessorError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn record(
    failures: &mut Vec<ProcessorFailure>,
    processor: &str,
    hook: Hook,
    result: Result<(), ProcessorError>,
) {
    if let Err(error) = result {
        hnac_error!("Processor {} failed in {}: {}", processor, hook, error);
        failures.push(ProcessorFailure {
            processor: processor.to_string(),
            hook,
            error,
        });
    }
}
