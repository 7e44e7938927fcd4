use std::any::Any;
use std::panic::AssertUnwindSafe;

use chrono::Utc;
use futures_util::FutureExt;
use hnac_core::{JobContext, JobId, JobReport};
use hnac_logging::{hnac_error, hnac_info, hnac_warn, in_job_scope};
use tokio_util::sync::CancellationToken;

use crate::processor::{Hook, ProcessorGroup};
use crate::source::Source;
use crate::types::panic_message;
use crate::SourceError;

/// How the retrieval loop ended.
#[derive(Debug)]
enum LoopEnd {
    Exhausted,
    Cancelled,
    Failed(SourceError),
}

/// Binds one source to one processor group for a single run.
///
/// `run` consumes the job, so a job executes at most once.
pub struct Job {
    id: JobId,
    source: Box<dyn Source>,
    processors: ProcessorGroup,
    cancel: CancellationToken,
    processed_item_count: u64,
    processor_failures: usize,
}

impl Job {
    pub fn new(source: Box<dyn Source>, processors: ProcessorGroup) -> Self {
        Self {
            id: JobId::new(),
            source,
            processors,
            cancel: CancellationToken::new(),
            processed_item_count: 0,
            processor_failures: 0,
        }
    }

    /// Stops pulling items once `token` is cancelled. Cleanup still runs.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    /// Runs the job to completion. Never fails: every outcome ends up in the report.
    pub async fn run(self) -> JobReport {
        let scope = self.id.to_string();
        in_job_scope(scope, self.execute()).await
    }

    async fn execute(mut self) -> JobReport {
        hnac_info!("Starting job with id {}", self.id);

        let start_time = Utc::now();
        let context = JobContext {
            job_id: self.id,
            started_at: start_time,
        };

        let source_started = AssertUnwindSafe(self.source.job_started(&context))
            .catch_unwind()
            .await;
        let source_ready = match source_started {
            Ok(()) => true,
            Err(payload) => {
                self.source_hook_panicked(Hook::JobStarted, payload);
                false
            }
        };
        self.processor_failures += self.processors.job_started(&context).await.len();

        let mut failed = if source_ready {
            self.drain().await
        } else {
            true
        };

        self.processor_failures += self.processors.job_finished(&context).await.len();
        let source_finished = AssertUnwindSafe(self.source.job_finished(&context))
            .catch_unwind()
            .await;
        if let Err(payload) = source_finished {
            self.source_hook_panicked(Hook::JobFinished, payload);
            failed = true;
        }

        let end_time = Utc::now();
        hnac_info!(
            "Finished executing job with id {}: {} items processed, {} processor failures, failed={}",
            self.id,
            self.processed_item_count,
            self.processor_failures,
            failed
        );

        JobReport::new(
            self.id,
            start_time,
            end_time,
            self.processed_item_count,
            failed,
        )
    }

    /// Runs the retrieval loop and tells whether it ended in failure.
    async fn drain(&mut self) -> bool {
        let outcome = AssertUnwindSafe(self.retrieve_and_process())
            .catch_unwind()
            .await;

        match outcome {
            Ok(LoopEnd::Exhausted) => false,
            Ok(LoopEnd::Cancelled) => {
                hnac_warn!("Job with id {} stopped by user or system", self.id);
                false
            }
            Ok(LoopEnd::Failed(err)) => {
                hnac_error!("Failed to execute job with id {}: {}", self.id, err);
                true
            }
            Err(payload) => {
                let err = SourceError::Unexpected(panic_message(payload.as_ref()));
                hnac_error!("Error occurred in job with id {}: {}", self.id, err);
                true
            }
        }
    }

    fn source_hook_panicked(&self, hook: Hook, payload: Box<dyn Any + Send>) {
        hnac_error!(
            "Source {} panicked in {}: {}",
            self.source.name(),
            hook,
            panic_message(payload.as_ref())
        );
    }

    async fn retrieve_and_process(&mut self) -> LoopEnd {
        loop {
            if self.cancel.is_cancelled() {
                return LoopEnd::Cancelled;
            }

            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return LoopEnd::Cancelled,
                next = self.source.next_item() => next,
            };

            match next {
                Ok(Some(item)) => {
                    let failures = self
                        .processors
                        .process_item(self.source.as_ref(), &item)
                        .await;
                    self.processor_failures += failures.len();
                    self.processed_item_count += 1;
                }
                Ok(None) => return LoopEnd::Exhausted,
                Err(err) => return LoopEnd::Failed(err),
            }
        }
    }
}
