//! Crawler engine: API client, story source, processors and the job runner.
mod fetch;
mod job;
mod persist;
mod processor;
mod report_log;
pub mod sinks;
mod source;
mod types;

pub use fetch::{FetchSettings, HackernewsApi, ReqwestApi};
pub use job::Job;
pub use persist::{append_line, ensure_parent_dir, write_atomically};
pub use processor::{Hook, Processor, ProcessorFailure, ProcessorGroup};
pub use report_log::ReportLog;
pub use sinks::{build_processor_group, SinkKind};
pub use source::{HackernewsStories, Source, SourceStats};
pub use types::{
    ConfigError, FailureKind, FetchError, Operation, PersistError, ProcessorError, SourceError,
};
