use std::fmt;
use std::io;

use thiserror::Error;

/// A failed request against the Hacker News API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Decode,
    Network,
}

impl FailureKind {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FailureKind::HttpStatus(_)
            | FailureKind::Timeout
            | FailureKind::Decode
            | FailureKind::Network => true,
            FailureKind::InvalidUrl | FailureKind::TooLarge { .. } => false,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Decode => write!(f, "malformed response body"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// The outbound operation a retry budget belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    NewStoryIds,
    Item(u64),
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::NewStoryIds => write!(f, "new story ids"),
            Operation::Item(id) => write!(f, "item {id}"),
        }
    }
}

/// Fatal failure of a source; ends the item sequence of the current run.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("gave up fetching {operation} after {attempts} attempts: {last}")]
    RetryExhausted {
        operation: Operation,
        attempts: u32,
        #[source]
        last: FetchError,
    },
    #[error("fetching {operation} failed permanently: {source}")]
    Fetch {
        operation: Operation,
        source: FetchError,
    },
    #[error("unexpected source failure: {0}")]
    Unexpected(String),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("processor used before job_started")]
    NotStarted,
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected http status {status} from {url}")]
    HttpStatus { status: u16, url: String },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("processor panicked: {0}")]
    Panicked(String),
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown processor {0:?}")]
    UnknownSink(String),
    #[error("processor {processor} rejected its configuration: {source}")]
    Processor {
        processor: String,
        source: ProcessorError,
    },
    #[error("api client: {0}")]
    Api(#[from] FetchError),
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
