//! Concrete processors and the name → constructor resolver.
mod couchdb;
mod queue;
mod storage;

use std::fmt;
use std::str::FromStr;

use hnac_core::Settings;

use crate::processor::{Processor, ProcessorGroup};
use crate::ConfigError;

pub use couchdb::CouchDbStorage;
pub use queue::{story_message, QueuePublisher};
pub use storage::{Clock, FileStorage, StoreAction, StoredStory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Storage,
    CouchDb,
    Queue,
}

impl SinkKind {
    pub const ALL: [SinkKind; 3] = [SinkKind::Storage, SinkKind::CouchDb, SinkKind::Queue];

    pub fn name(self) -> &'static str {
        match self {
            SinkKind::Storage => "storage",
            SinkKind::CouchDb => "couchdb",
            SinkKind::Queue => "queue",
        }
    }

    /// A fresh, unconfigured processor of this kind.
    pub fn build(self, settings: &Settings) -> Box<dyn Processor> {
        match self {
            SinkKind::Storage => Box::new(FileStorage::new(settings.storage.path.clone())),
            SinkKind::CouchDb => Box::new(CouchDbStorage::new(settings.couchdb.clone())),
            SinkKind::Queue => Box::new(QueuePublisher::new(settings.queue.clone())),
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SinkKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        SinkKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| ConfigError::UnknownSink(s.to_string()))
    }
}

/// Resolves `settings.processors` into a configured group, keeping their order.
pub fn build_processor_group(settings: &Settings) -> Result<ProcessorGroup, ConfigError> {
    let mut group = ProcessorGroup::new();
    for name in &settings.processors {
        let kind: SinkKind = name.parse()?;
        group.add_boxed(kind.build(settings));
    }
    group
        .configure(settings)
        .map_err(|failure| ConfigError::Processor {
            processor: failure.processor,
            source: failure.error,
        })?;
    Ok(group)
}
