//! Hacker News crawler core: item model, settings and job reports. No IO.
mod item;
mod report;
mod settings;

pub use item::{is_story_item, StoryItem, REQUIRED_FIELDS, STORY_KIND};
pub use report::{JobContext, JobId, JobReport};
pub use settings::{
    ApiSettings, CouchDbSettings, LogDestination, LoggingSettings, QueueSettings,
    ReportSettings, Settings, SourceOverrides, SourceSettings, StorageSettings,
};
