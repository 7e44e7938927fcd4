use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Keys an item body must carry to be accepted as a story.
pub const REQUIRED_FIELDS: [&str; 8] = [
    "id",
    "type",
    "by",
    "descendants",
    "score",
    "time",
    "title",
    "url",
];

pub const STORY_KIND: &str = "story";

/// A validated story record. Field names on the wire follow the Hacker News API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryItem {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "by")]
    pub author: String,
    pub title: String,
    pub url: String,
    pub score: i64,
    /// Unix timestamp (seconds).
    pub time: i64,
    #[serde(rename = "descendants")]
    pub descendant_count: i64,
}

impl StoryItem {
    /// Validates a raw item body and converts it into a record.
    ///
    /// Returns `None` when the body is not an object, lacks a required key,
    /// is not of kind `story`, or carries a value of the wrong type.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !is_story_item(value) {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.time, 0)
    }
}

/// The "is a story" predicate: all required keys present and `type == "story"`.
pub fn is_story_item(value: &Value) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };
    if !REQUIRED_FIELDS.iter().all(|key| object.contains_key(*key)) {
        return false;
    }
    object.get("type").and_then(Value::as_str) == Some(STORY_KIND)
}
