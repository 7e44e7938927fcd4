use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing and retry parameters of the story source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceSettings {
    /// Minimum time between two outbound requests.
    pub poll_interval_seconds: f64,
    /// Fixed delay between retry attempts of one operation.
    pub backoff_seconds: f64,
    /// Retries allowed before an operation is abandoned.
    pub max_retry_attempts: u32,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 1.0,
            backoff_seconds: 5.0,
            max_retry_attempts: 3,
        }
    }
}

impl SourceSettings {
    /// Applies the keys present in `overrides`; absent keys keep their current value.
    pub fn apply(&mut self, overrides: &SourceOverrides) {
        if let Some(value) = overrides.poll_interval_seconds {
            self.poll_interval_seconds = value;
        }
        if let Some(value) = overrides.backoff_seconds {
            self.backoff_seconds = value;
        }
        if let Some(value) = overrides.max_retry_attempts {
            self.max_retry_attempts = value;
        }
    }

    pub fn poll_interval(&self) -> Duration {
        seconds(self.poll_interval_seconds)
    }

    pub fn backoff(&self) -> Duration {
        seconds(self.backoff_seconds)
    }
}

/// The `source` section of the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceOverrides {
    pub poll_interval_seconds: Option<f64>,
    pub backoff_seconds: Option<f64>,
    pub max_retry_attempts: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub connect_timeout_seconds: f64,
    pub request_timeout_seconds: f64,
    pub max_bytes: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://hacker-news.firebaseio.com".to_string(),
            connect_timeout_seconds: 10.0,
            request_timeout_seconds: 30.0,
            max_bytes: 1024 * 1024,
        }
    }
}

impl ApiSettings {
    pub fn connect_timeout(&self) -> Duration {
        seconds(self.connect_timeout_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        seconds(self.request_timeout_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("hnac_stories.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CouchDbSettings {
    pub server: String,
    pub database: String,
}

impl Default for CouchDbSettings {
    fn default() -> Self {
        Self {
            server: "http://localhost:5984".to_string(),
            database: "hnac".to_string(),
        }
    }
}

/// RabbitMQ HTTP publishing target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    pub api_url: String,
    pub vhost: String,
    pub exchange: String,
    pub routing_key: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:15672".to_string(),
            vhost: "/".to_string(),
            exchange: "amq.default".to_string(),
            routing_key: "stories".to_string(),
            username: None,
            password: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub path: PathBuf,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("hnac_reports.jsonl"),
        }
    }
}

/// Destination for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogDestination {
    /// Write to the configured log file.
    File,
    /// Write to terminal (stdout).
    #[default]
    Terminal,
    /// Write to both file and terminal.
    Both,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub file: PathBuf,
    pub destination: LogDestination,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: PathBuf::from("hnac_crawler.log"),
            destination: LogDestination::default(),
        }
    }
}

/// Whole crawler configuration. Every section is optional in the file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub source: SourceOverrides,
    pub api: ApiSettings,
    /// Enabled sink names, in dispatch order.
    pub processors: Vec<String>,
    pub storage: StorageSettings,
    pub couchdb: CouchDbSettings,
    pub queue: QueueSettings,
    pub reports: ReportSettings,
    pub logging: LoggingSettings,
}

// Negative and non-finite values mean "no delay".
fn seconds(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}
