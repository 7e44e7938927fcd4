use std::time::Duration;

use futures_util::StreamExt;
use hnac_core::ApiSettings;
use serde_json::Value;

use crate::{FailureKind, FetchError};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self::from(&ApiSettings::default())
    }
}

impl From<&ApiSettings> for FetchSettings {
    fn from(api: &ApiSettings) -> Self {
        Self {
            base_url: api.base_url.clone(),
            connect_timeout: api.connect_timeout(),
            request_timeout: api.request_timeout(),
            max_bytes: api.max_bytes,
        }
    }
}

/// Read-only view of the Hacker News API.
#[async_trait::async_trait]
pub trait HackernewsApi: Send + Sync {
    /// Ids of the newest stories, in the order the API lists them.
    async fn new_story_ids(&self) -> Result<Vec<u64>, FetchError>;

    /// Raw item body. Unknown ids come back as `Value::Null`.
    async fn item(&self, id: u64) -> Result<Value, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestApi {
    base_url: reqwest::Url,
    max_bytes: u64,
    client: reqwest::Client,
}

impl ReqwestApi {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let mut base_url = reqwest::Url::parse(&settings.base_url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self {
            base_url,
            max_bytes: settings.max_bytes,
            client,
        })
    }

    async fn get_json(&self, path: &str) -> Result<Value, FetchError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;

        let response = self.client.get(url).send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }

        serde_json::from_slice(&bytes)
            .map_err(|err| FetchError::new(FailureKind::Decode, err.to_string()))
    }
}

#[async_trait::async_trait]
impl HackernewsApi for ReqwestApi {
    async fn new_story_ids(&self) -> Result<Vec<u64>, FetchError> {
        let body = self.get_json("v0/newstories.json").await?;
        serde_json::from_value(body)
            .map_err(|err| FetchError::new(FailureKind::Decode, err.to_string()))
    }

    async fn item(&self, id: u64) -> Result<Value, FetchError> {
        self.get_json(&format!("v0/item/{id}.json")).await
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return FetchError::new(FailureKind::Decode, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
