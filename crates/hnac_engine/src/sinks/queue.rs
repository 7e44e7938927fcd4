use hnac_core::{JobContext, QueueSettings, Settings, StoryItem};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use serde::Serialize;
use serde_json::json;

use crate::processor::Processor;
use crate::source::Source;
use crate::ProcessorError;

/// Message-bus sink publishing story documents through the RabbitMQ HTTP API.
///
/// Publishing is fire-and-forget: the broker accepting the request is enough,
/// whether the message was routed to a queue is not checked.
pub struct QueuePublisher {
    settings: QueueSettings,
    client: Option<Client>,
}

#[derive(Serialize)]
struct PublishRequest<'a> {
    properties: PublishProperties,
    routing_key: &'a str,
    payload: String,
    payload_encoding: &'static str,
}

#[derive(Serialize)]
struct PublishProperties {
    content_type: &'static str,
}

impl QueuePublisher {
    pub fn new(settings: QueueSettings) -> Self {
        Self {
            settings,
            client: None,
        }
    }

    /// `{api_url}/api/exchanges/{vhost}/{exchange}/publish`, each name a single
    /// percent-encoded segment (the default vhost is `/`).
    fn publish_url(&self) -> Result<Url, ProcessorError> {
        let mut url = Url::parse(&self.settings.api_url)
            .map_err(|err| ProcessorError::Configuration(format!("queue.api_url: {err}")))?;
        url.path_segments_mut()
            .map_err(|()| {
                ProcessorError::Configuration(format!(
                    "queue.api_url cannot take a path: {}",
                    self.settings.api_url
                ))
            })?
            .pop_if_empty()
            .extend([
                "api",
                "exchanges",
                self.settings.vhost.as_str(),
                self.settings.exchange.as_str(),
                "publish",
            ]);
        Ok(url)
    }
}

/// The document placed on the bus for one story.
pub fn story_message(item: &StoryItem) -> serde_json::Value {
    json!({
        "type": "story",
        "data": item,
    })
}

#[async_trait::async_trait]
impl Processor for QueuePublisher {
    fn name(&self) -> &str {
        "queue"
    }

    fn configure(&mut self, settings: &Settings) -> Result<(), ProcessorError> {
        if settings.queue.routing_key.is_empty() {
            return Err(ProcessorError::Configuration(
                "queue.routing_key must not be empty".to_string(),
            ));
        }
        self.settings = settings.queue.clone();
        self.publish_url()?;
        Ok(())
    }

    async fn job_started(&mut self, _job: &JobContext) -> Result<(), ProcessorError> {
        self.client = Some(Client::new());
        Ok(())
    }

    async fn job_finished(&mut self, _job: &JobContext) -> Result<(), ProcessorError> {
        self.client = None;
        Ok(())
    }

    async fn process_item(
        &mut self,
        _source: &dyn Source,
        item: &StoryItem,
    ) -> Result<(), ProcessorError> {
        let client = self.client.as_ref().ok_or(ProcessorError::NotStarted)?;

        let request = PublishRequest {
            properties: PublishProperties {
                content_type: "application/json",
            },
            routing_key: &self.settings.routing_key,
            payload: story_message(item).to_string(),
            payload_encoding: "string",
        };

        let url = self.publish_url()?;
        let mut builder = client
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(&request)?);
        if let Some(username) = &self.settings.username {
            builder = builder.basic_auth(username, self.settings.password.as_deref());
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(ProcessorError::HttpStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(())
    }
}
