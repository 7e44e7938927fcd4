use hnac_core::{CouchDbSettings, JobContext, Settings, StoryItem};
use hnac_logging::{hnac_debug, hnac_info};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;

use crate::processor::Processor;
use crate::source::Source;
use crate::ProcessorError;

/// Document-store sink: one CouchDB document per story, id = item id.
pub struct CouchDbStorage {
    settings: CouchDbSettings,
    client: Option<Client>,
}

impl CouchDbStorage {
    pub fn new(settings: CouchDbSettings) -> Self {
        Self {
            settings,
            client: None,
        }
    }

    fn database_url(&self) -> String {
        format!(
            "{}/{}",
            self.settings.server.trim_end_matches('/'),
            self.settings.database
        )
    }

    fn document_url(&self, id: u64) -> String {
        format!("{}/{}", self.database_url(), id)
    }

    async fn ensure_database(&self, client: &Client) -> Result<(), ProcessorError> {
        let url = self.database_url();
        let response = client.put(&url).send().await?;
        match response.status() {
            StatusCode::CREATED | StatusCode::ACCEPTED => {
                hnac_info!("Created CouchDB database {}", self.settings.database);
                Ok(())
            }
            StatusCode::PRECONDITION_FAILED => Ok(()),
            _ => Err(unexpected_status(&response, &url)),
        }
    }

    async fn current_revision(
        &self,
        client: &Client,
        id: u64,
    ) -> Result<Option<String>, ProcessorError> {
        let url = self.document_url(id);
        let response = client.get(&url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let document: Value = serde_json::from_slice(&response.bytes().await?)?;
                Ok(document
                    .get("_rev")
                    .and_then(Value::as_str)
                    .map(str::to_string))
            }
            _ => Err(unexpected_status(&response, &url)),
        }
    }
}

#[async_trait::async_trait]
impl Processor for CouchDbStorage {
    fn name(&self) -> &str {
        "couchdb"
    }

    fn configure(&mut self, settings: &Settings) -> Result<(), ProcessorError> {
        reqwest::Url::parse(&settings.couchdb.server).map_err(|err| {
            ProcessorError::Configuration(format!("couchdb.server: {err}"))
        })?;
        if settings.couchdb.database.is_empty() {
            return Err(ProcessorError::Configuration(
                "couchdb.database must not be empty".to_string(),
            ));
        }
        self.settings = settings.couchdb.clone();
        Ok(())
    }

    async fn job_started(&mut self, _job: &JobContext) -> Result<(), ProcessorError> {
        let client = Client::new();
        self.ensure_database(&client).await?;
        self.client = Some(client);
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

        let mut document = serde_json::to_value(item)?;
        if let Some(rev) = self.current_revision(client, item.id).await? {
            hnac_debug!("Updating CouchDB document {} at rev {}", item.id, rev);
            document["_rev"] = Value::String(rev);
        }

        let url = self.document_url(item.id);
        let response = client
            .put(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(&document)?)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(unexpected_status(&response, &url));
        }
        Ok(())
    }
}

fn unexpected_status(response: &Response, url: &str) -> ProcessorError {
    ProcessorError::HttpStatus {
        status: response.status().as_u16(),
        url: url.to_string(),
    }
}
