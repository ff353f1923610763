//! HTTP data service for the task API.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::types::{NewTask, Stats, Task, TaskFilter, TaskPatch};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Api { status: StatusCode, message: String },

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Api { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

/// Operations the controller needs from the task API.
#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, ClientError>;
    async fn stats(&self) -> Result<Stats, ClientError>;
    async fn create_task(&self, input: &NewTask) -> Result<Task, ClientError>;
    async fn update_task(&self, task_id: &str, patch: &TaskPatch) -> Result<Task, ClientError>;
    async fn delete_task(&self, task_id: &str) -> Result<Task, ClientError>;
}

/// reqwest-backed implementation of [`TaskApi`].
#[derive(Debug, Clone)]
pub struct TaskService {
    client: Client,
    base_url: String,
}

impl TaskService {
    /// `base_url` is the task collection URL, e.g. `http://localhost:3500/api/tasks`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn task_url(&self, task_id: &str) -> String {
        format!("{}/{}", self.base_url, task_id)
    }

    pub async fn get_task(&self, task_id: &str) -> Result<Task, ClientError> {
        let response = self.client.get(self.task_url(task_id)).send().await?;
        read_json(response).await
    }
}

/// Decode a success body, or turn an error body into [`ClientError::Api`].
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
            .unwrap_or(body);
        return Err(ClientError::Api { status, message });
    }
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
}

#[async_trait]
impl TaskApi for TaskService {
    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, ClientError> {
        let query = filter.to_query_pairs();
        debug!(url = %self.base_url, ?query, "GET tasks");
        let response = self.client.get(&self.base_url).query(&query).send().await?;
        read_json(response).await
    }

    async fn stats(&self) -> Result<Stats, ClientError> {
        let response = self
            .client
            .get(format!("{}/stats", self.base_url))
            .send()
            .await?;
        read_json(response).await
    }

    async fn create_task(&self, input: &NewTask) -> Result<Task, ClientError> {
        let response = self.client.post(&self.base_url).json(input).send().await?;
        read_json(response).await
    }

    async fn update_task(&self, task_id: &str, patch: &TaskPatch) -> Result<Task, ClientError> {
        let response = self
            .client
            .put(self.task_url(task_id))
            .json(patch)
            .send()
            .await?;
        read_json(response).await
    }

    async fn delete_task(&self, task_id: &str) -> Result<Task, ClientError> {
        let response = self.client.delete(self.task_url(task_id)).send().await?;
        read_json(response).await
    }
}
