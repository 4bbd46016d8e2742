//! HTTP client for the analysis service.
//!
//! Covers the whole service boundary: file submission, task listing and
//! per-task result retrieval. Every call reflects the service's truth at call
//! time; there is no caching and no automatic retry.

use serde::Deserialize;
use thiserror::Error;

use crate::task::{Task, TaskDetail, TaskId};

/// Failure of a single service call.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to analysis service failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("analysis service returned {status}: {body}")]
    Http {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to decode analysis service response: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Acknowledgement returned when a file submission is accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitReceipt {
    pub task_id: TaskId,
    /// Original filename echoed back by the service.
    #[serde(default)]
    pub filename: Option<String>,
    /// Human-readable status line, informational only.
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TaskListResponse {
    items: Vec<Task>,
}

/// Client for the analysis service HTTP API.
#[derive(Debug, Clone)]
pub struct AnalysisClient {
    base_url: String,
    client: reqwest::Client,
}

impl AnalysisClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The underlying HTTP client, shared with the subscription manager so
    /// connection pools are reused.
    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.client
    }

    /// URL of the server-push notification stream for one task.
    pub fn notification_url(&self, task_id: &TaskId) -> String {
        format!(
            "{}/notification/tasks/{}",
            self.base_url,
            urlencoding::encode(task_id.as_str())
        )
    }

    /// Upload a source file for analysis.
    ///
    /// Returns the service's receipt with the new task id. Non-2xx responses
    /// and transport errors surface as [`ClientError`]; nothing is retried.
    pub async fn submit_file(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<SubmitReceipt, ClientError> {
        let url = format!("{}/analyze", self.base_url);
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = self.client.post(&url).multipart(form).send().await?;
        let receipt: SubmitReceipt = Self::read_json(resp).await?;
        tracing::info!(task_id = %receipt.task_id, filename, "file submitted for analysis");
        Ok(receipt)
    }

    /// Fetch the current task list, in the service's order.
    pub async fn list_tasks(&self) -> Result<Vec<Task>, ClientError> {
        let url = format!("{}/analyze/tasks", self.base_url);
        let resp = self.client.get(&url).send().await?;
        let list: TaskListResponse = Self::read_json(resp).await?;
        Ok(list.items)
    }

    /// Fetch the full record for one task, including the analysis report once
    /// the task has completed.
    pub async fn fetch_result(&self, task_id: &TaskId) -> Result<TaskDetail, ClientError> {
        let url = format!(
            "{}/analyze/results/{}",
            self.base_url,
            urlencoding::encode(task_id.as_str())
        );
        let resp = self.client.get(&url).send().await?;
        Self::read_json(resp).await
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ClientError::Http { status, body });
        }
        serde_json::from_str(&body).map_err(ClientError::Decode)
    }
}
