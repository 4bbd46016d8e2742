//! Top-level submit orchestration.
//!
//! The coordinator drives the "submit file → obtain task id → arm the
//! subscription → refresh the registry" path and holds the small amount of
//! view state the original surface needs: the selected file, the uploading
//! guard, the transient upload-succeeded flag and the currently open task
//! detail.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::client::{AnalysisClient, ClientError};
use crate::config::Config;
use crate::notify::TaskNotifier;
use crate::registry::TaskRegistry;
use crate::subscription::{SubscriptionManager, TerminalEvent, TerminalObserver};
use crate::task::{TaskDetail, TaskId};

/// How long the upload-succeeded flag stays visible.
const SUCCESS_FLAG_TTL: Duration = Duration::from_secs(3);

/// Submission failure. Fetch and channel problems never surface here; the
/// upload call is the only step that can fail a submission.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("upload failed: {0}")]
    Upload(#[from] ClientError),
}

/// A file staged for submission.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct UploadState {
    selected: Option<SelectedFile>,
    uploading: bool,
    upload_succeeded: bool,
}

#[derive(Debug, Default)]
struct DetailState {
    selected: Option<TaskId>,
    detail: Option<TaskDetail>,
}

/// The currently open task detail view.
///
/// Shared between the coordinator (user-driven opens) and the terminal
/// observer, which re-fetches the view when the tracked task resolves while
/// it is the one on screen.
#[derive(Debug, Default)]
pub struct DetailPane {
    state: RwLock<DetailState>,
}

impl DetailPane {
    pub async fn selected(&self) -> Option<TaskId> {
        self.state.read().await.selected.clone()
    }

    pub async fn detail(&self) -> Option<TaskDetail> {
        self.state.read().await.detail.clone()
    }

    async fn open(&self, client: &AnalysisClient, task_id: &TaskId) -> Result<(), ClientError> {
        {
            let mut state = self.state.write().await;
            state.selected = Some(task_id.clone());
            state.detail = None;
        }
        let detail = client.fetch_result(task_id).await?;
        let mut state = self.state.write().await;
        // A stale response must not clobber a newer selection.
        if state.selected.as_ref() == Some(task_id) {
            state.detail = Some(detail);
        }
        Ok(())
    }

    async fn refresh_if_selected(&self, client: &AnalysisClient, task_id: &TaskId) {
        if self.selected().await.as_ref() != Some(task_id) {
            return;
        }
        match client.fetch_result(task_id).await {
            Ok(detail) => {
                let mut state = self.state.write().await;
                if state.selected.as_ref() == Some(task_id) {
                    state.detail = Some(detail);
                }
            }
            Err(err) => {
                tracing::warn!(%task_id, "detail refresh after terminal event failed: {}", err)
            }
        }
    }
}

/// Reaction to terminal push events: notify the user, refresh the task list,
/// and re-fetch the open detail view when it shows the resolved task.
struct TrackerObserver {
    client: AnalysisClient,
    registry: Arc<TaskRegistry>,
    detail: Arc<DetailPane>,
    notifier: Arc<dyn TaskNotifier>,
}

#[async_trait]
impl TerminalObserver for TrackerObserver {
    async fn on_terminal(&self, task_id: &TaskId, event: TerminalEvent) {
        match event {
            TerminalEvent::Completed { payload } => {
                tracing::debug!(%task_id, payload, "completed event payload");
                self.notifier.task_completed(task_id).await;
            }
            TerminalEvent::Failed { payload } => {
                tracing::debug!(%task_id, payload, "failed event payload");
                self.notifier.task_failed(task_id).await;
            }
        }

        if let Err(err) = self.registry.refresh(&self.client).await {
            tracing::warn!("task list refresh after terminal event failed: {}", err);
        }
        self.detail.refresh_if_selected(&self.client, task_id).await;
    }
}

/// Orchestrates submissions and owns the session's view state.
pub struct SubmissionCoordinator {
    client: AnalysisClient,
    registry: Arc<TaskRegistry>,
    subscriptions: Arc<SubscriptionManager>,
    detail: Arc<DetailPane>,
    notifier: Arc<dyn TaskNotifier>,
    upload: Mutex<UploadState>,
    success_timer: Mutex<Option<CancellationToken>>,
}

impl SubmissionCoordinator {
    pub fn new(config: Config, notifier: Arc<dyn TaskNotifier>) -> Arc<Self> {
        let client = AnalysisClient::new(&config.base_url);
        let registry = Arc::new(TaskRegistry::new());
        let detail = Arc::new(DetailPane::default());
        let observer = Arc::new(TrackerObserver {
            client: client.clone(),
            registry: registry.clone(),
            detail: detail.clone(),
            notifier: notifier.clone(),
        });
        let subscriptions = SubscriptionManager::new(client.clone(), observer);

        Arc::new(Self {
            client,
            registry,
            subscriptions,
            detail,
            notifier,
            upload: Mutex::new(UploadState::default()),
            success_timer: Mutex::new(None),
        })
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    pub fn subscriptions(&self) -> &Arc<SubscriptionManager> {
        &self.subscriptions
    }

    pub fn detail_pane(&self) -> &Arc<DetailPane> {
        &self.detail
    }

    pub fn client(&self) -> &AnalysisClient {
        &self.client
    }

    /// Stage a file for the next submission.
    pub async fn select_file(&self, filename: impl Into<String>, bytes: Vec<u8>) {
        let mut upload = self.upload.lock().await;
        upload.selected = Some(SelectedFile {
            filename: filename.into(),
            bytes,
        });
    }

    pub async fn selected_file(&self) -> Option<SelectedFile> {
        self.upload.lock().await.selected.clone()
    }

    /// Whether an upload is currently in flight.
    pub async fn is_uploading(&self) -> bool {
        self.upload.lock().await.uploading
    }

    /// Whether the transient upload-succeeded flag is set.
    pub async fn upload_succeeded(&self) -> bool {
        self.upload.lock().await.upload_succeeded
    }

    /// Submit the staged file for analysis.
    ///
    /// Returns `Ok(None)` when there is nothing to do: no file staged, or an
    /// upload already in flight (re-entrant calls are no-ops). On success the
    /// staged file is cleared, the subscription is armed on the new task id
    /// and the registry is refreshed. On failure the staged file is retained
    /// so the user can retry, and nothing is armed or registered.
    pub async fn submit(self: &Arc<Self>) -> Result<Option<TaskId>, SubmitError> {
        let file = {
            let mut upload = self.upload.lock().await;
            if upload.uploading {
                return Ok(None);
            }
            let Some(file) = upload.selected.clone() else {
                return Ok(None);
            };
            upload.uploading = true;
            upload.upload_succeeded = false;
            file
        };

        let outcome = self.client.submit_file(&file.filename, file.bytes).await;

        match outcome {
            Ok(receipt) => {
                {
                    let mut upload = self.upload.lock().await;
                    upload.uploading = false;
                    upload.upload_succeeded = true;
                    upload.selected = None;
                }

                let task_id = receipt.task_id;
                self.subscriptions.arm(task_id.clone()).await;

                // List refresh and channel arm are independent; a refresh
                // failure after a successful upload is not a submit failure.
                if let Err(err) = self.registry.refresh(&self.client).await {
                    tracing::warn!("task list refresh after submit failed: {}", err);
                }

                self.schedule_success_reset().await;
                Ok(Some(task_id))
            }
            Err(err) => {
                self.upload.lock().await.uploading = false;
                self.notifier.submission_failed(&err.to_string()).await;
                Err(SubmitError::Upload(err))
            }
        }
    }

    /// Open one task's detail view, fetching its current record.
    ///
    /// The record is a snapshot: a task inspected while `pending` stays stale
    /// until re-opened or until its terminal event triggers a refresh.
    pub async fn open_task(&self, task_id: &TaskId) -> Result<TaskDetail, ClientError> {
        self.detail.open(&self.client, task_id).await?;
        // A concurrent open may have replaced the selection in the meantime;
        // only hand back the stored detail if it is ours.
        match self.detail.detail().await {
            Some(detail) if &detail.id == task_id => Ok(detail),
            _ => self.client.fetch_result(task_id).await,
        }
    }

    /// Initial task list load for a fresh session.
    pub async fn load_tasks(&self) -> Result<(), ClientError> {
        self.registry.refresh(&self.client).await
    }

    /// Tear down the session: close any open subscription and cancel the
    /// pending success-flag timer.
    pub async fn shutdown(&self) {
        self.subscriptions.clear().await;
        if let Some(timer) = self.success_timer.lock().await.take() {
            timer.cancel();
        }
    }

    /// Clear the upload-succeeded flag after a fixed delay, without blocking
    /// interaction. A superseding submission or teardown cancels the timer so
    /// it never fires against newer state.
    async fn schedule_success_reset(self: &Arc<Self>) {
        let cancel = CancellationToken::new();
        {
            let mut timer = self.success_timer.lock().await;
            if let Some(prev) = timer.replace(cancel.clone()) {
                prev.cancel();
            }
        }

        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(SUCCESS_FLAG_TTL) => {
                    coordinator.upload.lock().await.upload_succeeded = false;
                }
            }
        });
    }
}
