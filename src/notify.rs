//! Seam for surfacing task outcomes to the user.
//!
//! The presentation layer (toasts, status lines) lives outside this crate;
//! embedders implement [`TaskNotifier`] and plug it into the coordinator.

use async_trait::async_trait;

use crate::task::TaskId;

/// Receiver for user-visible task notifications.
#[async_trait]
pub trait TaskNotifier: Send + Sync {
    /// The tracked task finished successfully.
    async fn task_completed(&self, task_id: &TaskId);

    /// The tracked task finished with a failure.
    async fn task_failed(&self, task_id: &TaskId);

    /// A file submission did not go through; the selected file is retained so
    /// the user can retry.
    async fn submission_failed(&self, reason: &str);
}

/// Default notifier that renders everything through `tracing`.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl TaskNotifier for LogNotifier {
    async fn task_completed(&self, task_id: &TaskId) {
        tracing::info!(%task_id, "analysis completed");
    }

    async fn task_failed(&self, task_id: &TaskId) {
        tracing::warn!(%task_id, "analysis failed");
    }

    async fn submission_failed(&self, reason: &str) {
        tracing::warn!(reason, "upload failed");
    }
}
