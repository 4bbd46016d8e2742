//! In-memory snapshot of the service's task list.

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::client::{AnalysisClient, ClientError};
use crate::task::{Task, TaskId};

/// Holds the last task list fetched from the service.
///
/// The list is a snapshot: tasks are mutated only by the service, so entries
/// here may be stale until the next refresh. Order is the service's order and
/// is never re-sorted locally.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: RwLock<Vec<Task>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot with the service's current task list.
    ///
    /// On failure the previous snapshot is kept, so a flaky refresh never
    /// blanks the user's view.
    pub async fn refresh(&self, client: &AnalysisClient) -> Result<(), ClientError> {
        let items = client.list_tasks().await?;
        tracing::debug!(count = items.len(), "task list refreshed");
        *self.tasks.write().await = items;
        Ok(())
    }

    /// Clone out the current snapshot.
    pub async fn tasks(&self) -> Vec<Task> {
        self.tasks.read().await.clone()
    }

    /// Look up one task in the snapshot.
    pub async fn get(&self, task_id: &TaskId) -> Option<Task> {
        self.tasks
            .read()
            .await
            .iter()
            .find(|t| &t.id == task_id)
            .cloned()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }
}

/// Shared registry handle.
pub type SharedTaskRegistry = Arc<TaskRegistry>;
