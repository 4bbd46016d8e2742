//! Types for analysis tasks as the service reports them.

use serde::{Deserialize, Serialize};

/// Opaque task identifier assigned by the analysis service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Lifecycle status of an analysis task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Whether the task has reached a final state. A terminal task will never
    /// change again on the service side.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One analysis task as listed by the service.
///
/// Mutated only by the service; the client's copy is a snapshot taken at
/// fetch time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub filename: String,
    pub status: TaskStatus,
    /// ISO-8601 timestamp string, kept as the service sent it.
    pub created_at: String,
    pub updated_at: String,
}

/// Analysis payload attached to a completed task.
///
/// A `pending` task has no report; a `failed` task carries status only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Maintainability/security score in [0, 100].
    pub score: f64,
    /// Human-readable recommendations, in the service's order.
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// Full per-task record returned by the result endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDetail {
    pub id: TaskId,
    pub filename: String,
    pub status: TaskStatus,
    pub created_at: String,
    pub updated_at: String,
    /// Present only when `status` is `completed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisReport>,
}
