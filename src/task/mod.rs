//! Task module - analysis task records and score derivation.
//!
//! - All status transitions happen on the service; the client only holds
//!   snapshots that may be stale until re-fetched
//! - Score derivations are pure functions, computed on render and never stored

pub mod score;
mod types;

pub use score::{complexity, format_timestamp, grade, Complexity, Grade};
pub use types::{AnalysisReport, Task, TaskDetail, TaskId, TaskStatus};
