//! # Advisor Client
//!
//! Client-side tracker for an asynchronous source-code security analysis
//! service.
//!
//! This library provides:
//! - An HTTP client for file submission, task listing and result retrieval
//! - A single-slot subscription manager for per-task server-push notifications
//! - Pure derivation rules turning a numeric score into display judgments
//!
//! ## Task Flow
//! 1. Submit a source file, obtain a task id
//! 2. Arm the notification subscription on that id
//! 3. Refresh the local task registry
//! 4. React to the terminal `completed`/`failed` push event exactly once
//! 5. Fetch the analysis result on demand
//!
//! ## Modules
//! - `client`: HTTP service boundary (upload, list, result fetch)
//! - `subscription`: lifecycle of the at-most-one notification channel
//! - `coordinator`: top-level submit orchestration and view state
//! - `registry`: in-memory snapshot of the service's task list
//! - `task`: task and analysis result types plus score derivation rules
//! - `notify`: seam for surfacing task outcomes to the user

pub mod client;
pub mod config;
pub mod coordinator;
pub mod notify;
pub mod registry;
pub mod subscription;
pub mod task;

pub use client::{AnalysisClient, ClientError, SubmitReceipt};
pub use config::Config;
pub use coordinator::{DetailPane, SelectedFile, SubmissionCoordinator, SubmitError};
pub use notify::{LogNotifier, TaskNotifier};
pub use registry::TaskRegistry;
pub use subscription::{SubscriptionManager, TerminalEvent, TerminalObserver};
pub use task::{Task, TaskDetail, TaskId, TaskStatus};
