//! Notification subscription lifecycle.
//!
//! The service exposes one server-push stream per task which emits at most one
//! terminal event (`completed` or `failed`). This module owns the client's end
//! of that stream and enforces the single-subscription discipline: at most one
//! channel is ever open, and switching tasks closes the old channel before the
//! new one is established.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest_eventsource::{Event, EventSource};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::client::AnalysisClient;
use crate::task::TaskId;

/// Terminal notification delivered over the push channel.
///
/// The payload is whatever the service attached to the event; it is
/// informational only and is logged, never parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalEvent {
    Completed { payload: String },
    Failed { payload: String },
}

impl TerminalEvent {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Callback invoked when the tracked task reaches a terminal state.
///
/// Delivered at most once per armed task id; re-arming or teardown before the
/// event arrives suppresses delivery entirely.
#[async_trait]
pub trait TerminalObserver: Send + Sync {
    async fn on_terminal(&self, task_id: &TaskId, event: TerminalEvent);
}

struct ActiveSubscription {
    task_id: TaskId,
    generation: u64,
    cancel: CancellationToken,
}

/// Owner of the at-most-one live notification channel.
///
/// All mutation of the (tracked id, channel) pair funnels through [`arm`],
/// [`clear`] and the listener's own terminal path; callers never touch the
/// fields directly.
///
/// [`arm`]: SubscriptionManager::arm
/// [`clear`]: SubscriptionManager::clear
pub struct SubscriptionManager {
    client: AnalysisClient,
    observer: Arc<dyn TerminalObserver>,
    active: Mutex<Option<ActiveSubscription>>,
    generation: AtomicU64,
}

impl SubscriptionManager {
    pub fn new(client: AnalysisClient, observer: Arc<dyn TerminalObserver>) -> Arc<Self> {
        Arc::new(Self {
            client,
            observer,
            active: Mutex::new(None),
            generation: AtomicU64::new(0),
        })
    }

    /// Begin listening for the terminal event of `task_id`.
    ///
    /// Any previous subscription is cancelled under the same lock hold, so
    /// from the caller's perspective replacement is atomic: there is no window
    /// with two live channels.
    pub async fn arm(self: &Arc<Self>, task_id: TaskId) {
        let cancel = CancellationToken::new();
        let generation;

        {
            let mut active = self.active.lock().await;
            // Taken under the lock so commit order always matches generation
            // order, even for overlapping arm calls.
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(prev) = active.take() {
                tracing::debug!(task_id = %prev.task_id, "replacing notification subscription");
                prev.cancel.cancel();
            }
            *active = Some(ActiveSubscription {
                task_id: task_id.clone(),
                generation,
                cancel: cancel.clone(),
            });
        }

        let manager = Arc::clone(self);
        tokio::spawn(async move {
            manager.listen(task_id, generation, cancel).await;
        });
    }

    /// Tear down any live subscription without notifying anyone.
    pub async fn clear(&self) {
        let mut active = self.active.lock().await;
        if let Some(prev) = active.take() {
            tracing::debug!(task_id = %prev.task_id, "notification subscription cleared");
            prev.cancel.cancel();
        }
    }

    /// The task id currently being tracked, if any.
    pub async fn tracked_task(&self) -> Option<TaskId> {
        self.active.lock().await.as_ref().map(|s| s.task_id.clone())
    }

    async fn listen(
        self: Arc<Self>,
        task_id: TaskId,
        generation: u64,
        cancel: CancellationToken,
    ) {
        let url = self.client.notification_url(&task_id);
        let source = EventSource::new(self.client.http().get(&url))
            .context("failed to open notification stream");
        let mut source = match source {
            Ok(source) => source,
            Err(err) => {
                tracing::error!(%task_id, "{:#}", err);
                return;
            }
        };

        tracing::debug!(%task_id, "notification subscription opened");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    source.close();
                    tracing::debug!(%task_id, "notification subscription closed");
                    return;
                }
                next = source.next() => match next {
                    Some(Ok(Event::Open)) => {
                        tracing::debug!(%task_id, "notification stream connected");
                    }
                    Some(Ok(Event::Message(msg))) => {
                        let event = match msg.event.as_str() {
                            "completed" => TerminalEvent::Completed { payload: msg.data },
                            "failed" => TerminalEvent::Failed { payload: msg.data },
                            other => {
                                tracing::debug!(%task_id, event = other, "ignoring non-terminal event");
                                continue;
                            }
                        };
                        // Close before dispatch: once a terminal event is
                        // consumed, nothing later on this channel counts.
                        source.close();
                        self.finish(&task_id, generation, event).await;
                        return;
                    }
                    Some(Err(err)) => {
                        // Known gap: no reconnection. The channel is closed to
                        // avoid leakage and the task's true status stays
                        // unknown until the user re-opens the detail view.
                        tracing::warn!(%task_id, "subscription ended without resolution: {}", err);
                        source.close();
                        return;
                    }
                    None => {
                        tracing::warn!(%task_id, "subscription ended without resolution: stream exhausted");
                        return;
                    }
                }
            }
        }
    }

    /// Consume a terminal event, resetting the tracked id if this listener is
    /// still the current one. Stale listeners (superseded or cleared) find a
    /// different generation and deliver nothing.
    async fn finish(&self, task_id: &TaskId, generation: u64, event: TerminalEvent) {
        let current = {
            let mut active = self.active.lock().await;
            let is_current = active
                .as_ref()
                .map(|sub| sub.generation == generation)
                .unwrap_or(false);
            if is_current {
                active.take();
            }
            is_current
        };

        if !current {
            tracing::debug!(%task_id, "dropping terminal event from stale subscription");
            return;
        }

        tracing::info!(%task_id, completed = event.is_completed(), "terminal event received");
        self.observer.on_terminal(task_id, event).await;
    }
}
