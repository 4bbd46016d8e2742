//! Shared test harness: an in-process mock of the analysis service.
//!
//! The mock speaks the same HTTP surface as the real service (multipart
//! upload, task list, result fetch, per-task SSE notification stream) and
//! lets tests drive task resolution and observe how many notification
//! streams are open at once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::sync::broadcast;

use advisor_client::{TaskId, TaskNotifier};

/// Mutable state behind the mock service.
pub struct MockService {
    tasks: Mutex<Vec<serde_json::Value>>,
    results: Mutex<HashMap<String, serde_json::Value>>,
    next_id: AtomicUsize,
    /// When set, uploads return 500 without creating a task.
    pub fail_uploads: AtomicBool,
    /// When set, the SSE stream emits the terminal event twice in a row.
    pub duplicate_terminal: AtomicBool,
    /// Notification streams currently held open by clients.
    pub open_streams: Arc<AtomicUsize>,
    events: broadcast::Sender<(String, String)>,
}

impl MockService {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(32);
        Arc::new(Self {
            tasks: Mutex::new(Vec::new()),
            results: Mutex::new(HashMap::new()),
            next_id: AtomicUsize::new(1),
            fail_uploads: AtomicBool::new(false),
            duplicate_terminal: AtomicBool::new(false),
            open_streams: Arc::new(AtomicUsize::new(0)),
            events,
        })
    }

    pub fn task_count(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    /// Mark a task completed with the given score and push the SSE event.
    pub fn complete_task(&self, task_id: &str, score: f64) {
        self.set_status(task_id, "completed");
        self.results.lock().unwrap().insert(
            task_id.to_string(),
            json!({
                "score": score,
                "recommendations": ["Use parameterized queries", "Pin dependency versions"]
            }),
        );
        let _ = self.events.send((task_id.to_string(), "completed".to_string()));
    }

    /// Mark a task failed and push the SSE event.
    pub fn fail_task(&self, task_id: &str) {
        self.set_status(task_id, "failed");
        let _ = self.events.send((task_id.to_string(), "failed".to_string()));
    }

    /// Push a terminal event without touching task state. Used to simulate
    /// late events for already-closed subscriptions.
    pub fn push_event(&self, task_id: &str, event: &str) {
        let _ = self.events.send((task_id.to_string(), event.to_string()));
    }

    fn set_status(&self, task_id: &str, status: &str) {
        let mut tasks = self.tasks.lock().unwrap();
        for task in tasks.iter_mut() {
            if task["id"] == task_id {
                task["status"] = json!(status);
                task["updated_at"] = json!(now());
            }
        }
    }
}

fn now() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

async fn analyze(
    State(state): State<Arc<MockService>>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    if state.fail_uploads.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": "Error processing file"})),
        );
    }

    let mut filename = String::from("unknown");
    while let Some(field) = multipart.next_field().await.unwrap() {
        if field.name() == Some("file") {
            if let Some(name) = field.file_name() {
                filename = name.to_string();
            }
            let _ = field.bytes().await.unwrap();
        }
    }

    let id = format!("t{}", state.next_id.fetch_add(1, Ordering::SeqCst));
    state.tasks.lock().unwrap().push(json!({
        "id": id,
        "filename": filename,
        "status": "pending",
        "created_at": now(),
        "updated_at": now(),
    }));

    (
        StatusCode::OK,
        Json(json!({
            "status": "processing",
            "task_id": id,
            "filename": filename,
            "message": "File uploaded and analysis started"
        })),
    )
}

async fn list_tasks(State(state): State<Arc<MockService>>) -> Json<serde_json::Value> {
    let tasks = state.tasks.lock().unwrap().clone();
    Json(json!({ "items": tasks }))
}

async fn get_result(
    State(state): State<Arc<MockService>>,
    Path(task_id): Path<String>,
) -> impl IntoResponse {
    let task = state
        .tasks
        .lock()
        .unwrap()
        .iter()
        .find(|t| t["id"] == task_id.as_str())
        .cloned();

    match task {
        Some(mut task) => {
            if let Some(result) = state.results.lock().unwrap().get(&task_id) {
                task["result"] = result.clone();
            }
            (StatusCode::OK, Json(task))
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"detail": "Task not found"})),
        ),
    }
}

struct StreamGuard(Arc<AtomicUsize>);

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn notifications(
    State(state): State<Arc<MockService>>,
    Path(task_id): Path<String>,
) -> impl IntoResponse {
    let mut rx = state.events.subscribe();
    state.open_streams.fetch_add(1, Ordering::SeqCst);
    let guard = StreamGuard(state.open_streams.clone());
    let duplicate = state.duplicate_terminal.load(Ordering::SeqCst);

    let stream = async_stream::stream! {
        let _guard = guard;
        loop {
            match rx.recv().await {
                Ok((id, event)) if id == task_id => {
                    let data = json!({ "task_id": id }).to_string();
                    yield Ok::<_, std::convert::Infallible>(
                        Event::default().event(event.clone()).data(data.clone()),
                    );
                    if duplicate {
                        yield Ok(Event::default().event(event).data(data));
                    }
                    break;
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream)
}

/// Start the mock service on an ephemeral port, returning its base URL.
pub async fn spawn_mock(state: Arc<MockService>) -> String {
    let app = Router::new()
        .route("/analyze", post(analyze))
        .route("/analyze/tasks", get(list_tasks))
        .route("/analyze/results/:task_id", get(get_result))
        .route("/notification/tasks/:task_id", get(notifications))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Notifier that records every user-visible notification.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskNotifier for RecordingNotifier {
    async fn task_completed(&self, task_id: &TaskId) {
        self.events.lock().unwrap().push(format!("completed:{}", task_id));
    }

    async fn task_failed(&self, task_id: &TaskId) {
        self.events.lock().unwrap().push(format!("failed:{}", task_id));
    }

    async fn submission_failed(&self, reason: &str) {
        self.events.lock().unwrap().push(format!("submission_failed:{}", reason));
    }
}

/// Poll until `predicate` holds or the timeout elapses.
pub async fn wait_until<F>(mut predicate: F, what: &str)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if predicate() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    panic!("timed out waiting for {}", what);
}
