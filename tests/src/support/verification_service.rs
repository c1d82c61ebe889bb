//! In-process stand-in for the remote verification service.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Canned answer for one host.
#[derive(Debug, Clone, Copy)]
enum Answer {
    Code(i64),
    Status(u16),
    Slow(Duration, i64),
}

#[derive(Default)]
struct ServiceState {
    answers: HashMap<String, Answer>,
    requests: Mutex<HashMap<String, usize>>,
}

/// `GET /bleed/{host}` answering `{"code": N}` from a table. Unknown hosts
/// get HTTP 404.
pub struct FakeVerificationService {
    base_url: String,
    state: Arc<ServiceState>,
    task: JoinHandle<()>,
}

/// Builder for [`FakeVerificationService`].
#[derive(Default)]
pub struct FakeVerificationServiceBuilder {
    answers: HashMap<String, Answer>,
}

impl FakeVerificationServiceBuilder {
    /// `host` is reported safe (`code` 1).
    pub fn safe(mut self, host: &str) -> Self {
        self.answers.insert(host.to_string(), Answer::Code(1));
        self
    }

    /// `host` is reported unsafe (`code` 0).
    pub fn vulnerable(mut self, host: &str) -> Self {
        self.answers.insert(host.to_string(), Answer::Code(0));
        self
    }

    /// Requests for `host` fail with HTTP `status`.
    pub fn status(mut self, host: &str, status: u16) -> Self {
        self.answers.insert(host.to_string(), Answer::Status(status));
        self
    }

    /// `host` is answered with `code` after `delay`.
    pub fn slow(mut self, host: &str, delay: Duration, code: i64) -> Self {
        self.answers.insert(host.to_string(), Answer::Slow(delay, code));
        self
    }

    pub async fn start(self) -> io::Result<FakeVerificationService> {
        let state = Arc::new(ServiceState {
            answers: self.answers,
            requests: Mutex::new(HashMap::new()),
        });
        let app = Router::new()
            .route("/bleed/:host", get(verdict))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(FakeVerificationService {
            base_url: format!("http://{addr}/bleed/"),
            state,
            task,
        })
    }
}

impl FakeVerificationService {
    pub fn builder() -> FakeVerificationServiceBuilder {
        FakeVerificationServiceBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Requests received for `host`.
    pub fn requests(&self, host: &str) -> usize {
        self.state.requests.lock().get(host).copied().unwrap_or(0)
    }
}

impl Drop for FakeVerificationService {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn verdict(State(state): State<Arc<ServiceState>>, Path(host): Path<String>) -> Response {
    *state.requests.lock().entry(host.clone()).or_insert(0) += 1;
    match state.answers.get(&host).copied() {
        Some(Answer::Code(code)) => axum::Json(serde_json::json!({ "code": code })).into_response(),
        Some(Answer::Status(status)) => StatusCode::from_u16(status)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            .into_response(),
        Some(Answer::Slow(delay, code)) => {
            tokio::time::sleep(delay).await;
            axum::Json(serde_json::json!({ "code": code })).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
