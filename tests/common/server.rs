use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

/// Counters shared with the handlers
#[derive(Clone, Default)]
pub struct MockState {
    pub logins: Arc<AtomicUsize>,
}

/// In-process HTTP server acting as the API under test
pub struct MockServer {
    pub base_url: String,
    pub state: MockState,
}

#[allow(dead_code)]
impl MockServer {
    /// Start the server on a random local port
    pub async fn start() -> Self {
        let state = MockState::default();

        let app = Router::new()
            .route("/health", get(|| async { "ok" }))
            .route("/users/{id}", get(get_user))
            .route("/login", post(login))
            .route("/slow-login", post(slow_login))
            .route("/secure", get(secure))
            .route("/echo", post(echo))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock server");
        let addr = listener.local_addr().expect("Mock server has no address");

        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Mock server stopped");
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn login_count(&self) -> usize {
        self.state.logins.load(Ordering::SeqCst)
    }
}

async fn get_user(Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    match id.as_str() {
        "42" => (StatusCode::OK, Json(json!({"id": 42, "name": "Ada"}))),
        "7" => (StatusCode::OK, Json(json!({"id": 7, "name": "Grace"}))),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "not found"})),
        ),
    }
}

async fn login(State(state): State<MockState>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["user"] == "probe" && body["password"] == "secret" {
        let n = state.logins.fetch_add(1, Ordering::SeqCst) + 1;
        (
            StatusCode::OK,
            Json(json!({"data": {"token": format!("token-{}", n)}})),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "bad credentials"})),
        )
    }
}

/// Login that answers only after `SLOW_LOGIN_DELAY`
pub const SLOW_LOGIN_DELAY: Duration = Duration::from_secs(3);

async fn slow_login() -> Json<Value> {
    tokio::time::sleep(SLOW_LOGIN_DELAY).await;
    Json(json!({"data": {"token": "token-slow"}}))
}

async fn secure(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if authorization.starts_with("Bearer token-") {
        (
            StatusCode::OK,
            Json(json!({"authorized": true, "token": authorization.trim_start_matches("Bearer ")})),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "unauthorized"})),
        )
    }
}

async fn echo(headers: HeaderMap, RawQuery(query): RawQuery, Json(body): Json<Value>) -> Json<Value> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    Json(json!({
        "body": body,
        "query": query,
        "probe_header": header("x-probe"),
        "user_agent": header("user-agent"),
    }))
}
