//! Mock AList http server for tests.
//!
//! Implements the login, public settings, collection listing, create, and admin update
//! endpoints with in-memory state. Failures can be injected per endpoint or per record.

use std::{collections::HashSet, net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::oneshot;

/// Token issued by the mock login endpoint
pub const MOCK_TOKEN: &str = "mock-session-token";

/// In-memory server state. Tests seed collections and inject failures before starting,
/// and inspect recorded requests afterwards.
#[derive(Debug)]
pub struct MockState {
    pub username: String,
    pub password: String,
    pub version: Option<String>,
    pub storages: Vec<Value>,
    pub users: Vec<Value>,
    pub settings: Vec<Value>,
    pub metas: Vec<Value>,
    /// Collection kinds ("storage", "setting", "user", "meta") whose list endpoint fails
    pub failing_lists: HashSet<String>,
    /// Record identifiers (mount path or username) whose create request fails with http 500
    pub rejected_creates: HashSet<String>,
    /// Record identifiers whose create request returns a non-200 application code
    pub refused_creates: HashSet<String>,
    pub fail_admin_update: bool,
    /// Successful creates and updates reply with a plain text "ok" instead of an envelope
    pub plain_replies: bool,
    /// Public settings reply with `data` only, without `code` and `message`
    pub bare_public_settings: bool,
    pub created_storages: Vec<Value>,
    pub created_users: Vec<Value>,
    pub admin_updates: Vec<Value>,
    /// "METHOD path" of every request received, in order
    pub requests: Vec<String>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "admin".to_string(),
            version: Some("v3.35.0".to_string()),
            storages: Vec::new(),
            users: Vec::new(),
            settings: Vec::new(),
            metas: Vec::new(),
            failing_lists: HashSet::new(),
            rejected_creates: HashSet::new(),
            refused_creates: HashSet::new(),
            fail_admin_update: false,
            plain_replies: false,
            bare_public_settings: false,
            created_storages: Vec::new(),
            created_users: Vec::new(),
            admin_updates: Vec::new(),
            requests: Vec::new(),
        }
    }
}

impl MockState {
    /// Number of requests received, excluding login and public settings
    pub fn admin_request_count(&self) -> usize {
        self.requests
            .iter()
            .filter(|r| r.contains("/api/admin/"))
            .count()
    }
}

type SharedState = Arc<Mutex<MockState>>;

/// Handle to a running mock server.
pub struct MockAlistHandle {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: tokio::task::JoinHandle<()>,
    state: SharedState,
}

impl MockAlistHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base url of the server, e.g. "http://127.0.0.1:40123"
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        let _ = self.task.await;
    }
}

pub struct MockAlistServer {
    state: SharedState,
}

impl MockAlistServer {
    pub fn new(state: MockState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/public/settings", get(public_settings))
            .route("/api/admin/{kind}/list", get(list))
            .route("/api/admin/storage/create", post(create_storage))
            .route("/api/admin/user/create", post(create_user))
            .route("/api/admin/user/update", post(update_user))
            .with_state(self.state.clone())
    }

    /// Starts the server on an ephemeral localhost port.
    pub async fn start(self) -> std::io::Result<MockAlistHandle> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = self.router();
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
        });
        Ok(MockAlistHandle {
            addr,
            shutdown: shutdown_tx,
            task,
            state: self.state,
        })
    }
}

fn envelope(code: i64, message: &str, data: Value) -> Response {
    Json(json!({"code": code, "message": message, "data": data})).into_response()
}

fn accepted(state: &MockState) -> Response {
    if state.plain_replies {
        (StatusCode::OK, "ok").into_response()
    } else {
        envelope(200, "success", Value::Null)
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == MOCK_TOKEN)
}

async fn login(State(state): State<SharedState>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock();
    state.requests.push("POST /api/auth/login".to_string());
    let username = body.get("username").and_then(Value::as_str);
    let password = body.get("password").and_then(Value::as_str);
    if username == Some(state.username.as_str()) && password == Some(state.password.as_str()) {
        envelope(200, "success", json!({"token": MOCK_TOKEN}))
    } else {
        envelope(400, "password is incorrect", Value::Null)
    }
}

async fn public_settings(State(state): State<SharedState>) -> Response {
    let mut state = state.lock();
    state.requests.push("GET /api/public/settings".to_string());
    match &state.version {
        Some(version) if state.bare_public_settings => {
            Json(json!({"data": {"version": version}})).into_response()
        }
        Some(version) => envelope(
            200,
            "success",
            json!({"version": version, "site_title": "AList"}),
        ),
        None => (StatusCode::NOT_FOUND, "404 page not found").into_response(),
    }
}

async fn list(
    State(state): State<SharedState>,
    Path(kind): Path<String>,
    headers: HeaderMap,
) -> Response {
    let mut state = state.lock();
    state.requests.push(format!("GET /api/admin/{kind}/list"));
    if !authorized(&headers) {
        return envelope(401, "that's not even a token", Value::Null);
    }
    if state.failing_lists.contains(&kind) {
        return envelope(500, &format!("failed get {kind}s"), Value::Null);
    }
    let content = match kind.as_str() {
        "storage" => state.storages.clone(),
        "user" => state.users.clone(),
        "meta" => state.metas.clone(),
        // settings are returned as a plain array, without paging
        "setting" => return envelope(200, "success", Value::Array(state.settings.clone())),
        _ => return (StatusCode::NOT_FOUND, "404 page not found").into_response(),
    };
    let total = content.len();
    envelope(200, "success", json!({"content": content, "total": total}))
}

enum Created {
    Storage,
    User,
}

fn create(state: &SharedState, headers: &HeaderMap, body: Value, kind: Created) -> Response {
    let mut state = state.lock();
    let (path, id_field) = match kind {
        Created::Storage => ("/api/admin/storage/create", "mount_path"),
        Created::User => ("/api/admin/user/create", "username"),
    };
    state.requests.push(format!("POST {path}"));
    if !authorized(headers) {
        return envelope(401, "that's not even a token", Value::Null);
    }
    let id = body
        .get(id_field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if state.rejected_creates.contains(&id) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response();
    }
    if state.refused_creates.contains(&id) {
        return envelope(500, &format!("{id} already exists"), Value::Null);
    }
    match kind {
        Created::Storage => state.created_storages.push(body),
        Created::User => state.created_users.push(body),
    }
    accepted(&state)
}

async fn create_storage(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    create(&state, &headers, body, Created::Storage)
}

async fn create_user(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    create(&state, &headers, body, Created::User)
}

async fn update_user(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock();
    state
        .requests
        .push("POST /api/admin/user/update".to_string());
    if !authorized(&headers) {
        return envelope(401, "that's not even a token", Value::Null);
    }
    if state.fail_admin_update {
        return (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response();
    }
    state.admin_updates.push(body);
    accepted(&state)
}
