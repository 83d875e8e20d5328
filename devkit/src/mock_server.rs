/*!
Mock registry server for development without a real document store

Serves, on an ephemeral local port:
- `GET /gists/devices`: the registry document (status and body configurable)
- `GET|HEAD /time`: an empty reply whose `Date` header is configurable

Records the `Authorization` header and hit counts for assertions.
*/

use anyhow::Result;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::registry_builder::RegistryBuilder;

pub const REGISTRY_PATH: &str = "/gists/devices";
pub const TIME_PATH: &str = "/time";

#[derive(Debug, Clone)]
struct RegistryReply {
    status: u16,
    body: String,
}

impl Default for RegistryReply {
    fn default() -> Self {
        Self {
            status: 200,
            body: RegistryBuilder::new().build_document().to_string(),
        }
    }
}

#[derive(Clone, Default)]
struct ServerState {
    registry: Arc<Mutex<RegistryReply>>,
    date: Arc<Mutex<Option<String>>>,
    last_authorization: Arc<Mutex<Option<String>>>,
    registry_hits: Arc<AtomicUsize>,
    time_hits: Arc<AtomicUsize>,
}

pub struct MockRegistryServer {
    addr: SocketAddr,
    state: ServerState,
    handle: JoinHandle<()>,
}

impl MockRegistryServer {
    pub async fn start() -> Result<Self> {
        let state = ServerState::default();
        let app = Router::new()
            .route(REGISTRY_PATH, get(serve_registry))
            .route(TIME_PATH, get(serve_time))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                log::error!("❌ [MOCK] registry server stopped: {}", e);
            }
        });

        log::info!("🧪 [MOCK] registry server on http://{}", addr);
        Ok(Self { addr, state, handle })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn registry_url(&self) -> String {
        format!("http://{}{}", self.addr, REGISTRY_PATH)
    }

    pub fn time_url(&self) -> String {
        format!("http://{}{}", self.addr, TIME_PATH)
    }

    /// Serves `builder`'s document with status 200.
    pub fn set_registry(&self, builder: &RegistryBuilder) {
        self.set_document(&builder.build_document());
    }

    pub fn set_document(&self, document: &Value) {
        self.set_reply(200, document.to_string());
    }

    /// Next registry replies use `status` and `body` verbatim.
    pub fn set_reply<B: Into<String>>(&self, status: u16, body: B) {
        *self.state.registry.lock().unwrap() = RegistryReply {
            status,
            body: body.into(),
        };
    }

    /// Keeps the body, changes the status code.
    pub fn set_status(&self, status: u16) {
        self.state.registry.lock().unwrap().status = status;
    }

    /// Time endpoint reports `ts` in its `Date` header.
    pub fn set_reference_time(&self, ts: i64) {
        self.set_date_header(http_date(ts));
    }

    /// Raw `Date` header value, malformed values included.
    pub fn set_date_header<S: Into<String>>(&self, value: S) {
        *self.state.date.lock().unwrap() = Some(value.into());
    }

    /// Back to the server's own clock.
    pub fn clear_date_header(&self) {
        *self.state.date.lock().unwrap() = None;
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.state.last_authorization.lock().unwrap().clone()
    }

    pub fn registry_hits(&self) -> usize {
        self.state.registry_hits.load(Ordering::SeqCst)
    }

    pub fn time_hits(&self) -> usize {
        self.state.time_hits.load(Ordering::SeqCst)
    }
}

impl Drop for MockRegistryServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// IMF-fixdate for `ts`, as HTTP servers send it.
pub fn http_date(ts: i64) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp(ts, 0)
        .map(|dt| dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
        .unwrap_or_default()
}

async fn serve_registry(State(state): State<ServerState>, headers: HeaderMap) -> Response {
    state.registry_hits.fetch_add(1, Ordering::SeqCst);
    *state.last_authorization.lock().unwrap() = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let reply = state.registry.lock().unwrap().clone();
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    log::info!("📤 [MOCK] registry reply {}", status);
    (status, [(header::CONTENT_TYPE, "application/json")], reply.body).into_response()
}

async fn serve_time(State(state): State<ServerState>) -> Response {
    state.time_hits.fetch_add(1, Ordering::SeqCst);
    let date = state.date.lock().unwrap().clone();
    match date {
        // hyper only adds its own Date header when none is set
        Some(date) => (StatusCode::OK, [(header::DATE, date)], "").into_response(),
        None => StatusCode::OK.into_response(),
    }
}
