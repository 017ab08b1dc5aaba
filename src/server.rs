//! ==============================================================================
//! server.rs - ingest endpoint, push channel and dashboard files
//! ==============================================================================
//!
//! routes:
//!     POST /receive-data   json reading -> broadcast -> "Data received"
//!     GET  /               websocket upgrade, or index.html for a browser
//!     GET  /ws             websocket upgrade
//!     GET  /api/status     connected clients and broadcast count
//!     GET  /api/charts     chart layout the browser dashboard builds from
//!     GET  /*              static files from the configured directory
//!
//! relationships:
//!     - uses: relay.rs (connection set)
//!     - uses: dashboard (chart layout)
//!
//! ==============================================================================

use crate::config::RelayConfig;
use crate::dashboard::Dashboard;
use crate::error::{RelayError, Result};
use crate::relay::{Relay, Subscription};

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

/// reply to every accepted reading
pub const ACK: &str = "Data received";

/// Everything a request handler can reach.
#[derive(Clone)]
pub struct AppState {
    pub relay: Relay,
    pub static_dir: PathBuf,
    layout: Arc<serde_json::Value>,
    show_sensor_data: bool,
}

impl AppState {
    pub fn new(relay: Relay, config: &RelayConfig) -> Self {
        Self {
            relay,
            static_dir: config.server.static_dir.clone(),
            layout: Arc::new(Dashboard::layout(&config.dashboard)),
            show_sensor_data: config.logging.show_sensor_data,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let files = ServeDir::new(&state.static_dir);
    Router::new()
        .route("/", get(root_handler))
        .route("/ws", get(ws_handler))
        .route("/receive-data", post(receive_data))
        .route("/api/status", get(status_handler))
        .route("/api/charts", get(charts_handler))
        .fallback_service(files)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn bind(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr).await.map_err(|source| RelayError::Bind {
        addr: addr.to_string(),
        source,
    })
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(RelayError::Serve)
}

/// accept a reading and forward it verbatim to every open client
async fn receive_data(
    State(state): State<AppState>,
    Json(reading): Json<serde_json::Value>,
) -> &'static str {
    if state.show_sensor_data {
        tracing::debug!(%reading, "reading received");
    }
    match state.relay.broadcast_value(&reading) {
        Ok(delivered) => tracing::trace!(delivered, "reading forwarded"),
        Err(e) => tracing::warn!(error = %e, "failed to encode reading"),
    }
    ACK
}

/// same origin as the page: upgrade if asked, otherwise hand out the page
async fn root_handler(State(state): State<AppState>, ws: Option<WebSocketUpgrade>) -> Response {
    match ws {
        Some(ws) => upgrade(ws, state.relay),
        None => index_handler(&state).await,
    }
}

async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    upgrade(ws, state.relay)
}

fn upgrade(ws: WebSocketUpgrade, relay: Relay) -> Response {
    ws.on_upgrade(move |socket| client_session(socket, relay))
}

async fn index_handler(state: &AppState) -> Response {
    let path = state.static_dir.join("index.html");
    match tokio::fs::read_to_string(&path).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "index not found");
            (StatusCode::NOT_FOUND, "dashboard not found").into_response()
        }
    }
}

async fn status_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "connected_clients": state.relay.connected(),
        "broadcasts": state.relay.broadcasts(),
    }))
}

async fn charts_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(state.layout.as_ref().clone())
}

/// pump queued frames to one client until either side goes away
async fn client_session(mut socket: WebSocket, relay: Relay) {
    let Subscription { id, mut frames } = relay.connect();

    loop {
        tokio::select! {
            frame = frames.recv() => match frame {
                Some(text) => {
                    if let Err(e) = socket.send(Message::Text(text)).await {
                        tracing::debug!(client = id, error = %e, "send failed");
                        break;
                    }
                }
                None => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(client = id, error = %e, "socket error");
                    break;
                }
            },
        }
    }

    relay.disconnect(id);
}
