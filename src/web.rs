//! HTTP query layer: read-only consumer of the aircraft state store
//!
//! Serves the flight summary feed at `/data.json`, per-flight message
//! history at `/messages/{flight}`, and the embedded map page at `/`.

use anyhow::Result;
use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, Request, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use include_dir::{Dir, include_dir};
use mime_guess::from_path;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;
use uuid::Uuid;

use crate::state::{AircraftStateStore, FlightSummary};

// Embed the map page into the binary
static ASSETS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/web");

// App state for sharing the aircraft store
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<AircraftStateStore>,
}

#[derive(Debug, Serialize)]
struct PlanesResponse {
    planes: Vec<FlightSummary>,
}

#[derive(Debug, Serialize)]
struct MessagesResponse {
    flight: String,
    messages: Vec<String>,
}

/// `GET /data.json`: summary of every known flight.
async fn data_json(State(state): State<AppState>) -> Json<PlanesResponse> {
    let planes = state.store.list_summaries().await;
    Json(PlanesResponse { planes })
}

/// `GET /messages/{flight}`: full message history for one flight. Unknown
/// flights return an empty list rather than 404.
async fn flight_messages(
    State(state): State<AppState>,
    Path(flight): Path<String>,
) -> Json<MessagesResponse> {
    let messages = state.store.get_history(&flight).await;
    Json(MessagesResponse { flight, messages })
}

/// Serve the embedded map page and any other bundled assets.
async fn handle_static_file(uri: Uri) -> impl IntoResponse {
    let path = uri.path().trim_start_matches('/');
    let path = if path.is_empty() { "index.html" } else { path };

    if let Some(file) = ASSETS.get_file(path) {
        let mut headers = HeaderMap::new();
        let content_type = from_path(path).first_or_octet_stream();
        if let Ok(value) = content_type.as_ref().parse() {
            headers.insert("content-type", value);
        }
        return (StatusCode::OK, headers, file.contents()).into_response();
    }

    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

// Middleware for request logging with correlation ID
async fn request_logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = Uuid::new_v4().to_string()[..8].to_string();
    let start_time = Instant::now();

    info!("Started {} {} [{}]", method, path, request_id);

    let response = next.run(request).await;
    let duration = start_time.elapsed();
    let status = response.status();

    info!(
        "Completed {} {} [{}] {} in {:.2}ms",
        method,
        path,
        request_id,
        status.as_u16(),
        duration.as_secs_f64() * 1000.0
    );

    response
}

/// Build the application router. Split out from [`start_web_server`] so
/// tests can drive it without a listener.
pub fn build_router(store: Arc<AircraftStateStore>) -> Router {
    let app_state = AppState { store };

    Router::new()
        .route("/data.json", get(data_json))
        .route("/messages/{flight}", get(flight_messages))
        .fallback(handle_static_file)
        .with_state(app_state)
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(CorsLayer::permissive())
}

pub async fn start_web_server(
    interface: String,
    port: u16,
    store: Arc<AircraftStateStore>,
    cancel: CancellationToken,
) -> Result<()> {
    info!("Starting web server on {}:{}", interface, port);

    let app = build_router(store);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", interface, port)).await?;
    info!("Web server listening on http://{}:{}", interface, port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;

    Ok(())
}
