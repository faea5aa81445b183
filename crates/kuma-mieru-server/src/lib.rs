//! HTTP boundary for Kuma Mieru.
//!
//! Every handler opens its own [`RequestScope`], so memoized preload data
//! never outlives the request that fetched it.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use kuma_mieru::{ConfigResolver, ErrorKind, MieruError, RequestScope};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

/// `Cache-Control` sent with every JSON snapshot.
pub const CACHE_CONTROL: &str = "public, max-age=60, stale-while-revalidate=30";

/// State shared by all handlers.
pub struct AppState {
    pub service: ConfigResolver,
}

impl AppState {
    pub fn new(service: ConfigResolver) -> Self {
        Self { service }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page_id: Option<String>,
}

impl PageQuery {
    fn page_id(&self) -> Option<&str> {
        self.page_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Build the axum Router with all endpoints.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/config", get(handle_global_config))
        .route("/api/maintenance", get(handle_maintenance))
        .route("/api/pages", get(handle_pages))
        .route("/api/page-config", get(handle_page_config))
        .layer(cors)
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(addr: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn handle_global_config(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Response {
    let scope = RequestScope::new();
    let config = state
        .service
        .get_global_config(&scope, query.page_id())
        .await;
    snapshot(config)
}

async fn handle_maintenance(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Response {
    let scope = RequestScope::new();
    match state
        .service
        .get_maintenance_data(&scope, query.page_id())
        .await
    {
        Ok(data) => snapshot(data),
        Err(e) => error_response(&e),
    }
}

async fn handle_pages(State(state): State<Arc<AppState>>) -> Response {
    let scope = RequestScope::new();
    snapshot(state.service.get_page_tabs_metadata(&scope).await)
}

async fn handle_page_config(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Response {
    match state.service.page_config(query.page_id()) {
        Ok(config) => snapshot(config),
        Err(e) => error_response(&e),
    }
}

fn snapshot<T: Serialize>(body: T) -> Response {
    (
        StatusCode::OK,
        [(header::CACHE_CONTROL, CACHE_CONTROL)],
        Json(body),
    )
        .into_response()
}

fn error_response(err: &MieruError) -> Response {
    let (status, code) = match err.kind() {
        ErrorKind::Configuration => (StatusCode::NOT_FOUND, "E_CONFIGURATION"),
        ErrorKind::Validation => (StatusCode::UNPROCESSABLE_ENTITY, "E_VALIDATION"),
        ErrorKind::Resolution => (StatusCode::BAD_GATEWAY, "E_RESOLUTION"),
    };
    (
        status,
        Json(json!({ "error": { "code": code, "message": err.to_string() } })),
    )
        .into_response()
}
