pub mod api;
pub mod client;
pub mod config;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::ServiceConfig;
use crate::services::scan_service::ScanService;
use crate::services::scanner::NotebookScanner;
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::scan::scan_zip,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::scan::ScanUpload,
            api::handlers::health::HealthResponse,
            models::ScanEntry,
            models::ScanResponse,
            models::ErrorResponse,
        )
    ),
    tags(
        (name = "scan", description = "Notebook scanning endpoints"),
        (name = "system", description = "Service status endpoints")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub scanner: Arc<dyn NotebookScanner>,
    pub scan_service: Arc<ScanService>,
    pub config: ServiceConfig,
}

impl AppState {
    pub fn new(config: ServiceConfig, scanner: Arc<dyn NotebookScanner>) -> Self {
        let scan_service = Arc::new(ScanService::new(
            scanner.clone(),
            config.scratch_dir.clone(),
        ));

        Self {
            scanner,
            scan_service,
            config,
        }
    }
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn create_app(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &axum::http::Request<_>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        })
        .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
            info!("📥 {} {}", request.method(), request.uri());
        })
        .on_response(
            |response: &axum::http::Response<_>,
             latency: std::time::Duration,
             _span: &tracing::Span| {
                info!(
                    "📤 Finished in {:?} with status {}",
                    latency,
                    response.status()
                );
            },
        );

    Router::new()
        .route("/health", get(api::handlers::health::health_check))
        .route("/api-docs/openapi.json", get(openapi_json))
        .route(
            "/scan-zip/",
            post(api::handlers::scan::scan_zip)
                .layer(DefaultBodyLimit::max(state.config.max_upload_size)),
        )
        // Request id must be assigned before the trace span reads it
        .layer(trace_layer)
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .with_state(state)
}
