//! Router configuration for Web API.

use axum::{
    extract::DefaultBodyLimit,
    http::{Method, StatusCode, Uri},
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, services::ServeDir, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{
    get_file, get_product_image, upload_base64, upload_product_images, upload_single, AppState,
};
use super::middleware::{create_cors_layer, security_headers};
use super::openapi::ApiDoc;
use crate::config::Config;
use crate::file::MAX_BATCH_FILES;

/// Headroom on top of the file bytes for multipart framing and form fields.
const BODY_OVERHEAD: usize = 1024 * 1024;

/// Request body limit for a given per-file upload limit.
///
/// Large enough for a full batch; individual files are checked against
/// the per-file limit while their parts are read.
pub fn body_limit(max_upload_size: u64) -> usize {
    (max_upload_size as usize)
        .saturating_mul(MAX_BATCH_FILES)
        // base64 inflates payloads by a third
        .max((max_upload_size as usize).saturating_mul(4) / 3)
        .saturating_add(BODY_OVERHEAD)
}

/// Create the main API router.
pub fn create_router(app_state: Arc<AppState>, api_prefix: &str, cors_origins: &[String]) -> Router {
    let max_upload_size = app_state.files.generic_profile().max_size;

    let file_routes = Router::new()
        .route("/upload-single", post(upload_single))
        .route("/upload-base64", post(upload_base64))
        .route("/product/upload-image", post(upload_product_images))
        .route("/product/image/:filename", get(get_product_image))
        .route("/:filename", get(get_file));

    let api_routes = Router::new().nest("/file", file_routes);

    let prefix = api_prefix.trim_end_matches('/');
    let router = if prefix.is_empty() {
        api_routes
    } else {
        Router::new().nest(prefix, api_routes)
    };

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(DefaultBodyLimit::max(body_limit(max_upload_size))),
        )
        .with_state(app_state)
}

/// Assemble the complete application: API, health check, docs, static
/// files and the JSON 404 fallback.
pub fn build_app(app_state: Arc<AppState>, config: &Config) -> Router {
    let mut router = create_router(app_state, &config.web.api_prefix, &config.web.cors_origins)
        .merge(create_health_router())
        .merge(create_swagger_router());

    if config.web.serve_static {
        if let Some(static_router) = create_static_router(&config.files.public_path) {
            router = router.merge(static_router);
        }
    }

    router
        .fallback(not_found)
        .layer(middleware::from_fn(security_headers))
        .layer(CompressionLayer::new())
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Create the OpenAPI documentation router.
pub fn create_swagger_router() -> Router {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}

/// Serve the public directory under `/public`.
///
/// Returns `None` if the directory does not exist.
pub fn create_static_router(public_path: &str) -> Option<Router> {
    if !Path::new(public_path).is_dir() {
        tracing::warn!("Public directory not found: {}", public_path);
        return None;
    }

    Some(Router::new().nest_service("/public", ServeDir::new(public_path)))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

/// Fallback for unmatched routes.
pub async fn not_found(method: Method, uri: Uri) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("Cannot {} {}", method, uri) })),
    )
}
