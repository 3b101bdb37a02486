use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use chunkvault_protocol::endpoints;

use crate::handler;
use crate::service::IngestionService;

/// Build the axum router with all chunkvault endpoints.
pub fn build_router(service: Arc<IngestionService>) -> Router {
    Router::new()
        .route(endpoints::HEALTH, get(handler::health_handler))
        .route(endpoints::METADATA, get(handler::list_metadata_handler))
        .route(endpoints::UPLOAD, post(handler::upload_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}
