//! Route assembly: common routes, `/api/v1` resources, shared layers.

pub mod common;
pub mod resources;

pub use common::common_routes;
pub use resources::{api_routes, resource_router};

use crate::response::error_body;
use crate::state::AppState;
use axum::{http::StatusCode, response::IntoResponse, Json, Router};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

async fn fallback() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(error_body("not_found", "no such route".into(), None)),
    )
}

/// Full application router with body limit and request tracing.
pub fn app(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .merge(common_routes())
        .nest("/api/v1", api_routes())
        .fallback(fallback)
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
