//! Router assembly.

mod common;
mod domain;
mod entity;

pub use common::common_routes;
pub use domain::domain_routes;
pub use entity::entity_routes;

use crate::state::AppState;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

/// Largest accepted request body.
pub const BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// Health routes at the root, everything else under `/api/v1`.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(entity_routes(state.clone()))
        .merge(domain_routes(state.clone()));
    Router::new()
        .merge(common_routes(state))
        .nest("/api/v1", api)
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
}
