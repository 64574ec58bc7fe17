pub mod api;
pub mod app_state;
pub mod config;
pub mod db;
pub mod middleware;
pub mod utils;
pub mod workflow;

use axum::middleware::from_fn_with_state;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa_rapidoc::RapiDoc;

use crate::app_state::AppState;
use crate::middleware::auth::jwt_middleware;

/// Builds the full application router.
///
/// Health checks and the API docs are public; everything else needs a caller.
pub fn build_router(state: AppState) -> Router {
    let private_routes = Router::new()
        .merge(api::requests::request_routes())
        .merge(api::details::details_routes())
        .merge(api::approvals::approval_routes())
        .merge(api::history::history_routes())
        .merge(api::attachments::attachment_routes())
        .merge(api::user::user_routes())
        .route_layer(from_fn_with_state(state.clone(), jwt_middleware));

    Router::new()
        .merge(api::health::health_routes())
        .merge(private_routes)
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", api::openapi()).path("/rapidoc"))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
