//! HTTP surface.

use axum::{middleware, routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::middleware::auth_gate;
use crate::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/flows",
            get(handlers::flows::list).post(handlers::flows::upsert),
        )
        .route(
            "/{flow_id}",
            get(handlers::flows::flow_file).delete(handlers::flows::delete),
        )
        .route("/{flow_id}/history", get(handlers::history::list))
        .layer(middleware::from_fn_with_state(state.clone(), auth_gate))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
