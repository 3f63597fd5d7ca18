//! Thin HTTP adapter over the issuance controller. The core never depends on
//! this module; it exists to put the call/response contract on the wire.

pub mod handlers;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/v1/service-accounts/:sa_uid/tokens",
            get(handlers::list_tokens).post(handlers::create_token),
        )
        .route(
            "/api/v1/service-accounts/:sa_uid/tokens/:token_uid",
            axum::routing::delete(handlers::delete_token),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
