//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! The relay's HTTP surface is deliberately small: the websocket endpoint,
//! guest-token issuance for anonymous participants, and a health probe.
//! Everything else (dashboard, project CRUD, the durable stroke store)
//! lives in the external web application.

pub mod auth;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/ws", get(ws::handle_ws))
        .route("/api/guest-token", post(auth::issue_guest_token))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
