//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the REST project endpoints and the realtime websocket
//! under a single Axum router. Everything lives beneath `/api`; `/healthz`
//! answers liveness probes.

pub mod projects;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;

/// Build the application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/api/projects",
            get(projects::list_projects_rest).post(projects::create_project_rest),
        )
        .route(
            "/api/projects/{id}",
            get(projects::get_project).patch(projects::save_project_rest),
        )
        .route("/api/ws", get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
