//! Portal Ingest Server Library
//!
//! Resume and profile image ingestion for the job portal. The binary in
//! main.rs wires configuration and logging around [`build_router`]; tests
//! drive the same router.
//!
//! # Modules
//!
//! - `upload`: validator and store writer
//! - `routes`: upload, retrieval and health endpoints
//! - `auth`: bearer token gate for the upload routes

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod upload;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the HTTP router
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/upload", routes::upload::router(&state))
        .nest("/host", routes::host::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
