//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST routes over the expense engine
//! - Bearer token authentication middleware
//! - Expense error to HTTP response mapping
//! - The email-backed notification dispatcher

pub mod error;
pub mod middleware;
pub mod notifications;
pub mod routes;

use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use expensa_core::expense::{ExpenseService, NotificationRelay};
use expensa_shared::JwtService;

/// Application state shared across handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// JWT service for token validation.
    pub jwt_service: Arc<JwtService>,
    /// The expense engine.
    pub expenses: Arc<ExpenseService>,
    /// Post-commit notification relay.
    pub notifications: Arc<NotificationRelay>,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
