//! Web server module for the Slack Events API and the user listing.
//!
//! Routes:
//! - `POST /events`: Slack event callbacks and URL verification
//! - `GET /users?apikey=...`: the stored user directory as JSON
//! - `GET /health`: liveness check

pub mod error;
pub mod handlers;
pub mod processor;
pub mod signature;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use handlers::{health, list_users, slack_events, AppState, HealthResponse};
pub use processor::{DirectoryProcessor, EventProcessor};
pub use signature::{compute_signature, verify_slack_signature};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/users", get(list_users))
        .route("/events", post(slack_events))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
