// API layer module (adapters for the supervisor)
// Follows Hexagonal Architecture - API is an adapter

pub mod errors;
pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::agents::dispatcher::SupervisorHandle;
use handlers::{agents, health, tasks, ws};

/// Build the HTTP router around a running dispatcher
pub fn router(supervisor: SupervisorHandle) -> Router {
    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Agent protocol
        .route("/ws", get(ws::ws_handler))
        // Operator routes
        .route("/api/tasks", post(tasks::create_task).get(tasks::list_tasks))
        .route("/api/tasks/:id", get(tasks::get_task))
        .route("/api/agents", get(agents::list_agents))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Shared state
        .with_state(supervisor)
}
