use axum::{extract::State, Json};

use crate::agents::dispatcher::SupervisorHandle;
use crate::agents::state::HealthReport;
use crate::api::errors::ApiError;

/// Liveness with registry and store sizes
///
/// GET /health
pub async fn health_check(
    State(supervisor): State<SupervisorHandle>,
) -> Result<Json<HealthReport>, ApiError> {
    Ok(Json(supervisor.health().await?))
}
