use axum::{extract::State, Json};

use crate::agents::dispatcher::SupervisorHandle;
use crate::agents::state::AgentSnapshot;
use crate::api::errors::ApiError;

/// Registered agents, keyed by connection
///
/// GET /api/agents
pub async fn list_agents(
    State(supervisor): State<SupervisorHandle>,
) -> Result<Json<AgentSnapshot>, ApiError> {
    Ok(Json(supervisor.agents().await?))
}
