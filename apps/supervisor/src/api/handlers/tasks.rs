use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::agents::dispatcher::SupervisorHandle;
use crate::agents::state::{NewTask, TaskSnapshot};
use crate::api::errors::ApiError;
use crate::domain::task::Task;

/// Create a task and offer it to a capable agent
///
/// POST /api/tasks
pub async fn create_task(
    State(supervisor): State<SupervisorHandle>,
    Json(req): Json<NewTask>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let task = supervisor.add_task(req).await?;

    tracing::info!(task_id = %task.id(), status = %task.status(), "Task created via API");

    Ok((StatusCode::CREATED, Json(task)))
}

/// Every known task, keyed by id
///
/// GET /api/tasks
pub async fn list_tasks(
    State(supervisor): State<SupervisorHandle>,
) -> Result<Json<TaskSnapshot>, ApiError> {
    Ok(Json(supervisor.tasks().await?))
}

/// Get a task by ID
///
/// GET /api/tasks/:id
pub async fn get_task(
    State(supervisor): State<SupervisorHandle>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<Task>, ApiError> {
    let task = supervisor
        .task(task_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Task not found: {}", task_id)))?;

    Ok(Json(task))
}
