use super::value_objects::{Progress, TaskStatus};
use crate::domain::agent::AgentId;
use serde::Serialize;
use uuid::Uuid;

/// Domain events that occur within the Task aggregate
///
/// Every successful transition on [`crate::domain::task::Task`] yields one of
/// these. The supervisor writes them to the log as its audit trail.
///
/// # Example
/// ```
/// use taskforce_supervisor::domain::task::events::TaskEvent;
/// use uuid::Uuid;
///
/// let event = TaskEvent::Created { task_id: Uuid::new_v4() };
/// assert_eq!(event.kind(), "created");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TaskEvent {
    /// Fired when a task is submitted
    Created { task_id: Uuid },
    /// Fired when a task is sent to an agent, pending acknowledgment
    Assigned { task_id: Uuid, agent_id: AgentId },
    /// Fired when the assigned agent accepts
    Accepted { task_id: Uuid, agent_id: AgentId },
    /// Fired when the assigned agent turns the task down
    Rejected { task_id: Uuid, agent_id: AgentId },
    /// Fired on a non-terminal progress report
    Progressed {
        task_id: Uuid,
        status: TaskStatus,
        progress: Progress,
    },
    /// Fired when the agent reports success
    Completed { task_id: Uuid, agent_id: Option<AgentId> },
    /// Fired when the agent reports failure
    Failed { task_id: Uuid, agent_id: Option<AgentId> },
    /// Fired when a task returns to the pending pool
    Requeued {
        task_id: Uuid,
        previous_agent: Option<AgentId>,
    },
}

impl TaskEvent {
    /// Returns the task_id for this event
    pub fn task_id(&self) -> Uuid {
        match self {
            TaskEvent::Created { task_id }
            | TaskEvent::Assigned { task_id, .. }
            | TaskEvent::Accepted { task_id, .. }
            | TaskEvent::Rejected { task_id, .. }
            | TaskEvent::Progressed { task_id, .. }
            | TaskEvent::Completed { task_id, .. }
            | TaskEvent::Failed { task_id, .. }
            | TaskEvent::Requeued { task_id, .. } => *task_id,
        }
    }

    /// Short name used as the `event` log field
    pub fn kind(&self) -> &'static str {
        match self {
            TaskEvent::Created { .. } => "created",
            TaskEvent::Assigned { .. } => "assigned",
            TaskEvent::Accepted { .. } => "accepted",
            TaskEvent::Rejected { .. } => "rejected",
            TaskEvent::Progressed { .. } => "progressed",
            TaskEvent::Completed { .. } => "completed",
            TaskEvent::Failed { .. } => "failed",
            TaskEvent::Requeued { .. } => "requeued",
        }
    }
}
