use thiserror::Error;
use uuid::Uuid;

use crate::domain::agent::{AgentId, ConnectionId};

/// Faults raised while the supervisor processes a protocol event
///
/// None of these are fatal. The dispatcher logs them and moves on to the
/// next event, leaving state exactly as it was.
#[derive(Debug, Error, PartialEq)]
pub enum SupervisorError {
    #[error("Task not found: {0}")]
    UnknownTask(Uuid),

    #[error("No agent registered on connection {0}")]
    UnknownConnection(ConnectionId),

    #[error("Task {task_id} is not assigned to agent {agent_id}")]
    NotAssigned { task_id: Uuid, agent_id: AgentId },

    #[error("Invalid state transition for task {task_id}: {reason}")]
    InvalidStateTransition { task_id: Uuid, reason: String },

    #[error("Invalid progress for task {task_id}: {reason}")]
    InvalidProgress { task_id: Uuid, reason: String },

    #[error("Invalid task: {0}")]
    InvalidTask(String),

    #[error("Supervisor dispatcher is not running")]
    DispatcherUnavailable,
}

pub type SupervisorResult<T> = Result<T, SupervisorError>;

/// Errors that can occur in the agent runtime
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Connection error: {0}")]
    Connection(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] serde_json::Error),

    #[error("Task execution failed: {0}")]
    TaskExecutionFailed(String),

    #[error("Channel closed: {0}")]
    ChannelClosed(String),
}

pub type AgentResult<T> = Result<T, AgentError>;
