// Wire protocol between the supervisor and its agents
//
// Every frame is a JSON object discriminated by its "type" field. Agents
// send ClientMessage values; the supervisor answers with ServerMessage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::agent::{AgentId, AgentStatus};
use crate::domain::task::{Progress, ReportedStatus, Requirements, Task, TaskPriority};

/// Frames an agent sends to the supervisor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Register(Registration),
    Acknowledge(Acknowledgment),
    Update(TaskUpdate),
}

/// Frames the supervisor sends to an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    RegistrationResponse(RegistrationResponse),
    Task(TaskAssignment),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub agent_id: AgentId,
    #[serde(default)]
    pub capabilities: Vec<String>,
    pub status: AgentStatus,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Accepted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationResponse {
    pub status: RegistrationStatus,
    pub supervisor_id: String,
    pub timestamp: DateTime<Utc>,
}

/// A task offered to an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAssignment {
    pub task_id: Uuid,
    pub description: String,
    pub requirements: Requirements,
    pub priority: TaskPriority,
    pub deadline: DateTime<Utc>,
    pub timestamp: DateTime<Utc>,
}

impl From<&Task> for TaskAssignment {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.id(),
            description: task.description().to_string(),
            requirements: task.requirements().clone(),
            priority: task.priority(),
            deadline: task.deadline(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckStatus {
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Acknowledgment {
    pub task_id: Uuid,
    pub status: AckStatus,
    #[serde(default)]
    pub message: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

/// Progress report for a task the agent is running
///
/// `progress` is carried raw so the supervisor can refuse out-of-range
/// values with a proper error instead of dropping the frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub task_id: Uuid,
    pub status: ReportedStatus,
    pub progress: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl ClientMessage {
    pub fn register(agent_id: AgentId, capabilities: Vec<String>, status: AgentStatus) -> Self {
        ClientMessage::Register(Registration {
            agent_id,
            capabilities,
            status,
            timestamp: Utc::now(),
        })
    }

    pub fn acknowledge(task_id: Uuid, status: AckStatus, message: impl Into<String>) -> Self {
        ClientMessage::Acknowledge(Acknowledgment {
            task_id,
            status,
            message: message.into(),
            timestamp: Utc::now(),
        })
    }

    pub fn update(
        task_id: Uuid,
        status: ReportedStatus,
        progress: Progress,
        result: Option<Value>,
    ) -> Self {
        ClientMessage::Update(TaskUpdate {
            task_id,
            status,
            progress: progress.value().into(),
            result,
            timestamp: Utc::now(),
        })
    }

    /// Name of the frame type, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Register(_) => "register",
            ClientMessage::Acknowledge(_) => "acknowledge",
            ClientMessage::Update(_) => "update",
        }
    }
}

impl ServerMessage {
    pub fn registration_accepted(supervisor_id: &str) -> Self {
        ServerMessage::RegistrationResponse(RegistrationResponse {
            status: RegistrationStatus::Accepted,
            supervisor_id: supervisor_id.to_string(),
            timestamp: Utc::now(),
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::RegistrationResponse(_) => "registration_response",
            ServerMessage::Task(_) => "task",
        }
    }
}
