// Operator-facing views of supervisor state
//
// Everything here is an owned copy. Callers can keep or modify these
// values freely without touching the live registry or store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::agent::{Agent, ConnectionId};
use crate::domain::task::{Requirements, Task, TaskPriority};

/// Copy of the agent registry, keyed by connection
pub type AgentSnapshot = BTreeMap<ConnectionId, Agent>;

/// Copy of the task store, keyed by task id
pub type TaskSnapshot = BTreeMap<Uuid, Task>;

/// Input to `add_task`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub description: String,
    #[serde(default)]
    pub requirements: Requirements,
    pub priority: TaskPriority,
    pub deadline: DateTime<Utc>,
}

/// Liveness summary exposed on `/health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub agents: usize,
    pub tasks: usize,
}

impl HealthReport {
    pub fn ok(agents: usize, tasks: usize) -> Self {
        Self {
            status: "ok".to_string(),
            agents,
            tasks,
        }
    }
}
