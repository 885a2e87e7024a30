use super::value_objects::{AgentId, AgentStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Registry record for one connected worker
///
/// # Invariants
/// - `status == Busy` if and only if `current_task` is set
/// - At most one task is current at any time
///
/// Every mutation goes through a method that keeps both fields in step, so
/// the invariant cannot be broken from outside this module.
///
/// # Example
/// ```
/// use taskforce_supervisor::domain::agent::{Agent, AgentId, AgentStatus};
/// use uuid::Uuid;
///
/// let mut agent = Agent::register(
///     AgentId::new("agent-1").unwrap(),
///     vec!["ml".to_string()],
///     AgentStatus::Available,
/// );
/// let task_id = Uuid::new_v4();
/// agent.occupy(task_id).expect("idle agent");
///
/// assert_eq!(agent.status(), AgentStatus::Busy);
/// assert_eq!(agent.current_task(), Some(task_id));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    id: AgentId,
    capabilities: BTreeSet<String>,
    status: AgentStatus,
    current_task: Option<Uuid>,
    last_update: DateTime<Utc>,
}

impl Agent {
    /// Creates the record for a freshly registered agent
    ///
    /// A registration that claims `Busy` carries no task the supervisor
    /// knows about, so it is recorded as `Offline` instead.
    pub fn register(
        id: AgentId,
        capabilities: impl IntoIterator<Item = String>,
        requested: AgentStatus,
    ) -> Self {
        let status = match requested {
            AgentStatus::Busy => AgentStatus::Offline,
            other => other,
        };

        Self {
            id,
            capabilities: capabilities.into_iter().collect(),
            status,
            current_task: None,
            last_update: Utc::now(),
        }
    }

    /// Makes `task_id` the agent's current task
    ///
    /// # Business Rules
    /// - Fails if the agent is already busy with a different task
    /// - Occupying with the task already held is a no-op
    pub fn occupy(&mut self, task_id: Uuid) -> Result<(), String> {
        match self.current_task {
            Some(current) if current == task_id => Ok(()),
            Some(current) => Err(format!(
                "Agent {} is busy with task {}",
                self.id, current
            )),
            None => {
                self.status = AgentStatus::Busy;
                self.current_task = Some(task_id);
                self.last_update = Utc::now();
                Ok(())
            }
        }
    }

    /// Clears `task_id` and returns the agent to `Available`
    pub fn release(&mut self, task_id: Uuid) -> Result<(), String> {
        if self.current_task != Some(task_id) {
            return Err(format!(
                "Agent {} does not hold task {}",
                self.id, task_id
            ));
        }

        self.status = AgentStatus::Available;
        self.current_task = None;
        self.last_update = Utc::now();
        Ok(())
    }

    /// True when the agent may receive a new assignment
    pub fn is_available(&self) -> bool {
        self.status == AgentStatus::Available
    }

    /// True if every capability in `required` is advertised by this agent
    pub fn has_capabilities<'a>(&self, required: impl IntoIterator<Item = &'a String>) -> bool {
        required
            .into_iter()
            .all(|capability| self.capabilities.contains(capability))
    }

    // ===== Getters =====

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    pub fn capabilities(&self) -> &BTreeSet<String> {
        &self.capabilities
    }

    pub fn status(&self) -> AgentStatus {
        self.status
    }

    pub fn current_task(&self) -> Option<Uuid> {
        self.current_task
    }

    pub fn last_update(&self) -> DateTime<Utc> {
        self.last_update
    }
}
