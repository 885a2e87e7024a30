use super::events::TaskEvent;
use super::value_objects::{Progress, ReportedStatus, Requirements, TaskPriority, TaskStatus};
use crate::domain::agent::AgentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Task aggregate root
///
/// A unit of work tracked from submission to its terminal outcome.
///
/// # Invariants
/// - Description cannot be empty
/// - `assigned_agent` is set only while in progress, or while pending
///   between the `task` send and the agent's acknowledgment
/// - Completed and Failed are terminal
///
/// Priority and deadline are carried for the agent's benefit only.
///
/// # Example
/// ```
/// use taskforce_supervisor::domain::task::{Requirements, Task, TaskPriority, TaskStatus};
/// use chrono::{Duration, Utc};
///
/// let (task, event) = Task::new(
///     "Analyze customer data".to_string(),
///     Requirements::with_capabilities(["analysis"]),
///     TaskPriority::High,
///     Utc::now() + Duration::hours(1),
/// ).expect("valid task");
///
/// assert_eq!(task.status(), TaskStatus::Pending);
/// assert_eq!(event.task_id(), task.id());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    id: Uuid,
    description: String,
    requirements: Requirements,
    priority: TaskPriority,
    deadline: DateTime<Utc>,
    status: TaskStatus,
    progress: Progress,
    assigned_agent: Option<AgentId>,
    result: Option<Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a new pending Task
    ///
    /// # Returns
    /// * `Ok((Task, TaskEvent))` - New task and its Created event
    /// * `Err(String)` - If the description is empty
    pub fn new(
        description: String,
        requirements: Requirements,
        priority: TaskPriority,
        deadline: DateTime<Utc>,
    ) -> Result<(Self, TaskEvent), String> {
        if description.trim().is_empty() {
            return Err("Description cannot be empty".to_string());
        }

        let now = Utc::now();
        let task = Self {
            id: Uuid::new_v4(),
            description,
            requirements,
            priority,
            deadline,
            status: TaskStatus::Pending,
            progress: Progress::default(),
            assigned_agent: None,
            result: None,
            created_at: now,
            updated_at: now,
        };

        let event = TaskEvent::Created { task_id: task.id };
        Ok((task, event))
    }

    /// Tentatively hands the task to `agent_id`
    ///
    /// # Business Rules
    /// - Task must be pending with no outstanding assignment
    /// - Status stays Pending until the agent acknowledges
    pub fn assign_to(&mut self, agent_id: &AgentId) -> Result<TaskEvent, String> {
        if self.status != TaskStatus::Pending {
            return Err(format!("Cannot assign task in {} status", self.status));
        }
        if let Some(current) = &self.assigned_agent {
            return Err(format!("Task is already offered to {}", current));
        }

        self.assigned_agent = Some(agent_id.clone());
        self.touch();

        Ok(TaskEvent::Assigned {
            task_id: self.id,
            agent_id: agent_id.clone(),
        })
    }

    /// Confirms the tentative assignment to `agent_id`
    pub fn accept(&mut self, agent_id: &AgentId) -> Result<TaskEvent, String> {
        self.ensure_offered_to(agent_id)?;

        self.status = TaskStatus::InProgress;
        self.touch();

        Ok(TaskEvent::Accepted {
            task_id: self.id,
            agent_id: agent_id.clone(),
        })
    }

    /// Withdraws the tentative assignment after `agent_id` declined
    pub fn reject(&mut self, agent_id: &AgentId) -> Result<TaskEvent, String> {
        self.ensure_offered_to(agent_id)?;

        self.status = TaskStatus::Pending;
        self.assigned_agent = None;
        self.touch();

        Ok(TaskEvent::Rejected {
            task_id: self.id,
            agent_id: agent_id.clone(),
        })
    }

    /// Applies a progress report from the executing agent
    ///
    /// # Business Rules
    /// - Overwrites status, progress and result
    /// - Terminal reports release the assignment
    /// - Nothing is applied once the task is terminal
    pub fn report(
        &mut self,
        reported: ReportedStatus,
        progress: Progress,
        result: Option<Value>,
    ) -> Result<TaskEvent, String> {
        let next: TaskStatus = reported.into();
        if !self.status.can_transition_to(next) {
            return Err(format!(
                "Cannot move task from {} to {}",
                self.status, next
            ));
        }

        self.status = next;
        self.progress = progress;
        self.result = result;
        self.touch();

        let event = match next {
            TaskStatus::Completed => TaskEvent::Completed {
                task_id: self.id,
                agent_id: self.assigned_agent.take(),
            },
            TaskStatus::Failed => TaskEvent::Failed {
                task_id: self.id,
                agent_id: self.assigned_agent.take(),
            },
            status => TaskEvent::Progressed {
                task_id: self.id,
                status,
                progress,
            },
        };

        Ok(event)
    }

    /// Returns the task to the pending pool, dropping any assignment
    ///
    /// Used when the holding agent goes away. Terminal tasks stay put.
    pub fn requeue(&mut self) -> Result<TaskEvent, String> {
        if self.status.is_terminal() {
            return Err(format!("Cannot requeue task in {} status", self.status));
        }

        let previous_agent = self.assigned_agent.take();
        self.status = TaskStatus::Pending;
        self.touch();

        Ok(TaskEvent::Requeued {
            task_id: self.id,
            previous_agent,
        })
    }

    /// True when pending with no outstanding offer
    pub fn is_unassigned_pending(&self) -> bool {
        self.status == TaskStatus::Pending && self.assigned_agent.is_none()
    }

    /// True when `agent_id` currently holds or has been offered the task
    pub fn is_assigned_to(&self, agent_id: &AgentId) -> bool {
        self.assigned_agent.as_ref() == Some(agent_id)
    }

    fn ensure_offered_to(&self, agent_id: &AgentId) -> Result<(), String> {
        if self.status != TaskStatus::Pending {
            return Err(format!(
                "Cannot acknowledge task in {} status",
                self.status
            ));
        }
        if !self.is_assigned_to(agent_id) {
            return Err(format!("Task was not offered to {}", agent_id));
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    // ===== Getters =====

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn requirements(&self) -> &Requirements {
        &self.requirements
    }

    pub fn priority(&self) -> TaskPriority {
        self.priority
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn assigned_agent(&self) -> Option<&AgentId> {
        self.assigned_agent.as_ref()
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
