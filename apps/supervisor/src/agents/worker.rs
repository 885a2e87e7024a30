use std::collections::BTreeSet;
use uuid::Uuid;

use super::messages::{AckStatus, ClientMessage, TaskAssignment};
use crate::domain::agent::{AgentId, AgentStatus};
use crate::domain::task::Requirements;

/// Local view a worker process keeps of itself
///
/// Mirrors what the supervisor holds in its registry, but from the agent's
/// side: it decides whether an offered task is taken and tracks the one it
/// is running.
#[derive(Debug, Clone)]
pub struct WorkerAgent {
    id: AgentId,
    capabilities: BTreeSet<String>,
    status: AgentStatus,
    current_task: Option<Uuid>,
}

/// Outcome of reviewing a task frame
#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub reply: ClientMessage,
    pub accepted: bool,
}

impl WorkerAgent {
    pub fn new<I, S>(id: AgentId, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id,
            capabilities: capabilities.into_iter().map(Into::into).collect(),
            status: AgentStatus::Available,
            current_task: None,
        }
    }

    /// The `register` frame announcing this worker
    pub fn registration(&self) -> ClientMessage {
        ClientMessage::register(
            self.id.clone(),
            self.capabilities.iter().cloned().collect(),
            self.status,
        )
    }

    /// Check if this worker advertises everything `requirements` asks for
    pub fn can_handle(&self, requirements: &Requirements) -> bool {
        requirements
            .required_capabilities()
            .all(|capability| self.capabilities.contains(capability))
    }

    /// Decide on an offered task and build the acknowledgment
    ///
    /// An accepted task makes the worker busy until `finish` is called.
    pub fn review(&mut self, assignment: &TaskAssignment) -> Review {
        let rejection = if !self.can_handle(&assignment.requirements) {
            Some("Missing required capabilities")
        } else if self.status != AgentStatus::Available {
            Some("Agent is busy")
        } else {
            None
        };

        match rejection {
            Some(reason) => Review {
                reply: ClientMessage::acknowledge(assignment.task_id, AckStatus::Rejected, reason),
                accepted: false,
            },
            None => {
                self.status = AgentStatus::Busy;
                self.current_task = Some(assignment.task_id);
                Review {
                    reply: ClientMessage::acknowledge(
                        assignment.task_id,
                        AckStatus::Accepted,
                        "Task accepted",
                    ),
                    accepted: true,
                }
            }
        }
    }

    /// Return to available once `task_id` is done
    ///
    /// Finishing some other task is a no-op.
    pub fn finish(&mut self, task_id: Uuid) {
        if self.current_task == Some(task_id) {
            self.current_task = None;
            self.status = AgentStatus::Available;
        }
    }

    /// Forget the running task, e.g. after the connection dropped
    pub fn reset(&mut self) {
        self.current_task = None;
        self.status = AgentStatus::Available;
    }

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
}
