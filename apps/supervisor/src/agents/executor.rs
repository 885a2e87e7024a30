// Task execution on the agent side
//
// The runtime hands every accepted task to a TaskExecutor. Executors push
// in_progress updates through a ProgressReporter while they run; the
// terminal update is sent by the runtime from the returned result.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use super::errors::{AgentError, AgentResult};
use super::messages::{ClientMessage, TaskAssignment};
use crate::domain::task::{Progress, ReportedStatus};

/// Sends in_progress updates for one task
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    task_id: Uuid,
    outbox: mpsc::UnboundedSender<ClientMessage>,
}

impl ProgressReporter {
    pub fn new(task_id: Uuid, outbox: mpsc::UnboundedSender<ClientMessage>) -> Self {
        Self { task_id, outbox }
    }

    pub fn task_id(&self) -> Uuid {
        self.task_id
    }

    pub fn report(&self, progress: Progress) -> AgentResult<()> {
        debug!(task_id = %self.task_id, %progress, "Reporting progress");
        self.outbox
            .send(ClientMessage::update(
                self.task_id,
                ReportedStatus::InProgress,
                progress,
                None,
            ))
            .map_err(|_| AgentError::ChannelClosed("supervisor connection".to_string()))
    }
}

#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Run `assignment` to completion and return its result payload
    async fn execute(
        &self,
        assignment: &TaskAssignment,
        reporter: &ProgressReporter,
    ) -> AgentResult<Value>;
}

/// Stand-in executor that walks through fixed progress steps
#[derive(Debug, Clone)]
pub struct SimulatedExecutor {
    step_delay: Duration,
}

impl SimulatedExecutor {
    const STEPS: [i64; 5] = [0, 20, 40, 60, 80];

    pub fn new(step_delay: Duration) -> Self {
        Self { step_delay }
    }
}

#[async_trait]
impl TaskExecutor for SimulatedExecutor {
    async fn execute(
        &self,
        assignment: &TaskAssignment,
        reporter: &ProgressReporter,
    ) -> AgentResult<Value> {
        for step in Self::STEPS {
            let progress = Progress::new(step).map_err(AgentError::TaskExecutionFailed)?;
            reporter.report(progress)?;
            tokio::time::sleep(self.step_delay).await;
        }

        debug!(task_id = %assignment.task_id, "Simulated execution finished");
        Ok(json!({
            "completed_at": Utc::now(),
            "result": "Task execution successful",
        }))
    }
}
