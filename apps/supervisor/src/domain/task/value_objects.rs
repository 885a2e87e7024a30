use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

/// Represents the lifecycle status of a task
///
/// # Status Transitions
/// ```text
/// Pending ---> InProgress ---> Completed
///    ^  \          |     \---> Failed
///    |   \---------|-------> Completed | Failed
///    \-------------/ (requeue on disconnect)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting for an agent, possibly tentatively assigned
    Pending,
    /// Accepted by an agent and executing
    InProgress,
    /// Finished successfully
    Completed,
    /// Reported as failed by the executing agent
    Failed,
}

impl TaskStatus {
    /// Checks if a transition from current status to next status is valid
    ///
    /// # Valid Transitions
    /// - Pending -> InProgress | Completed | Failed
    /// - InProgress -> InProgress | Pending | Completed | Failed
    ///
    /// Completed and Failed are terminal.
    ///
    /// # Example
    /// ```
    /// use taskforce_supervisor::domain::task::TaskStatus;
    ///
    /// assert!(TaskStatus::Pending.can_transition_to(TaskStatus::InProgress));
    /// assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::Pending));
    /// ```
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Pending, InProgress)
                | (Pending, Completed)
                | (Pending, Failed)
                | (InProgress, InProgress)
                | (InProgress, Pending)
                | (InProgress, Completed)
                | (InProgress, Failed)
        )
    }

    /// Completed and Failed never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Status an agent may report through an `update` message
///
/// `Pending` is deliberately absent: only the supervisor moves a task back
/// to pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportedStatus {
    InProgress,
    Completed,
    Failed,
}

impl ReportedStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReportedStatus::InProgress)
    }
}

impl From<ReportedStatus> for TaskStatus {
    fn from(status: ReportedStatus) -> Self {
        match status {
            ReportedStatus::InProgress => TaskStatus::InProgress,
            ReportedStatus::Completed => TaskStatus::Completed,
            ReportedStatus::Failed => TaskStatus::Failed,
        }
    }
}

/// Task priority
///
/// Stored and forwarded to agents; assignment order ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskPriority::Low => write!(f, "low"),
            TaskPriority::Medium => write!(f, "medium"),
            TaskPriority::High => write!(f, "high"),
        }
    }
}

/// What a task needs from the agent that runs it
///
/// `capabilities` is the only field the matcher reads. Anything else the
/// submitter sends is kept verbatim in `extra` and forwarded to the agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Requirements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<BTreeSet<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Requirements {
    /// Requirements that any agent satisfies
    pub fn any() -> Self {
        Self::default()
    }

    /// Requirements demanding every capability in `capabilities`
    pub fn with_capabilities<I, S>(capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            capabilities: Some(capabilities.into_iter().map(Into::into).collect()),
            extra: Map::new(),
        }
    }

    /// Iterates the required capabilities; empty when none are set
    pub fn required_capabilities(&self) -> impl Iterator<Item = &String> {
        self.capabilities.iter().flatten()
    }
}

/// Completion percentage reported for a task
///
/// # Invariants
/// - Always within 0..=100
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Progress(u8);

impl Progress {
    pub const COMPLETE: Progress = Progress(100);

    /// Creates a new Progress value object
    ///
    /// # Returns
    /// * `Ok(Progress)` - If `value` is within 0..=100
    /// * `Err(String)` - Otherwise
    pub fn new(value: i64) -> Result<Self, String> {
        if (0..=100).contains(&value) {
            Ok(Progress(value as u8))
        } else {
            Err(format!("Progress must be between 0 and 100, got {}", value))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Progress {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Progress::new(value)
    }
}

impl From<Progress> for u8 {
    fn from(progress: Progress) -> Self {
        progress.0
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}
