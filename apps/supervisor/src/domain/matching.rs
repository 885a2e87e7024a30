// Capability matching
//
// Pure functions over the registry and store. Nothing here mutates state;
// the supervisor decides what to do with the candidate it gets back.

use uuid::Uuid;

use crate::domain::agent::{Agent, ConnectionId};
use crate::domain::repositories::AgentRegistry;
use crate::domain::task::{Requirements, Task};

/// True if `agent` advertises every capability in `requirements`
///
/// Absent or empty capability requirements match any agent.
pub fn matches(agent: &Agent, requirements: &Requirements) -> bool {
    agent.has_capabilities(requirements.required_capabilities())
}

/// First available agent, in registry order, able to run a task with
/// `requirements`
///
/// This is first-fit: no load balancing, ties go to whoever registered
/// earlier.
pub fn find_assignable<'a, R>(
    registry: &'a R,
    requirements: &Requirements,
) -> Option<(ConnectionId, &'a Agent)>
where
    R: AgentRegistry + ?Sized,
{
    registry
        .iter()
        .find(|(_, agent)| agent.is_available() && matches(agent, requirements))
        .map(|(connection, agent)| (*connection, agent))
}

/// Oldest unoffered pending task that `agent` could run
pub fn next_task_for<'a, I>(agent: &Agent, pending: I) -> Option<Uuid>
where
    I: IntoIterator<Item = &'a Task>,
{
    pending
        .into_iter()
        .find(|task| task.is_unassigned_pending() && matches(agent, task.requirements()))
        .map(Task::id)
}
