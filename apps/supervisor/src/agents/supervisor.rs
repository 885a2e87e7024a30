use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::errors::{SupervisorError, SupervisorResult};
use super::messages::{
    AckStatus, Acknowledgment, ClientMessage, Registration, ServerMessage, TaskAssignment,
    TaskUpdate,
};
use super::outbound::OutboundChannel;
use super::state::{AgentSnapshot, HealthReport, NewTask, TaskSnapshot};
use crate::domain::agent::{Agent, AgentId, ConnectionId};
use crate::domain::matching;
use crate::domain::repositories::{AgentRegistry, TaskStore};
use crate::domain::task::{Progress, Requirements, Task, TaskEvent, TaskPriority, TaskStatus};
use crate::infrastructure::repositories::{InMemoryAgentRegistry, InMemoryTaskStore};

/// Coordinator that owns the agent registry and task store
///
/// Drives every task/agent transition in response to protocol events and
/// operator calls. Each method runs one transition to completion, touching
/// both stores together, so the joint invariants hold between calls:
/// - an agent is busy exactly when it holds a current task
/// - tasks only go to agents advertising every required capability
/// - completed and failed tasks never change again
///
/// The supervisor is single-threaded by construction (`&mut self`); the
/// dispatcher serializes concurrent connections onto it.
pub struct Supervisor<O, R = InMemoryAgentRegistry, S = InMemoryTaskStore> {
    id: String,
    agents: R,
    tasks: S,
    // Connection each offered or running task was sent to
    holders: HashMap<Uuid, ConnectionId>,
    outbound: O,
}

impl<O: OutboundChannel> Supervisor<O> {
    /// Create a supervisor with empty in-memory stores
    pub fn new(id: impl Into<String>, outbound: O) -> Self {
        Self::with_stores(
            id,
            InMemoryAgentRegistry::new(),
            InMemoryTaskStore::new(),
            outbound,
        )
    }
}

impl<O, R, S> Supervisor<O, R, S>
where
    O: OutboundChannel,
    R: AgentRegistry,
    S: TaskStore,
{
    pub fn with_stores(id: impl Into<String>, agents: R, tasks: S, outbound: O) -> Self {
        Self {
            id: id.into(),
            agents,
            tasks,
            holders: HashMap::new(),
            outbound,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn outbound(&self) -> &O {
        &self.outbound
    }

    pub fn outbound_mut(&mut self) -> &mut O {
        &mut self.outbound
    }

    /// Route one inbound frame from `connection`
    pub fn handle(&mut self, connection: ConnectionId, message: ClientMessage) -> SupervisorResult<()> {
        match message {
            ClientMessage::Register(registration) => {
                self.register(connection, registration);
                Ok(())
            }
            ClientMessage::Acknowledge(ack) => self.acknowledge(connection, ack),
            ClientMessage::Update(update) => self.update(connection, update),
        }
    }

    /// Create or replace the agent record for `connection`
    ///
    /// Replies with `registration_response`, then offers the agent the
    /// oldest pending task it can run, if any.
    pub fn register(&mut self, connection: ConnectionId, registration: Registration) {
        let mut agent = Agent::register(
            registration.agent_id,
            registration.capabilities,
            registration.status,
        );

        let mut orphaned = Vec::new();
        if let Some(previous) = self.agents.get(&connection).cloned() {
            if previous.id() == agent.id() {
                if let Some(held) = previous.current_task() {
                    // Fresh record, occupy cannot fail
                    let _ = agent.occupy(held);
                }
            } else {
                orphaned = self.requeue_held_on(&connection);
            }
        }

        info!(
            connection = %connection,
            agent_id = %agent.id(),
            capabilities = ?agent.capabilities(),
            status = %agent.status(),
            "Agent registered"
        );

        self.agents.put(connection, agent);
        self.outbound
            .send(&connection, ServerMessage::registration_accepted(&self.id));

        for task_id in orphaned {
            self.assign(task_id);
        }
        self.assign_pending_to(&connection);
    }

    /// Apply an agent's answer to a task offer
    ///
    /// Only the connection the task was sent to may answer. Rejecting a
    /// task already in progress hands it back to the pool.
    pub fn acknowledge(&mut self, connection: ConnectionId, ack: Acknowledgment) -> SupervisorResult<()> {
        let agent_id = self.agent_id_on(&connection)?;
        let task_id = ack.task_id;
        let status = self.ensure_held_on(task_id, &connection, &agent_id)?;

        match ack.status {
            AckStatus::Accepted => {
                let holding_other = self
                    .agents
                    .get(&connection)
                    .and_then(Agent::current_task)
                    .filter(|current| *current != task_id);

                if let Some(current) = holding_other {
                    warn!(
                        task_id = %task_id,
                        agent_id = %agent_id,
                        current_task = %current,
                        "Agent accepted a task while busy, treating as rejection"
                    );
                    self.withdraw_offer(task_id, &agent_id)?;
                    self.assign(task_id);
                    return Ok(());
                }

                let event = self.transition(task_id, |task| task.accept(&agent_id))?;
                if let Some(agent) = self.agents.get_mut(&connection) {
                    agent.occupy(task_id).map_err(|reason| {
                        SupervisorError::InvalidStateTransition { task_id, reason }
                    })?;
                }
                self.record(&event);
            }
            AckStatus::Rejected if status == TaskStatus::InProgress => {
                let event = self.transition(task_id, Task::requeue)?;
                self.holders.remove(&task_id);
                if let Some(agent) = self.agents.get_mut(&connection) {
                    if agent.current_task() == Some(task_id) {
                        let _ = agent.release(task_id);
                    }
                }
                self.record(&event);
                warn!(task_id = %task_id, agent_id = %agent_id, "Agent abandoned running task");
                self.assign(task_id);
            }
            AckStatus::Rejected => {
                self.withdraw_offer(task_id, &agent_id)?;
                self.assign(task_id);
            }
        }

        info!(
            task_id = %task_id,
            agent_id = %agent_id,
            status = ?ack.status,
            message = %ack.message,
            "Task acknowledgment handled"
        );
        Ok(())
    }

    /// Apply a progress report from the connection holding the task
    ///
    /// A terminal report frees the agent and offers it the next pending
    /// task it can run. Failed tasks are not retried.
    pub fn update(&mut self, connection: ConnectionId, update: TaskUpdate) -> SupervisorResult<()> {
        let agent_id = self.agent_id_on(&connection)?;
        let task_id = update.task_id;
        let status = self.ensure_held_on(task_id, &connection, &agent_id)?;
        let implicit_accept = status == TaskStatus::Pending && !update.status.is_terminal();

        let progress = Progress::new(update.progress)
            .map_err(|reason| SupervisorError::InvalidProgress { task_id, reason })?;

        let holder = self.agents.get(&connection).and_then(Agent::current_task);
        if implicit_accept && holder.is_some_and(|current| current != task_id) {
            return Err(SupervisorError::InvalidStateTransition {
                task_id,
                reason: format!("Agent {} is busy with another task", agent_id),
            });
        }

        let event = self.transition(task_id, |task| {
            task.report(update.status, progress, update.result)
        })?;
        self.record(&event);

        if update.status.is_terminal() {
            self.holders.remove(&task_id);
        }
        if let Some(agent) = self.agents.get_mut(&connection) {
            if update.status.is_terminal() {
                if agent.current_task() == Some(task_id) {
                    // Holder checked above
                    let _ = agent.release(task_id);
                }
            } else if implicit_accept {
                let _ = agent.occupy(task_id);
            }
        }

        info!(
            task_id = %task_id,
            agent_id = %agent_id,
            status = ?update.status,
            progress = progress.value(),
            "Task update handled"
        );

        if update.status.is_terminal() {
            self.assign_pending_to(&connection);
        }
        Ok(())
    }

    /// Remove the agent on `connection` and requeue everything sent to it
    ///
    /// Both the running task and outstanding offers go back to the pool.
    /// The record goes first, so requeued work is offered only to the
    /// remaining agents.
    pub fn disconnect(&mut self, connection: ConnectionId) -> SupervisorResult<()> {
        let agent = self
            .agents
            .remove(&connection)
            .ok_or(SupervisorError::UnknownConnection(connection))?;

        let requeued = self.requeue_held_on(&connection);

        info!(
            connection = %connection,
            agent_id = %agent.id(),
            requeued = requeued.len(),
            "Agent disconnected"
        );

        for task_id in requeued {
            self.assign(task_id);
        }
        Ok(())
    }

    /// Store a new task and try to place it straight away
    pub fn add_task(&mut self, new_task: NewTask) -> SupervisorResult<Task> {
        let NewTask {
            description,
            requirements,
            priority,
            deadline,
        } = new_task;
        self.create_task(description, requirements, priority, deadline)
    }

    pub fn create_task(
        &mut self,
        description: String,
        requirements: Requirements,
        priority: TaskPriority,
        deadline: DateTime<Utc>,
    ) -> SupervisorResult<Task> {
        let (task, event) = self
            .tasks
            .create(description, requirements, priority, deadline)
            .map_err(SupervisorError::InvalidTask)?;
        self.record(&event);
        info!(task_id = %task.id(), priority = %task.priority(), "New task added");

        self.assign(task.id());

        Ok(self.tasks.get(&task.id()).cloned().unwrap_or(task))
    }

    /// Offer the task to the first available capable agent
    ///
    /// Leaves the task pending either way; only the agent's
    /// acknowledgment moves it on. Returns the connection the offer went
    /// to.
    pub fn assign(&mut self, task_id: Uuid) -> Option<ConnectionId> {
        let task = self.tasks.get(&task_id)?;
        if !task.is_unassigned_pending() {
            debug!(task_id = %task_id, status = %task.status(), "Task not eligible for assignment");
            return None;
        }

        let Some((connection, agent)) = matching::find_assignable(&self.agents, task.requirements())
        else {
            info!(task_id = %task_id, "No available agent found for task");
            return None;
        };
        let agent_id = agent.id().clone();

        let offered = self.tasks.update(&task_id, |task| {
            task.assign_to(&agent_id)
                .map(|event| (event, TaskAssignment::from(&*task)))
        })?;

        match offered {
            Ok((event, assignment)) => {
                self.record(&event);
                self.holders.insert(task_id, connection);
                self.outbound.send(&connection, ServerMessage::Task(assignment));
                info!(task_id = %task_id, agent_id = %agent_id, "Task assigned");
                Some(connection)
            }
            Err(reason) => {
                warn!(task_id = %task_id, reason = %reason, "Task assignment refused");
                None
            }
        }
    }

    /// Offer every unassigned pending task again, oldest first
    ///
    /// Returns how many offers went out.
    pub fn sweep(&mut self) -> usize {
        let waiting: Vec<Uuid> = self
            .tasks
            .pending_tasks()
            .into_iter()
            .filter(|task| task.is_unassigned_pending())
            .map(Task::id)
            .collect();

        let offered = waiting
            .into_iter()
            .filter_map(|task_id| self.assign(task_id))
            .count();

        if offered > 0 {
            info!(offered, "Pending task sweep placed tasks");
        }
        offered
    }

    // ===== Snapshots =====

    pub fn agent_snapshot(&self) -> AgentSnapshot {
        self.agents
            .iter()
            .map(|(connection, agent)| (*connection, agent.clone()))
            .collect()
    }

    pub fn task_snapshot(&self) -> TaskSnapshot {
        self.tasks.iter().map(|task| (task.id(), task.clone())).collect()
    }

    pub fn task(&self, task_id: &Uuid) -> Option<Task> {
        self.tasks.get(task_id).cloned()
    }

    pub fn agent(&self, connection: &ConnectionId) -> Option<Agent> {
        self.agents.get(connection).cloned()
    }

    pub fn health(&self) -> HealthReport {
        HealthReport::ok(self.agents.len(), self.tasks.len())
    }

    // ===== Internals =====

    /// Offer the oldest matching pending task to the agent on `connection`
    fn assign_pending_to(&mut self, connection: &ConnectionId) {
        let Some(agent) = self.agents.get(connection) else {
            return;
        };
        if !agent.is_available() {
            return;
        }

        if let Some(task_id) = matching::next_task_for(agent, self.tasks.pending_tasks()) {
            self.assign(task_id);
        }
    }

    /// Requeue every task offered to or running on `connection`,
    /// oldest first
    fn requeue_held_on(&mut self, connection: &ConnectionId) -> Vec<Uuid> {
        let held: Vec<Uuid> = self
            .tasks
            .iter()
            .map(Task::id)
            .filter(|task_id| self.holders.get(task_id) == Some(connection))
            .collect();

        let mut requeued = Vec::with_capacity(held.len());
        for task_id in held {
            self.holders.remove(&task_id);
            match self.transition(task_id, Task::requeue) {
                Ok(event) => {
                    self.record(&event);
                    requeued.push(task_id);
                }
                Err(err) => warn!(task_id = %task_id, error = %err, "Task not requeued"),
            }
        }
        requeued
    }

    fn withdraw_offer(&mut self, task_id: Uuid, agent_id: &AgentId) -> SupervisorResult<()> {
        let event = self.transition(task_id, |task| task.reject(agent_id))?;
        self.holders.remove(&task_id);
        self.record(&event);
        Ok(())
    }

    /// Check that `task_id` is live and was sent to `connection`
    ///
    /// Returns the task's current status.
    fn ensure_held_on(
        &self,
        task_id: Uuid,
        connection: &ConnectionId,
        agent_id: &AgentId,
    ) -> SupervisorResult<TaskStatus> {
        let task = self
            .tasks
            .get(&task_id)
            .ok_or(SupervisorError::UnknownTask(task_id))?;

        if task.status().is_terminal() {
            return Err(SupervisorError::InvalidStateTransition {
                task_id,
                reason: format!("Task is already {}", task.status()),
            });
        }
        if self.holders.get(&task_id) != Some(connection) || !task.is_assigned_to(agent_id) {
            return Err(SupervisorError::NotAssigned {
                task_id,
                agent_id: agent_id.clone(),
            });
        }
        Ok(task.status())
    }

    fn agent_id_on(&self, connection: &ConnectionId) -> SupervisorResult<AgentId> {
        self.agents
            .get(connection)
            .map(|agent| agent.id().clone())
            .ok_or(SupervisorError::UnknownConnection(*connection))
    }

    fn transition<F>(&mut self, task_id: Uuid, apply: F) -> SupervisorResult<TaskEvent>
    where
        F: FnOnce(&mut Task) -> Result<TaskEvent, String>,
    {
        self.tasks
            .update(&task_id, apply)
            .ok_or(SupervisorError::UnknownTask(task_id))?
            .map_err(|reason| SupervisorError::InvalidStateTransition { task_id, reason })
    }

    fn record(&self, event: &TaskEvent) {
        debug!(
            task_id = %event.task_id(),
            event = event.kind(),
            details = ?event,
            "Task event"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::outbound::RecordingOutbound;
    use crate::domain::agent::AgentStatus;
    use chrono::Duration;

    fn supervisor() -> Supervisor<RecordingOutbound> {
        Supervisor::new("supervisor-test", RecordingOutbound::new())
    }

    fn register(s: &mut Supervisor<RecordingOutbound>, id: &str, caps: &[&str]) -> ConnectionId {
        let connection = ConnectionId::new();
        s.handle(
            connection,
            ClientMessage::register(
                AgentId::new(id).unwrap(),
                caps.iter().map(|c| c.to_string()).collect(),
                AgentStatus::Available,
            ),
        )
        .unwrap();
        connection
    }

    fn add(s: &mut Supervisor<RecordingOutbound>, caps: &[&str]) -> Task {
        s.create_task(
            "work".to_string(),
            Requirements::with_capabilities(caps.iter().copied()),
            TaskPriority::High,
            Utc::now() + Duration::hours(1),
        )
        .unwrap()
    }

    fn ack(task_id: Uuid, status: AckStatus) -> ClientMessage {
        ClientMessage::acknowledge(task_id, status, "")
    }

    fn assert_busy_iff_holding(s: &Supervisor<RecordingOutbound>) {
        for agent in s.agent_snapshot().values() {
            assert_eq!(
                agent.status() == AgentStatus::Busy,
                agent.current_task().is_some(),
                "agent {} breaks busy/current_task invariant",
                agent.id()
            );
        }
    }

    #[test]
    fn registration_replies_with_supervisor_id() {
        let mut s = supervisor();
        let connection = register(&mut s, "x", &["a"]);

        let sent = s.outbound().sent_to(&connection);
        assert_eq!(sent.len(), 1);
        match sent[0] {
            ServerMessage::RegistrationResponse(response) => {
                assert_eq!(response.supervisor_id, "supervisor-test")
            }
            other => panic!("Expected registration response, got {:?}", other),
        }
    }

    #[test]
    fn add_task_rejects_empty_description() {
        let mut s = supervisor();

        let result = s.create_task(String::new(), Requirements::any(), TaskPriority::Low, Utc::now());

        assert!(matches!(result, Err(SupervisorError::InvalidTask(_))));
        assert_eq!(s.health().tasks, 0);
    }

    #[test]
    fn add_task_offers_to_capable_agent() {
        let mut s = supervisor();
        let connection = register(&mut s, "x", &["a", "b"]);

        let task = add(&mut s, &["a"]);

        assert_eq!(task.assigned_agent().map(AgentId::as_str), Some("x"));
        assert_eq!(task.status(), TaskStatus::Pending);
        assert!(matches!(
            s.outbound().sent_to(&connection).last(),
            Some(ServerMessage::Task(assignment)) if assignment.task_id == task.id()
        ));
    }

    #[test]
    fn registration_offers_only_one_task() {
        let mut s = supervisor();
        let first = add(&mut s, &["a"]);
        let second = add(&mut s, &["a"]);

        register(&mut s, "x", &["a"]);

        assert!(s.task(&first.id()).unwrap().assigned_agent().is_some());
        assert!(s.task(&second.id()).unwrap().assigned_agent().is_none());
    }

    #[test]
    fn registration_skips_tasks_beyond_capabilities() {
        let mut s = supervisor();
        let gpu = add(&mut s, &["gpu"]);
        let cpu = add(&mut s, &["cpu"]);

        register(&mut s, "x", &["cpu"]);

        assert!(s.task(&gpu.id()).unwrap().assigned_agent().is_none());
        assert!(s.task(&cpu.id()).unwrap().assigned_agent().is_some());
    }

    #[test]
    fn acknowledge_from_unregistered_connection() {
        let mut s = supervisor();
        let task = add(&mut s, &[]);
        let stranger = ConnectionId::new();

        let result = s.handle(stranger, ack(task.id(), AckStatus::Accepted));

        assert_eq!(result, Err(SupervisorError::UnknownConnection(stranger)));
    }

    #[test]
    fn acknowledge_of_unknown_task() {
        let mut s = supervisor();
        let connection = register(&mut s, "x", &[]);
        let missing = Uuid::new_v4();

        let result = s.handle(connection, ack(missing, AckStatus::Accepted));

        assert_eq!(result, Err(SupervisorError::UnknownTask(missing)));
        assert_busy_iff_holding(&s);
    }

    #[test]
    fn acknowledge_from_agent_without_offer() {
        let mut s = supervisor();
        register(&mut s, "x", &["a"]);
        let y = register(&mut s, "y", &["a"]);
        let task = add(&mut s, &["a"]);

        let result = s.handle(y, ack(task.id(), AckStatus::Accepted));

        assert!(matches!(result, Err(SupervisorError::NotAssigned { .. })));
        assert_eq!(s.task(&task.id()).unwrap().status(), TaskStatus::Pending);
        assert!(s.agent(&y).unwrap().current_task().is_none());
    }

    #[test]
    fn rejection_with_no_alternative_leaves_task_pending() {
        let mut s = supervisor();
        let x = register(&mut s, "x", &["a"]);
        let task = add(&mut s, &["a"]);
        s.outbound_mut().drain();

        s.handle(x, ack(task.id(), AckStatus::Rejected)).unwrap();

        // First-fit finds the rejecting agent again; it is still available
        let stored = s.task(&task.id()).unwrap();
        assert_eq!(stored.status(), TaskStatus::Pending);
        assert_eq!(stored.assigned_agent().map(AgentId::as_str), Some("x"));
        assert_eq!(s.outbound().sent_to(&x).len(), 1);
    }

    #[test]
    fn accepting_while_busy_is_treated_as_rejection() {
        let mut s = supervisor();
        let x = register(&mut s, "x", &["a"]);
        let first = add(&mut s, &["a"]);
        let second = add(&mut s, &["a"]);
        s.handle(x, ack(first.id(), AckStatus::Accepted)).unwrap();

        s.handle(x, ack(second.id(), AckStatus::Accepted)).unwrap();

        assert_eq!(s.agent(&x).unwrap().current_task(), Some(first.id()));
        let second = s.task(&second.id()).unwrap();
        assert!(second.is_unassigned_pending());
        assert_busy_iff_holding(&s);
    }

    #[test]
    fn progress_update_keeps_task_in_progress() {
        let mut s = supervisor();
        let x = register(&mut s, "x", &[]);
        let task = add(&mut s, &[]);
        s.handle(x, ack(task.id(), AckStatus::Accepted)).unwrap();

        s.handle(
            x,
            ClientMessage::update(
                task.id(),
                crate::domain::task::ReportedStatus::InProgress,
                Progress::new(40).unwrap(),
                None,
            ),
        )
        .unwrap();

        let stored = s.task(&task.id()).unwrap();
        assert_eq!(stored.status(), TaskStatus::InProgress);
        assert_eq!(stored.progress().value(), 40);
        assert_eq!(s.agent(&x).unwrap().status(), AgentStatus::Busy);
    }

    #[test]
    fn update_with_out_of_range_progress() {
        let mut s = supervisor();
        let x = register(&mut s, "x", &[]);
        let task = add(&mut s, &[]);
        s.handle(x, ack(task.id(), AckStatus::Accepted)).unwrap();

        let result = s.update(
            x,
            TaskUpdate {
                task_id: task.id(),
                status: crate::domain::task::ReportedStatus::InProgress,
                progress: 140,
                result: None,
                timestamp: Utc::now(),
            },
        );

        assert!(matches!(result, Err(SupervisorError::InvalidProgress { .. })));
        assert_eq!(s.task(&task.id()).unwrap().progress().value(), 0);
    }

    #[test]
    fn in_progress_update_without_ack_is_implicit_acceptance() {
        let mut s = supervisor();
        let x = register(&mut s, "x", &[]);
        let task = add(&mut s, &[]);

        s.handle(
            x,
            ClientMessage::update(
                task.id(),
                crate::domain::task::ReportedStatus::InProgress,
                Progress::new(20).unwrap(),
                None,
            ),
        )
        .unwrap();

        assert_eq!(s.task(&task.id()).unwrap().status(), TaskStatus::InProgress);
        assert_eq!(s.agent(&x).unwrap().current_task(), Some(task.id()));
        assert_busy_iff_holding(&s);
    }

    #[test]
    fn disconnect_of_unknown_connection() {
        let mut s = supervisor();
        let stranger = ConnectionId::new();

        assert_eq!(
            s.disconnect(stranger),
            Err(SupervisorError::UnknownConnection(stranger))
        );
    }

    #[test]
    fn disconnect_releases_tentative_offers() {
        let mut s = supervisor();
        let x = register(&mut s, "x", &["a"]);
        let task = add(&mut s, &["a"]);
        let y = register(&mut s, "y", &["a"]);

        s.disconnect(x).unwrap();

        let stored = s.task(&task.id()).unwrap();
        assert_eq!(stored.assigned_agent().map(AgentId::as_str), Some("y"));
        assert!(matches!(
            s.outbound().sent_to(&y).last(),
            Some(ServerMessage::Task(_))
        ));
    }

    #[test]
    fn reregistration_with_same_id_keeps_held_task() {
        let mut s = supervisor();
        let x = register(&mut s, "x", &["a"]);
        let task = add(&mut s, &["a"]);
        s.handle(x, ack(task.id(), AckStatus::Accepted)).unwrap();

        s.handle(
            x,
            ClientMessage::register(
                AgentId::new("x").unwrap(),
                vec!["a".to_string(), "b".to_string()],
                AgentStatus::Available,
            ),
        )
        .unwrap();

        let agent = s.agent(&x).unwrap();
        assert_eq!(agent.current_task(), Some(task.id()));
        assert_eq!(agent.status(), AgentStatus::Busy);
        assert_eq!(agent.capabilities().len(), 2);
        assert_eq!(s.task(&task.id()).unwrap().status(), TaskStatus::InProgress);
    }

    #[test]
    fn reregistration_under_new_id_requeues_held_task() {
        let mut s = supervisor();
        let x = register(&mut s, "x", &["a"]);
        let task = add(&mut s, &["a"]);
        s.handle(x, ack(task.id(), AckStatus::Accepted)).unwrap();

        s.handle(
            x,
            ClientMessage::register(
                AgentId::new("x-renamed").unwrap(),
                vec!["a".to_string()],
                AgentStatus::Available,
            ),
        )
        .unwrap();

        let stored = s.task(&task.id()).unwrap();
        assert_eq!(stored.status(), TaskStatus::Pending);
        assert_eq!(stored.assigned_agent().map(AgentId::as_str), Some("x-renamed"));
        assert_busy_iff_holding(&s);
    }

    #[test]
    fn reregistration_under_new_id_keeps_offers_on_other_connections() {
        let mut s = supervisor();
        let first = register(&mut s, "x", &["a"]);
        let task = add(&mut s, &["a"]);
        let second = register(&mut s, "x", &["a"]);

        s.handle(
            second,
            ClientMessage::register(AgentId::new("z").unwrap(), vec!["a".to_string()], AgentStatus::Available),
        )
        .unwrap();

        let offers = s
            .outbound()
            .sent_to(&first)
            .into_iter()
            .filter(|message| matches!(message, ServerMessage::Task(_)))
            .count();
        assert_eq!(offers, 1);
        assert!(s.outbound().sent_to(&second).iter().all(|m| !matches!(m, ServerMessage::Task(_))));
        assert!(s.handle(first, ack(task.id(), AckStatus::Accepted)).is_ok());
        assert_eq!(s.agent(&first).unwrap().current_task(), Some(task.id()));
    }

    #[test]
    fn acknowledge_from_other_connection_with_same_id() {
        let mut s = supervisor();
        let first = register(&mut s, "x", &["a"]);
        let task = add(&mut s, &["a"]);
        let second = register(&mut s, "x", &["a"]);

        let result = s.handle(second, ack(task.id(), AckStatus::Accepted));

        assert!(matches!(result, Err(SupervisorError::NotAssigned { .. })));
        assert!(s.agent(&second).unwrap().current_task().is_none());
        assert_eq!(s.task(&task.id()).unwrap().status(), TaskStatus::Pending);

        s.handle(first, ack(task.id(), AckStatus::Accepted)).unwrap();
        s.handle(
            first,
            ClientMessage::update(
                task.id(),
                crate::domain::task::ReportedStatus::Completed,
                Progress::COMPLETE,
                None,
            ),
        )
        .unwrap();

        assert_eq!(s.agent(&first).unwrap().status(), AgentStatus::Available);
        assert_eq!(s.agent(&second).unwrap().status(), AgentStatus::Available);
        assert_busy_iff_holding(&s);
    }

    #[test]
    fn update_from_other_connection_with_same_id() {
        let mut s = supervisor();
        let first = register(&mut s, "x", &[]);
        let task = add(&mut s, &[]);
        let second = register(&mut s, "x", &[]);
        s.handle(first, ack(task.id(), AckStatus::Accepted)).unwrap();

        let result = s.handle(
            second,
            ClientMessage::update(
                task.id(),
                crate::domain::task::ReportedStatus::Completed,
                Progress::COMPLETE,
                None,
            ),
        );

        assert!(matches!(result, Err(SupervisorError::NotAssigned { .. })));
        assert_eq!(s.task(&task.id()).unwrap().status(), TaskStatus::InProgress);
        assert_eq!(s.agent(&first).unwrap().current_task(), Some(task.id()));
    }

    #[test]
    fn rejecting_running_task_requeues_it() {
        let mut s = supervisor();
        let x = register(&mut s, "x", &["a"]);
        let task = add(&mut s, &["a"]);
        s.handle(x, ack(task.id(), AckStatus::Accepted)).unwrap();
        let y = register(&mut s, "y", &["a"]);
        // Drop `x`'s capabilities so the requeued task lands on `y`
        s.handle(
            x,
            ClientMessage::register(AgentId::new("x").unwrap(), vec![], AgentStatus::Available),
        )
        .unwrap();

        s.handle(x, ack(task.id(), AckStatus::Rejected)).unwrap();

        let stored = s.task(&task.id()).unwrap();
        assert_eq!(stored.status(), TaskStatus::Pending);
        assert_eq!(stored.assigned_agent().map(AgentId::as_str), Some("y"));
        assert!(s.agent(&x).unwrap().current_task().is_none());
        assert!(matches!(
            s.outbound().sent_to(&y).last(),
            Some(ServerMessage::Task(assignment)) if assignment.task_id == task.id()
        ));
        assert_busy_iff_holding(&s);
    }

    #[test]
    fn offline_agents_receive_nothing() {
        let mut s = supervisor();
        let connection = ConnectionId::new();
        s.register(
            connection,
            Registration {
                agent_id: AgentId::new("sleepy").unwrap(),
                capabilities: vec![],
                status: AgentStatus::Offline,
                timestamp: Utc::now(),
            },
        );

        let task = add(&mut s, &[]);

        assert!(task.assigned_agent().is_none());
        assert_eq!(s.outbound().sent_to(&connection).len(), 1);
    }

    #[test]
    fn sweep_offers_tasks_left_waiting() {
        let mut s = supervisor();
        let first = add(&mut s, &["a"]);
        let second = add(&mut s, &["a"]);
        let unplaceable = add(&mut s, &["z"]);
        register(&mut s, "x", &["a"]);

        // Registration places a single task
        assert!(s.task(&first.id()).unwrap().assigned_agent().is_some());
        assert!(s.task(&second.id()).unwrap().is_unassigned_pending());

        assert_eq!(s.sweep(), 1);
        assert_eq!(
            s.task(&second.id()).unwrap().assigned_agent().map(AgentId::as_str),
            Some("x")
        );
        assert!(s.task(&unplaceable.id()).unwrap().is_unassigned_pending());
        assert_eq!(s.sweep(), 0);
    }

    #[test]
    fn health_counts_agents_and_tasks() {
        let mut s = supervisor();
        register(&mut s, "x", &[]);
        add(&mut s, &[]);
        add(&mut s, &[]);

        assert_eq!(s.health(), HealthReport::ok(1, 2));
    }

    #[test]
    fn snapshots_are_copies() {
        let mut s = supervisor();
        let x = register(&mut s, "x", &[]);
        let task = add(&mut s, &[]);

        let mut agents = s.agent_snapshot();
        agents.remove(&x);
        let mut tasks = s.task_snapshot();
        tasks.clear();

        assert!(s.agent(&x).is_some());
        assert!(s.task(&task.id()).is_some());
    }
}
