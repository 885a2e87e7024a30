// Single coordination loop in front of the supervisor
//
// Connections and operator handlers never touch the supervisor directly.
// They push commands onto one unbounded queue; a single task pops them
// and applies each to completion before looking at the next. A
// connection's Disconnect is queued behind its own in-flight frames, so
// it is always seen last.

use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::errors::{SupervisorError, SupervisorResult};
use super::messages::ClientMessage;
use super::state::{AgentSnapshot, HealthReport, NewTask, TaskSnapshot};
use super::supervisor::Supervisor;
use crate::domain::agent::ConnectionId;
use crate::domain::task::Task;
use crate::infrastructure::connections::{ConnectionHub, Outbox};

/// Everything the dispatcher loop can be asked to do
#[derive(Debug)]
pub enum Command {
    Connect {
        connection: ConnectionId,
        outbox: Outbox,
    },
    Inbound {
        connection: ConnectionId,
        message: ClientMessage,
    },
    Disconnect {
        connection: ConnectionId,
    },
    AddTask {
        new_task: NewTask,
        reply: oneshot::Sender<SupervisorResult<Task>>,
    },
    Agents {
        reply: oneshot::Sender<AgentSnapshot>,
    },
    Tasks {
        reply: oneshot::Sender<TaskSnapshot>,
    },
    Task {
        task_id: Uuid,
        reply: oneshot::Sender<Option<Task>>,
    },
    Health {
        reply: oneshot::Sender<HealthReport>,
    },
}

/// Cloneable front door to a running dispatcher
#[derive(Debug, Clone)]
pub struct SupervisorHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl SupervisorHandle {
    /// Register the outbox of a newly accepted socket
    pub fn connect(&self, connection: ConnectionId, outbox: Outbox) -> SupervisorResult<()> {
        self.submit(Command::Connect { connection, outbox })
    }

    /// Queue a frame received on `connection`
    pub fn deliver(&self, connection: ConnectionId, message: ClientMessage) -> SupervisorResult<()> {
        self.submit(Command::Inbound {
            connection,
            message,
        })
    }

    /// Queue the teardown of `connection`
    pub fn disconnect(&self, connection: ConnectionId) -> SupervisorResult<()> {
        self.submit(Command::Disconnect { connection })
    }

    pub async fn add_task(&self, new_task: NewTask) -> SupervisorResult<Task> {
        self.request(|reply| Command::AddTask { new_task, reply })
            .await?
    }

    pub async fn agents(&self) -> SupervisorResult<AgentSnapshot> {
        self.request(|reply| Command::Agents { reply }).await
    }

    pub async fn tasks(&self) -> SupervisorResult<TaskSnapshot> {
        self.request(|reply| Command::Tasks { reply }).await
    }

    pub async fn task(&self, task_id: Uuid) -> SupervisorResult<Option<Task>> {
        self.request(|reply| Command::Task { task_id, reply }).await
    }

    pub async fn health(&self) -> SupervisorResult<HealthReport> {
        self.request(|reply| Command::Health { reply }).await
    }

    fn submit(&self, command: Command) -> SupervisorResult<()> {
        self.commands
            .send(command)
            .map_err(|_| SupervisorError::DispatcherUnavailable)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> SupervisorResult<T> {
        let (reply, response) = oneshot::channel();
        self.submit(build(reply))?;
        response
            .await
            .map_err(|_| SupervisorError::DispatcherUnavailable)
    }
}

/// Start the dispatcher loop on the current runtime
///
/// With `sweep_interval` set, unassigned pending tasks are offered again
/// on every tick. The loop ends once every handle has been dropped.
pub fn spawn(
    supervisor: Supervisor<ConnectionHub>,
    sweep_interval: Option<Duration>,
) -> (SupervisorHandle, JoinHandle<()>) {
    let (commands, queue) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(supervisor, queue, sweep_interval));
    (SupervisorHandle { commands }, task)
}

async fn run(
    mut supervisor: Supervisor<ConnectionHub>,
    mut queue: mpsc::UnboundedReceiver<Command>,
    sweep_interval: Option<Duration>,
) {
    info!(supervisor_id = supervisor.id(), "Supervisor dispatcher started");

    let mut sweep = sweep_interval.map(|period| {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });

    loop {
        tokio::select! {
            command = queue.recv() => match command {
                Some(command) => apply(&mut supervisor, command),
                None => break,
            },
            _ = next_tick(&mut sweep) => {
                supervisor.sweep();
            }
        }
    }

    info!(supervisor_id = supervisor.id(), "Supervisor dispatcher stopped");
}

async fn next_tick(sweep: &mut Option<Interval>) {
    match sweep {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn apply(supervisor: &mut Supervisor<ConnectionHub>, command: Command) {
    match command {
        Command::Connect { connection, outbox } => {
            supervisor.outbound_mut().attach(connection, outbox);
        }
        Command::Inbound {
            connection,
            message,
        } => {
            let kind = message.kind();
            if let Err(err) = supervisor.handle(connection, message) {
                warn!(connection = %connection, kind, error = %err, "Protocol event ignored");
            }
        }
        Command::Disconnect { connection } => {
            match supervisor.disconnect(connection) {
                Ok(()) => {}
                Err(SupervisorError::UnknownConnection(_)) => {
                    debug!(connection = %connection, "Unregistered connection closed");
                }
                Err(err) => warn!(connection = %connection, error = %err, "Disconnect failed"),
            }
            supervisor.outbound_mut().detach(&connection);
        }
        Command::AddTask { new_task, reply } => {
            let _ = reply.send(supervisor.add_task(new_task));
        }
        Command::Agents { reply } => {
            let _ = reply.send(supervisor.agent_snapshot());
        }
        Command::Tasks { reply } => {
            let _ = reply.send(supervisor.task_snapshot());
        }
        Command::Task { task_id, reply } => {
            let _ = reply.send(supervisor.task(&task_id));
        }
        Command::Health { reply } => {
            let _ = reply.send(supervisor.health());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::messages::{AckStatus, ServerMessage};
    use crate::domain::agent::{AgentId, AgentStatus};
    use crate::domain::task::{Requirements, TaskPriority, TaskStatus};
    use chrono::Utc;

    fn start() -> SupervisorHandle {
        let supervisor = Supervisor::new("supervisor-test", ConnectionHub::new());
        spawn(supervisor, None).0
    }

    fn new_task(capabilities: &[&str]) -> NewTask {
        NewTask {
            description: "Analyze customer data".to_string(),
            requirements: Requirements::with_capabilities(capabilities.iter().copied()),
            priority: TaskPriority::High,
            deadline: Utc::now(),
        }
    }

    async fn connect_agent(
        handle: &SupervisorHandle,
        id: &str,
        capabilities: &[&str],
    ) -> (ConnectionId, mpsc::UnboundedReceiver<ServerMessage>) {
        let connection = ConnectionId::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        handle.connect(connection, tx).unwrap();
        handle
            .deliver(
                connection,
                ClientMessage::register(
                    AgentId::new(id).unwrap(),
                    capabilities.iter().map(|c| c.to_string()).collect(),
                    AgentStatus::Available,
                ),
            )
            .unwrap();

        match rx.recv().await {
            Some(ServerMessage::RegistrationResponse(_)) => {}
            other => panic!("Expected registration response, got {:?}", other),
        }
        (connection, rx)
    }

    #[tokio::test]
    async fn add_task_without_agents_stays_pending() {
        let handle = start();

        let task = handle.add_task(new_task(&["a"])).await.unwrap();

        assert_eq!(task.status(), TaskStatus::Pending);
        assert!(task.assigned_agent().is_none());
        assert_eq!(handle.health().await.unwrap(), HealthReport::ok(0, 1));
    }

    #[tokio::test]
    async fn add_task_with_invalid_description() {
        let handle = start();
        let mut request = new_task(&[]);
        request.description = String::new();

        let result = handle.add_task(request).await;

        assert!(matches!(result, Err(SupervisorError::InvalidTask(_))));
    }

    #[tokio::test]
    async fn task_frame_reaches_connected_agent() {
        let handle = start();
        let (_connection, mut rx) = connect_agent(&handle, "x", &["a"]).await;

        let task = handle.add_task(new_task(&["a"])).await.unwrap();

        match rx.recv().await {
            Some(ServerMessage::Task(assignment)) => assert_eq!(assignment.task_id, task.id()),
            other => panic!("Expected task frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn disconnect_is_processed_after_pending_frames() {
        let handle = start();
        let (connection, _rx) = connect_agent(&handle, "x", &["a"]).await;
        let task = handle.add_task(new_task(&["a"])).await.unwrap();

        handle
            .deliver(
                connection,
                ClientMessage::acknowledge(task.id(), AckStatus::Accepted, "Task accepted"),
            )
            .unwrap();
        handle.disconnect(connection).unwrap();

        let stored = handle.task(task.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), TaskStatus::Pending);
        assert!(stored.assigned_agent().is_none());
        assert!(handle.agents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn protocol_errors_do_not_stop_the_loop() {
        let handle = start();
        let stranger = ConnectionId::new();

        handle
            .deliver(
                stranger,
                ClientMessage::acknowledge(Uuid::new_v4(), AckStatus::Accepted, ""),
            )
            .unwrap();
        handle.disconnect(stranger).unwrap();

        assert_eq!(handle.health().await.unwrap(), HealthReport::ok(0, 0));
    }

    #[tokio::test]
    async fn sweep_interval_places_waiting_tasks() {
        let supervisor = Supervisor::new("supervisor-sweep", ConnectionHub::new());
        let (handle, _task) = spawn(supervisor, Some(Duration::from_millis(20)));

        handle.add_task(new_task(&["a"])).await.unwrap();
        let second = handle.add_task(new_task(&["a"])).await.unwrap();
        let (_connection, mut rx) = connect_agent(&handle, "x", &["a"]).await;

        // Registration offers only the first task; the sweep offers the second.
        let mut offered = Vec::new();
        while offered.len() < 2 {
            match tokio::time::timeout(Duration::from_secs(2), rx.recv()).await {
                Ok(Some(ServerMessage::Task(assignment))) => offered.push(assignment.task_id),
                other => panic!("Expected task frame, got {:?}", other),
            }
        }
        assert_eq!(offered[1], second.id());
    }

    #[tokio::test]
    async fn handle_reports_unavailable_after_shutdown() {
        let supervisor = Supervisor::new("supervisor-gone", ConnectionHub::new());
        let (handle, task) = spawn(supervisor, None);
        task.abort();
        let _ = task.await;

        assert_eq!(
            handle.health().await,
            Err(SupervisorError::DispatcherUnavailable)
        );
    }
}
