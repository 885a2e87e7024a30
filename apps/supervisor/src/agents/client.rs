// Agent runtime
//
// Holds one WebSocket session to the supervisor at a time and reconnects
// after a fixed delay when it drops. Outgoing frames go through a single
// writer task; accepted tasks run in a JoinSet so the read loop keeps
// answering offers while work is in flight.

use futures::{SinkExt, StreamExt};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{interval_at, Instant};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::errors::{AgentError, AgentResult};
use super::executor::{ProgressReporter, TaskExecutor};
use super::messages::{ClientMessage, ServerMessage, TaskAssignment};
use super::worker::WorkerAgent;
use crate::config::AgentConfig;
use crate::domain::task::{Progress, ReportedStatus};

type Outbox = mpsc::UnboundedSender<ClientMessage>;
type Running = JoinSet<(Uuid, ClientMessage)>;

pub struct AgentRuntime {
    config: AgentConfig,
    executor: Arc<dyn TaskExecutor>,
}

impl AgentRuntime {
    pub fn new(config: AgentConfig, executor: Arc<dyn TaskExecutor>) -> Self {
        Self { config, executor }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Keep a session open for as long as the process lives
    pub async fn run(&self) {
        loop {
            match self.session().await {
                Ok(()) => info!(agent_id = %self.config.agent_id, "Supervisor closed the connection"),
                Err(err) => warn!(agent_id = %self.config.agent_id, error = %err, "Connection to supervisor lost"),
            }

            info!(
                delay_ms = self.config.reconnect_delay.as_millis() as u64,
                "Reconnecting to supervisor"
            );
            tokio::time::sleep(self.config.reconnect_delay).await;
        }
    }

    /// Run a single session until the socket closes or fails
    ///
    /// Work still running when the session ends is abandoned; the
    /// supervisor requeues it once it notices the disconnect.
    pub async fn session(&self) -> AgentResult<()> {
        info!(url = %self.config.supervisor_url, "Connecting to supervisor");
        let (socket, _) = connect_async(self.config.supervisor_url.as_str()).await?;
        let (mut sink, mut frames) = socket.split();

        let (outbox, mut queue) = mpsc::unbounded_channel::<ClientMessage>();
        let mut writer = tokio::spawn(async move {
            while let Some(message) = queue.recv().await {
                sink.send(encode(&message)?).await?;
            }
            AgentResult::Ok(())
        });

        let mut worker = WorkerAgent::new(
            self.config.agent_id.clone(),
            self.config.capabilities.iter().cloned(),
        );
        send(&outbox, worker.registration())?;

        let mut running = Running::new();
        let period = self.config.status_interval;
        let mut status = interval_at(Instant::now() + period, period);

        let outcome = loop {
            tokio::select! {
                frame = frames.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(err) = self.on_frame(&text, &mut worker, &outbox, &mut running) {
                            break Err(err);
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break Ok(()),
                    Some(Ok(_)) => {}
                    Some(Err(err)) => break Err(err.into()),
                },
                Some(joined) = running.join_next() => {
                    let update = match joined {
                        Ok((task_id, update)) => {
                            worker.finish(task_id);
                            update
                        }
                        Err(err) => {
                            let Some(task_id) = worker.current_task() else {
                                continue;
                            };
                            worker.finish(task_id);
                            failed(task_id, &AgentError::TaskExecutionFailed(err.to_string()))
                        }
                    };
                    if let Err(err) = send(&outbox, update) {
                        break Err(err);
                    }
                }
                written = &mut writer => {
                    break match written {
                        Ok(result) => result,
                        Err(err) => Err(AgentError::ChannelClosed(err.to_string())),
                    };
                }
                _ = status.tick() => {
                    info!(
                        agent_id = %worker.id(),
                        status = %worker.status(),
                        current_task = ?worker.current_task(),
                        "Agent status"
                    );
                }
            }
        };

        running.abort_all();
        drop(outbox);
        writer.abort();
        outcome
    }

    fn on_frame(
        &self,
        text: &str,
        worker: &mut WorkerAgent,
        outbox: &Outbox,
        running: &mut Running,
    ) -> AgentResult<()> {
        let message: ServerMessage = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(err) => {
                warn!(error = %err, "Ignoring malformed frame");
                return Ok(());
            }
        };

        match message {
            ServerMessage::RegistrationResponse(response) => {
                info!(
                    agent_id = %worker.id(),
                    supervisor_id = %response.supervisor_id,
                    "Registered with supervisor"
                );
            }
            ServerMessage::Task(assignment) => {
                info!(
                    task_id = %assignment.task_id,
                    description = %assignment.description,
                    "Received task"
                );
                let review = worker.review(&assignment);
                send(outbox, review.reply)?;
                if review.accepted {
                    self.start(assignment, outbox.clone(), running);
                } else {
                    debug!(task_id = %assignment.task_id, "Task rejected");
                }
            }
        }
        Ok(())
    }

    fn start(&self, assignment: TaskAssignment, outbox: Outbox, running: &mut Running) {
        let executor = Arc::clone(&self.executor);
        running.spawn(async move {
            let task_id = assignment.task_id;
            let reporter = ProgressReporter::new(task_id, outbox);
            let update = match executor.execute(&assignment, &reporter).await {
                Ok(result) => {
                    info!(task_id = %task_id, "Task completed");
                    ClientMessage::update(
                        task_id,
                        ReportedStatus::Completed,
                        Progress::COMPLETE,
                        Some(result),
                    )
                }
                Err(err) => {
                    warn!(task_id = %task_id, error = %err, "Task failed");
                    failed(task_id, &err)
                }
            };
            (task_id, update)
        });
    }
}

fn failed(task_id: Uuid, err: &AgentError) -> ClientMessage {
    ClientMessage::update(
        task_id,
        ReportedStatus::Failed,
        Progress::default(),
        Some(json!({ "error": err.to_string() })),
    )
}

fn encode(message: &ClientMessage) -> AgentResult<Message> {
    Ok(Message::Text(serde_json::to_string(message)?))
}

fn send(outbox: &Outbox, message: ClientMessage) -> AgentResult<()> {
    outbox
        .send(message)
        .map_err(|_| AgentError::ChannelClosed("supervisor connection".to_string()))
}
