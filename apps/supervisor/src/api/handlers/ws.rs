use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::agents::dispatcher::SupervisorHandle;
use crate::agents::messages::{ClientMessage, ServerMessage};
use crate::domain::agent::ConnectionId;

/// Agent protocol endpoint
///
/// GET /ws
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(supervisor): State<SupervisorHandle>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_agent(socket, supervisor))
}

/// Pump frames between one agent socket and the dispatcher
///
/// Each socket gets a fresh connection id. Whichever half finishes first
/// ends the session, and a disconnect is queued behind every frame this
/// socket already delivered.
async fn serve_agent(socket: WebSocket, supervisor: SupervisorHandle) {
    let connection = ConnectionId::new();
    let (mut sender, mut receiver) = socket.split();
    let (outbox, mut queue) = mpsc::unbounded_channel::<ServerMessage>();

    if supervisor.connect(connection, outbox).is_err() {
        warn!(connection = %connection, "Dispatcher unavailable, dropping agent socket");
        return;
    }
    info!(connection = %connection, "Agent connected");

    let mut send_task = tokio::spawn(async move {
        while let Some(message) = queue.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(err) => {
                    warn!(connection = %connection, error = %err, "Failed to encode frame");
                    continue;
                }
            };
            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let inbound = supervisor.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            let text = match msg {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };

            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(message) => {
                    debug!(connection = %connection, kind = message.kind(), "Frame received");
                    if inbound.deliver(connection, message).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    warn!(connection = %connection, error = %err, "Ignoring malformed frame");
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    info!(connection = %connection, "Agent disconnected");
    if supervisor.disconnect(connection).is_err() {
        debug!(connection = %connection, "Dispatcher already stopped");
    }
}
