use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::agents::messages::ServerMessage;
use crate::agents::outbound::OutboundChannel;
use crate::domain::agent::ConnectionId;

/// Outbox sender feeding one connection's socket writer
pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

/// Transport-side OutboundChannel
///
/// Maps each live connection to the unbounded outbox drained by its
/// WebSocket writer task. Sends never block the supervisor.
#[derive(Debug, Default)]
pub struct ConnectionHub {
    outboxes: HashMap<ConnectionId, Outbox>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start routing frames for `connection` into `outbox`
    pub fn attach(&mut self, connection: ConnectionId, outbox: Outbox) {
        debug!(connection = %connection, "Connection attached");
        self.outboxes.insert(connection, outbox);
    }

    /// Stop routing frames for `connection`
    ///
    /// Dropping the sender lets the writer task drain and exit.
    pub fn detach(&mut self, connection: &ConnectionId) -> bool {
        self.outboxes.remove(connection).is_some()
    }

    pub fn is_attached(&self, connection: &ConnectionId) -> bool {
        self.outboxes.contains_key(connection)
    }

    pub fn len(&self) -> usize {
        self.outboxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outboxes.is_empty()
    }
}

impl OutboundChannel for ConnectionHub {
    fn send(&mut self, connection: &ConnectionId, message: ServerMessage) {
        let kind = message.kind();
        let Some(outbox) = self.outboxes.get(connection) else {
            warn!(connection = %connection, kind, "No open connection, frame dropped");
            return;
        };

        if outbox.send(message).is_err() {
            warn!(connection = %connection, kind, "Connection writer gone, frame dropped");
            self.outboxes.remove(connection);
        }
    }
}
