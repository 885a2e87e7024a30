// Outbound side of the worker protocol
//
// The supervisor never talks to sockets directly. It hands every frame to
// an OutboundChannel, which the transport implements.

use crate::agents::messages::ServerMessage;
use crate::domain::agent::ConnectionId;

/// Fire-and-forget delivery of frames to agent connections
///
/// A send to a connection that has gone away is dropped by the
/// implementation; it must never fail the caller.
pub trait OutboundChannel: Send {
    fn send(&mut self, connection: &ConnectionId, message: ServerMessage);
}

/// OutboundChannel that keeps every frame in memory
///
/// Used to drive a supervisor without a transport, e.g. when embedding it
/// in another process or exercising the protocol in tests.
#[derive(Debug, Default)]
pub struct RecordingOutbound {
    sent: Vec<(ConnectionId, ServerMessage)>,
}

impl RecordingOutbound {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames sent so far, oldest first
    pub fn sent(&self) -> &[(ConnectionId, ServerMessage)] {
        &self.sent
    }

    /// Frames sent to `connection`, oldest first
    pub fn sent_to(&self, connection: &ConnectionId) -> Vec<&ServerMessage> {
        self.sent
            .iter()
            .filter(|(target, _)| target == connection)
            .map(|(_, message)| message)
            .collect()
    }

    /// Removes and returns everything recorded so far
    pub fn drain(&mut self) -> Vec<(ConnectionId, ServerMessage)> {
        std::mem::take(&mut self.sent)
    }
}

impl OutboundChannel for RecordingOutbound {
    fn send(&mut self, connection: &ConnectionId, message: ServerMessage) {
        self.sent.push((*connection, message));
    }
}
