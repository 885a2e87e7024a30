use crate::domain::agent::{Agent, ConnectionId};

/// Registry of connected agents, keyed by connection
///
/// Implementations must iterate in a deterministic order; the matcher's
/// first-fit search breaks ties by that order. Callers are expected to
/// serialize access, so no method takes a lock.
pub trait AgentRegistry: Send {
    /// Insert or replace the record for `connection`
    fn put(&mut self, connection: ConnectionId, agent: Agent);

    /// Find the agent registered on `connection`
    fn get(&self, connection: &ConnectionId) -> Option<&Agent>;

    /// Mutable access for in-place status transitions
    fn get_mut(&mut self, connection: &ConnectionId) -> Option<&mut Agent>;

    /// Remove and return the record for `connection`
    fn remove(&mut self, connection: &ConnectionId) -> Option<Agent>;

    /// All agents in registration order
    fn iter(&self) -> Box<dyn Iterator<Item = (&ConnectionId, &Agent)> + '_>;

    /// Number of registered agents
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
