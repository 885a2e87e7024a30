use crate::domain::agent::{Agent, ConnectionId};
use crate::domain::repositories::AgentRegistry;

/// In-memory implementation of AgentRegistry
///
/// Entries are kept in a Vec so iteration follows registration order.
/// A re-registration on the same connection replaces the record in place
/// and keeps its position. Pools are small enough that the linear lookup
/// does not matter.
#[derive(Debug, Default)]
pub struct InMemoryAgentRegistry {
    entries: Vec<(ConnectionId, Agent)>,
}

impl InMemoryAgentRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, connection: &ConnectionId) -> Option<usize> {
        self.entries.iter().position(|(id, _)| id == connection)
    }
}

impl AgentRegistry for InMemoryAgentRegistry {
    fn put(&mut self, connection: ConnectionId, agent: Agent) {
        match self.position(&connection) {
            Some(index) => self.entries[index].1 = agent,
            None => self.entries.push((connection, agent)),
        }
    }

    fn get(&self, connection: &ConnectionId) -> Option<&Agent> {
        self.entries
            .iter()
            .find(|(id, _)| id == connection)
            .map(|(_, agent)| agent)
    }

    fn get_mut(&mut self, connection: &ConnectionId) -> Option<&mut Agent> {
        self.entries
            .iter_mut()
            .find(|(id, _)| id == connection)
            .map(|(_, agent)| agent)
    }

    fn remove(&mut self, connection: &ConnectionId) -> Option<Agent> {
        let index = self.position(connection)?;
        Some(self.entries.remove(index).1)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&ConnectionId, &Agent)> + '_> {
        Box::new(self.entries.iter().map(|(id, agent)| (id, agent)))
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::{AgentId, AgentStatus};

    fn agent(id: &str) -> Agent {
        Agent::register(AgentId::new(id).unwrap(), vec![], AgentStatus::Available)
    }

    #[test]
    fn put_and_get() {
        let mut registry = InMemoryAgentRegistry::new();
        let connection = ConnectionId::new();

        registry.put(connection, agent("x"));

        assert_eq!(registry.get(&connection).unwrap().id().as_str(), "x");
        assert!(registry.get(&ConnectionId::new()).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn put_replaces_in_place() {
        let mut registry = InMemoryAgentRegistry::new();
        let first = ConnectionId::new();
        let second = ConnectionId::new();
        registry.put(first, agent("x"));
        registry.put(second, agent("y"));

        registry.put(first, agent("x2"));

        let order: Vec<_> = registry.iter().map(|(_, a)| a.id().as_str().to_string()).collect();
        assert_eq!(order, vec!["x2", "y"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn remove_returns_record() {
        let mut registry = InMemoryAgentRegistry::new();
        let connection = ConnectionId::new();
        registry.put(connection, agent("x"));

        let removed = registry.remove(&connection).unwrap();

        assert_eq!(removed.id().as_str(), "x");
        assert!(registry.is_empty());
        assert!(registry.remove(&connection).is_none());
    }

    #[test]
    fn iteration_follows_registration_order() {
        let mut registry = InMemoryAgentRegistry::new();
        let ids: Vec<_> = (0..4).map(|_| ConnectionId::new()).collect();
        for (i, id) in ids.iter().enumerate() {
            registry.put(*id, agent(&format!("agent-{}", i)));
        }
        registry.remove(&ids[1]);

        let seen: Vec<_> = registry.iter().map(|(id, _)| *id).collect();
        assert_eq!(seen, vec![ids[0], ids[2], ids[3]]);
    }

    #[test]
    fn get_mut_allows_transitions() {
        let mut registry = InMemoryAgentRegistry::new();
        let connection = ConnectionId::new();
        registry.put(connection, agent("x"));
        let task_id = uuid::Uuid::new_v4();

        registry.get_mut(&connection).unwrap().occupy(task_id).unwrap();

        assert_eq!(registry.get(&connection).unwrap().current_task(), Some(task_id));
    }
}
