use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity an agent announces for itself at registration
///
/// # Invariants
/// - Must not be empty or whitespace
/// - Is immutable after construction
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AgentId(String);

impl AgentId {
    /// Creates a new AgentId value object
    ///
    /// # Returns
    /// * `Ok(AgentId)` - If the id is non-empty
    /// * `Err(String)` - If the id is blank
    ///
    /// # Example
    /// ```
    /// use taskforce_supervisor::domain::agent::AgentId;
    ///
    /// let id = AgentId::new("agent-1a2b3c4d").expect("valid id");
    /// assert_eq!(id.as_str(), "agent-1a2b3c4d");
    /// ```
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Agent id cannot be empty".to_string());
        }
        Ok(AgentId(id))
    }

    /// Generates a short random id of the form `agent-xxxxxxxx`
    pub fn generate() -> Self {
        AgentId(format!("agent-{}", short_uuid()))
    }

    /// Returns the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AgentId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        AgentId::new(value)
    }
}

impl From<AgentId> for String {
    fn from(id: AgentId) -> Self {
        id.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transport-assigned identity of one live agent connection
///
/// A fresh value is minted for every accepted socket, so a reconnecting
/// agent always shows up under a new connection id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        ConnectionId(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Availability of a registered agent
///
/// `Busy` is only ever held together with a current task; see
/// [`crate::domain::agent::Agent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Idle and eligible for assignment
    Available,
    /// Executing its current task
    Busy,
    /// Connected but not accepting work
    Offline,
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentStatus::Available => write!(f, "available"),
            AgentStatus::Busy => write!(f, "busy"),
            AgentStatus::Offline => write!(f, "offline"),
        }
    }
}

/// First eight hex digits of a random v4 uuid
pub(crate) fn short_uuid() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}
