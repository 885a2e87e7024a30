// Agent domain module
// Contains the agent registry record and its value objects

#![allow(clippy::module_inception)]

pub mod agent;
pub mod value_objects;

// Re-export main types for convenience
pub use agent::Agent;
pub use value_objects::{AgentId, AgentStatus, ConnectionId};
pub(crate) use value_objects::short_uuid;
