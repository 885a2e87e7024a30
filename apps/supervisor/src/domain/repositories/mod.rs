// Repository interfaces for the supervisor's in-process state
// Implementations live in the infrastructure layer

pub mod agent_registry;
pub mod task_store;

pub use agent_registry::AgentRegistry;
pub use task_store::TaskStore;
