// Agent coordination modules
//
// The supervisor side (protocol handling, the dispatcher loop in front of
// it) and the agent side (worker state, task execution, the WebSocket
// runtime) share the wire messages defined here.

pub mod client;
pub mod dispatcher;
pub mod errors;
pub mod executor;
pub mod messages;
pub mod outbound;
pub mod state;
pub mod supervisor;
pub mod worker;

// Re-export main types
pub use client::AgentRuntime;
pub use dispatcher::SupervisorHandle;
pub use errors::{AgentError, SupervisorError};
pub use executor::{SimulatedExecutor, TaskExecutor};
pub use outbound::{OutboundChannel, RecordingOutbound};
pub use supervisor::Supervisor;
pub use worker::WorkerAgent;
