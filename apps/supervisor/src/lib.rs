//! Task Supervisor Library
//!
//! This library provides the supervisor that dispatches tasks to remote
//! agents by capability, the agent runtime that executes them, and the
//! HTTP/WebSocket surface connecting the two.

pub mod agents;
pub mod api;
pub mod config;
pub mod domain;
pub mod infrastructure;
