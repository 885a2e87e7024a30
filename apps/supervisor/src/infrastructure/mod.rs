// Infrastructure layer module
// Contains state adapters and the transport-side connection hub
// Follows Hexagonal Architecture

pub mod connections;
pub mod repositories;

pub use connections::ConnectionHub;
