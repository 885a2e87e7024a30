// Domain layer module exports
// Following Hexagonal Architecture and DDD principles
// Domain is independent of transport concerns

pub mod agent;
pub mod matching;
pub mod repositories;
pub mod task;
