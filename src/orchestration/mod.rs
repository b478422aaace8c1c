//! Router lifecycle orchestration layer
//!
//! Coordinates the registry, the agent client and the catalog for every
//! router, worker and load balancer operation.

pub mod locks;
pub mod manager;

#[cfg(test)]
mod tests;

pub use locks::RouterLocks;
pub use manager::RouterOrchestrator;
