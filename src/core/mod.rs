//! Core abstractions for the router manager
//!
//! Records, lifecycle states, errors and the collaborator traits the
//! orchestrator is built on.

pub mod container;
pub mod error;
pub mod model;
pub mod registry;
pub mod status;
pub mod traits;

// Re-export commonly used types
pub use container::ServiceContainer;
pub use error::{ResourceKind, RouterError, RouterResult};
pub use registry::InMemoryRegistry;
pub use status::{LifecycleState, Transition};
pub use traits::*;
