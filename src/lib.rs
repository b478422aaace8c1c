//! Router lifecycle manager.
//!
//! Creates, starts, stops and removes reverse-proxy routers together with
//! their workers and load balancers, keeping the durable registry and each
//! router's live control-plane agent consistent.

pub mod agent;
pub mod catalog;
pub mod config;
pub mod core;
pub mod logging;
pub mod metrics;
pub mod orchestration;

pub use crate::core::{RouterError, RouterResult, ServiceContainer};
pub use orchestration::RouterOrchestrator;
