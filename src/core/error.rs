//! Unified error handling for the router manager
//!
//! Every lifecycle operation reports failure through [`RouterError`], so
//! callers only ever match on one type regardless of which collaborator
//! (registry, agent, catalog) gave up.

use std::{fmt, time::Duration};

use thiserror::Error;

/// Kind of record an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Router,
    Worker,
    LoadBalancer,
    Agent,
    Profile,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            ResourceKind::Router => "Router",
            ResourceKind::Worker => "Worker",
            ResourceKind::LoadBalancer => "Load Balancer",
            ResourceKind::Agent => "Agent",
            ResourceKind::Profile => "Profile",
        };
        write!(f, "{kind}")
    }
}

/// Why a control request to an agent did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentFailure {
    /// The agent answered with a status outside the accepted 2xx set.
    Status(u16),
    /// The request never produced a response.
    Transport(String),
    /// No response within the configured bound.
    Timeout(Duration),
}

impl fmt::Display for AgentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentFailure::Status(status) => write!(f, "Error on agent request : {status}"),
            AgentFailure::Transport(msg) => write!(f, "transport error: {msg}"),
            AgentFailure::Timeout(after) => write!(f, "no response after {}ms", after.as_millis()),
        }
    }
}

/// Errors raised by a catalog lookup.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("unknown PaaS configuration '{0}'")]
    UnknownProfile(String),
}

/// Unified error type for the orchestrator and its collaborators
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("{kind} '{name}' doesn't exist !")]
    NotFound { kind: ResourceKind, name: String },

    #[error("{kind} '{name}' already exist!")]
    AlreadyExists { kind: ResourceKind, name: String },

    /// Every live router must have an agent; a missing link is an integrity fault.
    #[error("Unable to get the agent for router '{0}' !")]
    NoAgent(String),

    #[error("Error to find the PaaS Configuration named {name}.")]
    ProfileResolution {
        name: String,
        #[source]
        source: CatalogError,
    },

    #[error("Invalid paas {field} for '{name}' : {actual} - expected : {expected}")]
    InvalidProfile {
        name: String,
        field: &'static str,
        expected: &'static str,
        actual: String,
    },

    #[error("Router '{router}' cannot {operation} while {state}")]
    InvalidState {
        router: String,
        state: String,
        operation: &'static str,
    },

    #[error("Agent command '{command}' failed: {reason}")]
    AgentCallFailed {
        command: String,
        reason: AgentFailure,
        /// At least one earlier command of the same operation already landed.
        partial: bool,
    },

    #[error("Registry error: {0}")]
    Registry(String),

    /// The agent already applied the change but the registry did not record it.
    #[error("Registry write failed after agent update ({operation})")]
    RegistryWriteFailed {
        operation: String,
        #[source]
        source: Box<RouterError>,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl RouterError {
    pub fn not_found(kind: ResourceKind, name: impl Into<String>) -> Self {
        RouterError::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn already_exists(kind: ResourceKind, name: impl Into<String>) -> Self {
        RouterError::AlreadyExists {
            kind,
            name: name.into(),
        }
    }

    /// Whether the live agent may hold state the registry does not know about.
    ///
    /// Callers seeing `true` should retry the same operation to converge.
    pub fn is_partial(&self) -> bool {
        match self {
            RouterError::RegistryWriteFailed { .. } => true,
            RouterError::AgentCallFailed { partial, .. } => *partial,
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RouterError::NotFound { .. })
    }
}

/// Result type alias for router manager operations
pub type RouterResult<T> = std::result::Result<T, RouterError>;

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    fn with_context(self, context: &str) -> RouterResult<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: fmt::Display,
{
    fn with_context(self, context: &str) -> RouterResult<T> {
        self.map_err(|e| RouterError::Registry(format!("{context}: {e}")))
    }
}

/// Convenience macros for error creation
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::core::RouterError::Configuration($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::RouterError::Configuration(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! validation_error {
    ($msg:expr) => {
        $crate::core::RouterError::Validation($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::RouterError::Validation(format!($fmt, $($arg)*))
    };
}
