use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of a router as recorded in the registry.
///
/// ```text
/// INIT --create--> CREATED --start--> STARTING --> RUNNING --stop--> STOPPING --> STOPPED
/// CREATED --stop--> STOPPING --> STOPPED
/// STOPPED --start--> STARTING ...
/// any state --remove--> DELETING --> (deleted)
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    #[default]
    Init,
    Created,
    Starting,
    Running,
    Stopping,
    Stopped,
    Deleting,
}

/// Operations that move a router through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Start,
    Stop,
    Remove,
}

impl Transition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::Start => "start",
            Transition::Stop => "stop",
            Transition::Remove => "remove",
        }
    }

    /// State recorded before the agent is asked to do anything.
    pub fn pending_state(&self) -> LifecycleState {
        match self {
            Transition::Start => LifecycleState::Starting,
            Transition::Stop => LifecycleState::Stopping,
            Transition::Remove => LifecycleState::Deleting,
        }
    }

    /// State recorded once the agent acknowledged the operation.
    ///
    /// `None` for removal: the record itself goes away.
    pub fn settled_state(&self) -> Option<LifecycleState> {
        match self {
            Transition::Start => Some(LifecycleState::Running),
            Transition::Stop => Some(LifecycleState::Stopped),
            Transition::Remove => None,
        }
    }
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Init => "INIT",
            LifecycleState::Created => "CREATED",
            LifecycleState::Starting => "STARTING",
            LifecycleState::Running => "RUNNING",
            LifecycleState::Stopping => "STOPPING",
            LifecycleState::Stopped => "STOPPED",
            LifecycleState::Deleting => "DELETING",
        }
    }

    /// Whether `transition` may begin from this state.
    ///
    /// Intermediate states accept the transition that produced them again so a
    /// failed operation can be retried until it converges.
    pub fn accepts(&self, transition: Transition) -> bool {
        use LifecycleState::*;

        match transition {
            Transition::Start => matches!(self, Created | Starting | Running | Stopped),
            Transition::Stop => matches!(self, Created | Starting | Running | Stopping | Stopped),
            Transition::Remove => true,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
