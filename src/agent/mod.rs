//! Control protocol spoken with a router's agent
//!
//! Each [`AgentCommand`] maps to one HTTP request against the agent's API.
//! Worker, load balancer and mount commands go to the JK manager; reload and
//! stop go to the server manager.

pub mod client;
pub mod session;

use std::fmt;

use http::Method;

use crate::core::model::{LoadBalancer, Worker};

pub use client::HttpAgentClient;
pub use session::AgentSession;

/// Which agent-side manager handles a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Manager {
    Jk,
    Server,
}

/// A single control request with idempotent intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentCommand {
    AddWorker {
        name: String,
        host: String,
        port: u16,
    },
    RemoveWorker {
        name: String,
    },
    EnableWorker {
        name: String,
    },
    DisableWorker {
        name: String,
    },
    DefineLoadBalancer {
        name: String,
        members: String,
    },
    /// Replaces the whole member list.
    RedefineLoadBalancer {
        name: String,
        members: String,
    },
    RemoveLoadBalancer {
        name: String,
    },
    AddMountPoint {
        load_balancer: String,
        path: String,
    },
    RemoveMountPoint {
        load_balancer: String,
        path: String,
    },
    Reload,
    Stop,
}

impl AgentCommand {
    pub fn add_worker(worker: &Worker) -> Self {
        AgentCommand::AddWorker {
            name: worker.name.clone(),
            host: worker.host.clone(),
            port: worker.port,
        }
    }

    /// Commands creating `lb` on the agent: the definition, then one per mount point.
    pub fn define_load_balancer(lb: &LoadBalancer) -> Vec<Self> {
        let mut commands = vec![AgentCommand::DefineLoadBalancer {
            name: lb.name.clone(),
            members: lb.member_list(),
        }];
        commands.extend(lb.mount_points.iter().map(|path| AgentCommand::AddMountPoint {
            load_balancer: lb.name.clone(),
            path: path.clone(),
        }));
        commands
    }

    pub fn redefine_load_balancer(lb: &LoadBalancer) -> Self {
        AgentCommand::RedefineLoadBalancer {
            name: lb.name.clone(),
            members: lb.member_list(),
        }
    }

    pub fn remove_mount_points(lb: &LoadBalancer) -> Vec<Self> {
        lb.mount_points
            .iter()
            .map(|path| AgentCommand::RemoveMountPoint {
                load_balancer: lb.name.clone(),
                path: path.clone(),
            })
            .collect()
    }

    pub fn method(&self) -> Method {
        match self {
            AgentCommand::RemoveWorker { .. }
            | AgentCommand::RemoveLoadBalancer { .. }
            | AgentCommand::RemoveMountPoint { .. } => Method::DELETE,
            AgentCommand::RedefineLoadBalancer { .. } => Method::PUT,
            _ => Method::POST,
        }
    }

    pub fn manager(&self) -> Manager {
        match self {
            AgentCommand::Reload | AgentCommand::Stop => Manager::Server,
            _ => Manager::Jk,
        }
    }

    /// Path relative to the manager's prefix.
    pub fn sub_path(&self) -> String {
        match self {
            AgentCommand::AddWorker { name, .. } | AgentCommand::RemoveWorker { name } => {
                format!("worker/{name}")
            }
            AgentCommand::EnableWorker { name } => format!("worker/{name}/enable"),
            AgentCommand::DisableWorker { name } => format!("worker/{name}/disable"),
            AgentCommand::DefineLoadBalancer { name, .. }
            | AgentCommand::RedefineLoadBalancer { name, .. }
            | AgentCommand::RemoveLoadBalancer { name } => format!("loadbalancer/{name}"),
            AgentCommand::AddMountPoint { load_balancer, .. }
            | AgentCommand::RemoveMountPoint { load_balancer, .. } => {
                format!("mount/{load_balancer}")
            }
            AgentCommand::Reload => "server/action/reload".to_string(),
            AgentCommand::Stop => "server/action/stop".to_string(),
        }
    }

    /// Query parameters carried by the request.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            AgentCommand::AddWorker { name, host, port } => vec![
                ("name", name.clone()),
                ("host", host.clone()),
                ("port", port.to_string()),
            ],
            AgentCommand::DefineLoadBalancer { name, members }
            | AgentCommand::RedefineLoadBalancer { name, members } => {
                vec![("name", name.clone()), ("wl", members.clone())]
            }
            AgentCommand::AddMountPoint { path, .. }
            | AgentCommand::RemoveMountPoint { path, .. } => vec![("path", path.clone())],
            _ => Vec::new(),
        }
    }

    /// Stable low-cardinality name, used for metrics labels.
    pub fn label(&self) -> &'static str {
        match self {
            AgentCommand::AddWorker { .. } => "add_worker",
            AgentCommand::RemoveWorker { .. } => "remove_worker",
            AgentCommand::EnableWorker { .. } => "enable_worker",
            AgentCommand::DisableWorker { .. } => "disable_worker",
            AgentCommand::DefineLoadBalancer { .. } => "define_load_balancer",
            AgentCommand::RedefineLoadBalancer { .. } => "redefine_load_balancer",
            AgentCommand::RemoveLoadBalancer { .. } => "remove_load_balancer",
            AgentCommand::AddMountPoint { .. } => "add_mount_point",
            AgentCommand::RemoveMountPoint { .. } => "remove_mount_point",
            AgentCommand::Reload => "reload",
            AgentCommand::Stop => "stop",
        }
    }
}

impl fmt::Display for AgentCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method(), self.sub_path())
    }
}

/// What an agent answered to a successful command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentReply {
    pub status: u16,
    /// Absent for `204 No Content`.
    pub body: Option<String>,
}
