//! Registry records handled by the orchestrator.
//!
//! A [`Router`] is the aggregate root: workers and load balancers only exist
//! as its children and are keyed by name inside it.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::{
    error::{ResourceKind, RouterError, RouterResult},
    status::LifecycleState,
};

/// One backend target a router forwards requests to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worker {
    pub name: String,
    pub host: String,
    pub port: u16,
    #[serde(default = "Worker::default_enabled")]
    pub enabled: bool,
}

impl Worker {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            enabled: true,
        }
    }

    fn default_enabled() -> bool {
        true
    }
}

/// A named group of workers plus the URL mount points routed through it.
///
/// Members are weak references to worker names; their order is significant
/// because the agent derives balancing priority from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancer {
    pub name: String,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub mount_points: Vec<String>,
}

impl LoadBalancer {
    /// Build a load balancer, dropping repeated mount points.
    pub fn new(name: impl Into<String>, members: Vec<String>, mount_points: Vec<String>) -> Self {
        let mut seen = HashSet::new();
        let mount_points = mount_points
            .into_iter()
            .filter(|path| seen.insert(path.clone()))
            .collect();

        Self {
            name: name.into(),
            members,
            mount_points,
        }
    }

    /// Member list in the agent's `wl` form: comma-joined, in order.
    pub fn member_list(&self) -> String {
        self.members.join(",")
    }

    /// Drop every occurrence of `worker`; returns whether anything was removed.
    pub fn remove_member(&mut self, worker: &str) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m != worker);
        before != self.members.len()
    }
}

/// A managed reverse-proxy instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Router {
    /// Registry-assigned identifier; empty until first persisted.
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub state: LifecycleState,
    #[serde(default)]
    pub workers: BTreeMap<String, Worker>,
    #[serde(default)]
    pub load_balancers: BTreeMap<String, LoadBalancer>,
}

impl Router {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            state: LifecycleState::Init,
            workers: BTreeMap::new(),
            load_balancers: BTreeMap::new(),
        }
    }

    pub fn worker(&self, name: &str) -> RouterResult<&Worker> {
        self.workers
            .get(name)
            .ok_or_else(|| RouterError::not_found(ResourceKind::Worker, name))
    }

    pub fn worker_mut(&mut self, name: &str) -> RouterResult<&mut Worker> {
        self.workers
            .get_mut(name)
            .ok_or_else(|| RouterError::not_found(ResourceKind::Worker, name))
    }

    pub fn load_balancer(&self, name: &str) -> RouterResult<&LoadBalancer> {
        self.load_balancers
            .get(name)
            .ok_or_else(|| RouterError::not_found(ResourceKind::LoadBalancer, name))
    }

    pub fn load_balancer_mut(&mut self, name: &str) -> RouterResult<&mut LoadBalancer> {
        self.load_balancers
            .get_mut(name)
            .ok_or_else(|| RouterError::not_found(ResourceKind::LoadBalancer, name))
    }

    /// Insert or replace a worker by name.
    pub fn upsert_worker(&mut self, worker: Worker) {
        self.workers.insert(worker.name.clone(), worker);
    }

    /// Remove a worker and prune it from every load balancer's member list.
    ///
    /// Returns the names of the load balancers whose membership changed.
    pub fn remove_worker(&mut self, name: &str) -> Vec<String> {
        self.workers.remove(name);
        self.load_balancers
            .values_mut()
            .filter_map(|lb| lb.remove_member(name).then(|| lb.name.clone()))
            .collect()
    }

    /// Insert or replace a load balancer by name.
    pub fn upsert_load_balancer(&mut self, lb: LoadBalancer) {
        self.load_balancers.insert(lb.name.clone(), lb);
    }

    pub fn remove_load_balancer(&mut self, name: &str) -> Option<LoadBalancer> {
        self.load_balancers.remove(name)
    }
}

/// A control-plane agent as listed in the registry's agent directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    /// Base URL of the agent's control API.
    pub api_url: String,
}

/// A named configuration template resolved from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub sub_type: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}
