//! In-memory registry
//!
//! A [`Registry`] kept entirely in process memory. It backs the test suite
//! and deployments that run without an etcd cluster.

use async_trait::async_trait;
use dashmap::DashMap;
use log::debug;
use uuid::Uuid;

use super::{
    error::{ResourceKind, RouterError, RouterResult},
    model::{Agent, Router},
    traits::Registry,
};

/// Registry storing routers and links in concurrent maps keyed by id.
pub struct InMemoryRegistry {
    routers: DashMap<String, Router>,
    agents: DashMap<String, Agent>,
    /// router id -> agent id
    agent_links: DashMap<String, String>,
    /// router id -> compute id
    compute_links: DashMap<String, String>,
    /// agent id -> compute id
    agent_computes: DashMap<String, String>,
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            routers: DashMap::new(),
            agents: DashMap::new(),
            agent_links: DashMap::new(),
            compute_links: DashMap::new(),
            agent_computes: DashMap::new(),
        }
    }

    /// Add an agent to the directory.
    pub fn register_agent(&self, agent: Agent) {
        debug!("Registering agent '{}' ({})", agent.name, agent.api_url);
        self.agents.insert(agent.id.clone(), agent);
    }

    /// Record the compute node an agent runs on.
    pub fn register_agent_compute(&self, agent_id: &str, compute_id: &str) {
        self.agent_computes
            .insert(agent_id.to_string(), compute_id.to_string());
    }

    /// Get record counts for monitoring
    pub fn get_stats(&self) -> RegistryStats {
        RegistryStats {
            router_count: self.routers.len(),
            agent_count: self.agents.len(),
            agent_link_count: self.agent_links.len(),
            compute_link_count: self.compute_links.len(),
        }
    }
}

/// Statistics about registry contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryStats {
    pub router_count: usize,
    pub agent_count: usize,
    pub agent_link_count: usize,
    pub compute_link_count: usize,
}

#[async_trait]
impl Registry for InMemoryRegistry {
    async fn find_routers(&self) -> RouterResult<Vec<Router>> {
        Ok(self
            .routers
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn create_router(&self, mut router: Router) -> RouterResult<Router> {
        if self.routers.iter().any(|entry| entry.name == router.name) {
            return Err(RouterError::already_exists(
                ResourceKind::Router,
                router.name,
            ));
        }
        if router.id.is_empty() {
            router.id = Uuid::new_v4().to_string();
        }
        debug!("Inserting router '{}' with ID: {}", router.name, router.id);
        self.routers.insert(router.id.clone(), router.clone());
        Ok(router)
    }

    async fn update_router(&self, router: &Router) -> RouterResult<Router> {
        match self.routers.get_mut(&router.id) {
            Some(mut entry) => {
                *entry = router.clone();
                Ok(router.clone())
            }
            None => Err(RouterError::not_found(ResourceKind::Router, &router.name)),
        }
    }

    async fn delete_router(&self, router_id: &str) -> RouterResult<()> {
        debug!("Removing router with ID: {}", router_id);
        self.routers.remove(router_id);
        self.agent_links.remove(router_id);
        self.compute_links.remove(router_id);
        Ok(())
    }

    async fn find_agents(&self) -> RouterResult<Vec<Agent>> {
        Ok(self
            .agents
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn find_agent_by_router(&self, router_id: &str) -> RouterResult<Option<Agent>> {
        Ok(self
            .agent_links
            .get(router_id)
            .and_then(|agent_id| self.agents.get(agent_id.value()).map(|a| a.value().clone())))
    }

    async fn find_router_ids_by_agent(&self, agent_id: &str) -> RouterResult<Vec<String>> {
        Ok(self
            .agent_links
            .iter()
            .filter(|entry| entry.value() == agent_id)
            .map(|entry| entry.key().clone())
            .collect())
    }

    async fn add_router_agent_link(&self, router_id: &str, agent_id: &str) -> RouterResult<()> {
        if let Some(existing) = self.agent_links.get(router_id) {
            if existing.value() != agent_id {
                return Err(RouterError::Registry(format!(
                    "router {router_id} is already linked to agent {}",
                    existing.value()
                )));
            }
            return Ok(());
        }
        self.agent_links
            .insert(router_id.to_string(), agent_id.to_string());
        Ok(())
    }

    async fn remove_router_agent_link(
        &self,
        router_id: &str,
        agent_id: &str,
    ) -> RouterResult<()> {
        self.agent_links
            .remove_if(router_id, |_, linked| linked == agent_id);
        Ok(())
    }

    async fn find_compute_by_agent(&self, agent_id: &str) -> RouterResult<Option<String>> {
        Ok(self
            .agent_computes
            .get(agent_id)
            .map(|entry| entry.value().clone()))
    }

    async fn find_compute_by_router(&self, router_id: &str) -> RouterResult<Option<String>> {
        Ok(self
            .compute_links
            .get(router_id)
            .map(|entry| entry.value().clone()))
    }

    async fn add_router_compute_link(
        &self,
        router_id: &str,
        compute_id: &str,
    ) -> RouterResult<()> {
        self.compute_links
            .insert(router_id.to_string(), compute_id.to_string());
        Ok(())
    }

    async fn remove_router_compute_link(
        &self,
        router_id: &str,
        compute_id: &str,
    ) -> RouterResult<()> {
        self.compute_links
            .remove_if(router_id, |_, linked| linked == compute_id);
        Ok(())
    }

    async fn find_router_by_id(&self, router_id: &str) -> RouterResult<Router> {
        self.routers
            .get(router_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RouterError::not_found(ResourceKind::Router, router_id))
    }
}
