//! Core traits for the router manager
//!
//! The orchestrator only talks to its collaborators through these
//! interfaces; each has one production implementation and is injected
//! explicitly through [`super::container::ServiceContainer`].

use async_trait::async_trait;

use crate::agent::{AgentCommand, AgentReply};

use super::{
    error::{CatalogError, ResourceKind, RouterError, RouterResult},
    model::{Agent, LoadBalancer, Profile, Router, Worker},
};

/// Durable store of router topology and its links.
#[async_trait]
pub trait Registry: Send + Sync {
    /// All routers currently recorded
    async fn find_routers(&self) -> RouterResult<Vec<Router>>;

    /// Persist a new router; the returned record carries its assigned id.
    async fn create_router(&self, router: Router) -> RouterResult<Router>;

    /// Replace the whole router record.
    async fn update_router(&self, router: &Router) -> RouterResult<Router>;

    /// Delete a router together with any link still pointing at it.
    async fn delete_router(&self, router_id: &str) -> RouterResult<()>;

    /// Agent directory
    async fn find_agents(&self) -> RouterResult<Vec<Agent>>;

    async fn find_agent_by_router(&self, router_id: &str) -> RouterResult<Option<Agent>>;

    async fn find_router_ids_by_agent(&self, agent_id: &str) -> RouterResult<Vec<String>>;

    async fn add_router_agent_link(&self, router_id: &str, agent_id: &str) -> RouterResult<()>;

    async fn remove_router_agent_link(&self, router_id: &str, agent_id: &str)
        -> RouterResult<()>;

    /// IaaS compute node hosting the given agent, if known.
    async fn find_compute_by_agent(&self, agent_id: &str) -> RouterResult<Option<String>>;

    async fn find_compute_by_router(&self, router_id: &str) -> RouterResult<Option<String>>;

    async fn add_router_compute_link(&self, router_id: &str, compute_id: &str)
        -> RouterResult<()>;

    async fn remove_router_compute_link(
        &self,
        router_id: &str,
        compute_id: &str,
    ) -> RouterResult<()>;

    /// Lookup by unique name
    async fn find_router(&self, name: &str) -> RouterResult<Option<Router>> {
        Ok(self
            .find_routers()
            .await?
            .into_iter()
            .find(|router| router.name == name))
    }

    async fn find_agent(&self, name: &str) -> RouterResult<Option<Agent>> {
        Ok(self
            .find_agents()
            .await?
            .into_iter()
            .find(|agent| agent.name == name))
    }

    async fn add_worker(
        &self,
        router_id: &str,
        name: &str,
        host: &str,
        port: u16,
    ) -> RouterResult<Router> {
        let mut router = self.find_router_by_id(router_id).await?;
        router.upsert_worker(Worker::new(name, host, port));
        self.update_router(&router).await
    }

    /// Returns the updated router and the load balancers the worker was pruned from.
    async fn remove_worker(
        &self,
        router_id: &str,
        name: &str,
    ) -> RouterResult<(Router, Vec<String>)> {
        let mut router = self.find_router_by_id(router_id).await?;
        let pruned = router.remove_worker(name);
        Ok((self.update_router(&router).await?, pruned))
    }

    async fn add_load_balancer(
        &self,
        router_id: &str,
        name: &str,
        mount_points: Vec<String>,
        members: Vec<String>,
    ) -> RouterResult<Router> {
        let mut router = self.find_router_by_id(router_id).await?;
        router.upsert_load_balancer(LoadBalancer::new(name, members, mount_points));
        self.update_router(&router).await
    }

    async fn remove_load_balancer(&self, router_id: &str, name: &str) -> RouterResult<Router> {
        let mut router = self.find_router_by_id(router_id).await?;
        router.remove_load_balancer(name);
        self.update_router(&router).await
    }

    async fn find_router_by_id(&self, router_id: &str) -> RouterResult<Router> {
        self.find_routers()
            .await?
            .into_iter()
            .find(|router| router.id == router_id)
            .ok_or_else(|| RouterError::not_found(ResourceKind::Router, router_id))
    }
}

/// Request/response endpoint of a router's control-plane agent.
#[async_trait]
pub trait AgentClient: Send + Sync {
    /// Send one command and wait for the agent's verdict.
    async fn execute(&self, agent: &Agent, command: &AgentCommand) -> RouterResult<AgentReply>;
}

/// Resolves named deployment profiles.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn get_paas_configuration(&self, name: &str) -> Result<Profile, CatalogError>;
}
