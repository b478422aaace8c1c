//! Dependency injection container
//!
//! Builds the registry, agent client and catalog from configuration and
//! hands them to the orchestrator. No global singletons are involved.

use std::sync::Arc;

use log::info;

use super::{
    error::RouterResult,
    registry::InMemoryRegistry,
    traits::{AgentClient, Catalog, Registry},
};
use crate::{
    agent::HttpAgentClient, catalog::StaticCatalog, config::etcd::EtcdRegistry, config::Config,
    orchestration::RouterOrchestrator,
};

/// Main dependency injection container
pub struct ServiceContainer {
    /// Durable router topology
    registry: Arc<dyn Registry>,

    /// Control-plane agent endpoint
    agent_client: Arc<dyn AgentClient>,

    /// Deployment profiles
    catalog: Arc<dyn Catalog>,
}

impl ServiceContainer {
    /// Wire the production collaborators described by `config`.
    ///
    /// Without an `etcd` section the registry lives in memory.
    pub fn from_config(config: &Config) -> RouterResult<Self> {
        let registry: Arc<dyn Registry> = match &config.etcd {
            Some(etcd) => {
                info!("Using etcd registry at {:?} ({})", etcd.host, etcd.prefix);
                Arc::new(EtcdRegistry::new(etcd.clone()))
            }
            None => {
                info!("No etcd configured, using in-memory registry");
                Arc::new(InMemoryRegistry::new())
            }
        };

        Ok(Self {
            registry,
            agent_client: Arc::new(HttpAgentClient::new(config.agent.clone())?),
            catalog: Arc::new(StaticCatalog::new(config.profiles.iter().cloned())),
        })
    }

    /// Create a container with custom components
    pub fn with_components(
        registry: Arc<dyn Registry>,
        agent_client: Arc<dyn AgentClient>,
        catalog: Arc<dyn Catalog>,
    ) -> Self {
        Self {
            registry,
            agent_client,
            catalog,
        }
    }

    pub fn registry(&self) -> Arc<dyn Registry> {
        self.registry.clone()
    }

    pub fn agent_client(&self) -> Arc<dyn AgentClient> {
        self.agent_client.clone()
    }

    pub fn catalog(&self) -> Arc<dyn Catalog> {
        self.catalog.clone()
    }

    /// Build an orchestrator over the contained collaborators.
    pub fn orchestrator(&self) -> RouterOrchestrator {
        RouterOrchestrator::new(
            self.registry.clone(),
            self.agent_client.clone(),
            self.catalog.clone(),
        )
    }
}
