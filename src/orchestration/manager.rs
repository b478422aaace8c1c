//! Router lifecycle orchestration
//!
//! Every mutating operation runs in two phases under the router's lock:
//! first the agent is driven through its commands, then the registry records
//! the outcome. A failed agent call therefore never leaves the registry
//! describing state the live router does not have. Registry failures after a
//! successful agent phase surface as [`RouterError::RegistryWriteFailed`].

use std::{future::Future, sync::Arc};

use log::{debug, error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    agent::{AgentCommand, AgentSession},
    catalog::validate_router_profile,
    core::{
        model::{Agent, LoadBalancer, Router, Worker},
        AgentClient, Catalog, LifecycleState, Registry, ResourceKind, RouterError, RouterResult,
        Transition,
    },
    metrics, validation_error,
};

use super::locks::RouterLocks;

static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("Invalid regex pattern for names")
});

/// Drives routers, workers and load balancers through their lifecycle,
/// keeping the agent and the registry in step.
pub struct RouterOrchestrator {
    registry: Arc<dyn Registry>,
    agents: Arc<dyn AgentClient>,
    catalog: Arc<dyn Catalog>,
    locks: RouterLocks,
}

impl RouterOrchestrator {
    pub fn new(
        registry: Arc<dyn Registry>,
        agents: Arc<dyn AgentClient>,
        catalog: Arc<dyn Catalog>,
    ) -> Self {
        Self {
            registry,
            agents,
            catalog,
            locks: RouterLocks::new(),
        }
    }

    pub fn registry(&self) -> &Arc<dyn Registry> {
        &self.registry
    }

    /// Look up a router by name.
    pub async fn get_router(&self, name: &str) -> RouterResult<Router> {
        self.registry
            .find_router(name)
            .await?
            .ok_or_else(|| RouterError::not_found(ResourceKind::Router, name))
    }

    /// Create a router on `agent_name` from the `profile_name` template.
    ///
    /// `listen_port` is checked and logged only.
    pub async fn create_router(
        &self,
        name: &str,
        agent_name: &str,
        profile_name: &str,
        listen_port: Option<u16>,
    ) -> RouterResult<Router> {
        observed("create_router", name, async {
            validate_name(ResourceKind::Router, name)?;
            if listen_port == Some(0) {
                return Err(validation_error!("Invalid listen port 0 for router '{}'", name));
            }
            info!("Router '{name}' creating .... (agent={agent_name}, profile={profile_name}, port={listen_port:?})");
            let _guard = self.locks.lock(name).await;

            let agent = self
                .registry
                .find_agent(agent_name)
                .await?
                .ok_or_else(|| RouterError::not_found(ResourceKind::Agent, agent_name))?;

            let profile = self
                .catalog
                .get_paas_configuration(profile_name)
                .await
                .map_err(|source| RouterError::ProfileResolution {
                    name: profile_name.to_string(),
                    source,
                })?;
            validate_router_profile(&profile)?;

            if self.registry.find_router(name).await?.is_some() {
                return Err(RouterError::already_exists(ResourceKind::Router, name));
            }

            let mut router = self.registry.create_router(Router::new(name)).await?;

            let linked = self.registry.find_router_ids_by_agent(&agent.id).await?;
            if linked.contains(&router.id) {
                debug!(
                    "Link between router '{name}' and agent '{}' already exists",
                    agent.name
                );
            } else {
                self.registry
                    .add_router_agent_link(&router.id, &agent.id)
                    .await?;
            }

            if let Some(compute) = self.registry.find_compute_by_agent(&agent.id).await? {
                debug!("Router '{name}' hosted on compute '{compute}'");
                self.registry
                    .add_router_compute_link(&router.id, &compute)
                    .await?;
            }

            router.state = LifecycleState::Created;
            let router = self.registry.update_router(&router).await?;
            info!("Router '{name}' created. Status={}", router.state);
            Ok(router)
        })
        .await
    }

    /// Delete a router and release its agent and compute links.
    ///
    /// No teardown command is sent to the agent.
    pub async fn remove_router(&self, name: &str) -> RouterResult<()> {
        observed("remove_router", name, async {
            info!("Router '{name}' deleting ....");
            let guard = self.locks.lock(name).await;

            let mut router = self.get_router(name).await?;
            router.state = Transition::Remove.pending_state();
            self.registry.update_router(&router).await?;

            let agent = self.agent_of(&router).await?;

            if let Some(compute) = self.registry.find_compute_by_router(&router.id).await? {
                self.registry
                    .remove_router_compute_link(&router.id, &compute)
                    .await?;
            }
            self.registry
                .remove_router_agent_link(&router.id, &agent.id)
                .await?;
            self.registry.delete_router(&router.id).await?;

            drop(guard);
            self.locks.release(name);
            info!("Router '{name}' deleted.");
            Ok(())
        })
        .await
    }

    /// Reload the router's configuration on its agent.
    pub async fn start_router(&self, name: &str) -> RouterResult<Router> {
        observed("start_router", name, async {
            info!("Router '{name}' starting ....");
            let router = self
                .transition(name, Transition::Start, AgentCommand::Reload)
                .await?;
            info!("Router '{name}' started.");
            Ok(router)
        })
        .await
    }

    pub async fn stop_router(&self, name: &str) -> RouterResult<Router> {
        observed("stop_router", name, async {
            info!("Router '{name}' stopping ....");
            let router = self
                .transition(name, Transition::Stop, AgentCommand::Stop)
                .await?;
            info!("Router '{name}' stopped.");
            Ok(router)
        })
        .await
    }

    /// Add a worker. Does nothing if the router already has one by that name.
    pub async fn create_worker(
        &self,
        router_name: &str,
        worker_name: &str,
        host: &str,
        port: u16,
    ) -> RouterResult<Router> {
        observed("create_worker", router_name, async {
            validate_name(ResourceKind::Worker, worker_name)?;
            if host.trim().is_empty() {
                return Err(validation_error!("Worker '{}' has no target host", worker_name));
            }
            if port == 0 {
                return Err(validation_error!("Invalid port 0 for worker '{}'", worker_name));
            }
            info!("Router '{router_name}' - Create Worker '{worker_name}' (host={host}, port={port})");
            let _guard = self.locks.lock(router_name).await;

            let router = self.get_router(router_name).await?;
            if router.workers.contains_key(worker_name) {
                debug!("Router '{router_name}' - Worker '{worker_name}' already exists");
                return Ok(router);
            }

            let worker = Worker::new(worker_name, host, port);
            let agent = self.agent_of(&router).await?;
            let mut session = AgentSession::new(self.agents.as_ref(), &agent, router_name);
            session.send(AgentCommand::add_worker(&worker)).await?;
            session.reload().await?;

            let router = recorded(
                "create worker",
                self.registry
                    .add_worker(&router.id, &worker.name, &worker.host, worker.port)
                    .await,
            )?;
            info!("Router '{router_name}' - Worker '{worker_name}' created !");
            Ok(router)
        })
        .await
    }

    /// Remove a worker and drop it from every load balancer's member list.
    pub async fn remove_worker(&self, router_name: &str, worker_name: &str) -> RouterResult<Router> {
        observed("remove_worker", router_name, async {
            info!("Router '{router_name}' - Delete Worker '{worker_name}'");
            let _guard = self.locks.lock(router_name).await;

            let router = self.get_router(router_name).await?;
            router.worker(worker_name)?;
            let agent = self.agent_of(&router).await?;

            let mut session = AgentSession::new(self.agents.as_ref(), &agent, router_name);
            session
                .send(AgentCommand::RemoveWorker {
                    name: worker_name.to_string(),
                })
                .await?;
            session.reload().await?;

            let (updated, pruned) = recorded(
                "remove worker",
                self.registry.remove_worker(&router.id, worker_name).await,
            )?;
            for name in &pruned {
                debug!("Worker {worker_name} removed in LoadBalancer {name}.");
            }
            info!("Router '{router_name}' - Worker '{worker_name}' removed !");
            Ok(updated)
        })
        .await
    }

    pub async fn enable_worker(&self, router_name: &str, worker_name: &str) -> RouterResult<Router> {
        observed("enable_worker", router_name, async {
            info!("Router '{router_name}' - Enable Worker '{worker_name}'");
            let router = self.set_worker_enabled(router_name, worker_name, true).await?;
            info!("Router '{router_name}' - Worker '{worker_name}' enabled !");
            Ok(router)
        })
        .await
    }

    pub async fn disable_worker(
        &self,
        router_name: &str,
        worker_name: &str,
    ) -> RouterResult<Router> {
        observed("disable_worker", router_name, async {
            info!("Router '{router_name}' - Disable Worker '{worker_name}'");
            let router = self.set_worker_enabled(router_name, worker_name, false).await?;
            info!("Router '{router_name}' - Worker '{worker_name}' disabled !");
            Ok(router)
        })
        .await
    }

    /// Define a load balancer and mount it on every path in `mount_points`.
    ///
    /// Re-creating an identical load balancer is a no-op. If a mount point
    /// command fails, the ones already sent stay on the agent and the error
    /// is flagged partial.
    pub async fn create_load_balancer(
        &self,
        router_name: &str,
        lb_name: &str,
        members: Vec<String>,
        mount_points: Vec<String>,
    ) -> RouterResult<Router> {
        observed("create_load_balancer", router_name, async {
            validate_name(ResourceKind::LoadBalancer, lb_name)?;
            // members travel comma-joined, so each must be a plain worker name
            for member in &members {
                validate_name(ResourceKind::Worker, member)?;
            }
            if let Some(path) = mount_points.iter().find(|p| !p.starts_with('/')) {
                return Err(validation_error!(
                    "Mount point '{}' of load balancer '{}' must start with '/'",
                    path,
                    lb_name
                ));
            }
            let lb = LoadBalancer::new(lb_name, members, mount_points);
            info!(
                "Router '{router_name}' - Create Loadbalancer '{lb_name}' (wk={}, mountPoints={:?})",
                lb.member_list(),
                lb.mount_points
            );
            let _guard = self.locks.lock(router_name).await;

            let router = self.get_router(router_name).await?;
            if let Some(existing) = router.load_balancers.get(lb_name) {
                if *existing == lb {
                    debug!("Router '{router_name}' - Loadbalancer '{lb_name}' already defined");
                    return Ok(router);
                }
                return Err(RouterError::already_exists(
                    ResourceKind::LoadBalancer,
                    lb_name,
                ));
            }

            let agent = self.agent_of(&router).await?;
            let mut session = AgentSession::new(self.agents.as_ref(), &agent, router_name);
            session
                .send_all(AgentCommand::define_load_balancer(&lb))
                .await?;
            session.reload().await?;

            let router = recorded(
                "create load balancer",
                self.registry
                    .add_load_balancer(&router.id, lb_name, lb.mount_points, lb.members)
                    .await,
            )?;
            info!("Router '{router_name}' - Loadbalancer '{lb_name}' created !");
            Ok(router)
        })
        .await
    }

    /// Remove a load balancer, then unmount each of its recorded paths.
    pub async fn remove_load_balancer(
        &self,
        router_name: &str,
        lb_name: &str,
    ) -> RouterResult<Router> {
        observed("remove_load_balancer", router_name, async {
            info!("Router '{router_name}' - Delete Loadbalancer '{lb_name}'");
            let _guard = self.locks.lock(router_name).await;

            let router = self.get_router(router_name).await?;
            let lb = router.load_balancer(lb_name)?.clone();
            let agent = self.agent_of(&router).await?;

            let mut session = AgentSession::new(self.agents.as_ref(), &agent, router_name);
            session
                .send(AgentCommand::RemoveLoadBalancer {
                    name: lb_name.to_string(),
                })
                .await?;
            session.reload().await?;
            session
                .send_all(AgentCommand::remove_mount_points(&lb))
                .await?;

            let router = recorded(
                "remove load balancer",
                self.registry.remove_load_balancer(&router.id, lb_name).await,
            )?;
            info!("Router '{router_name}' - Loadbalancer '{lb_name}' removed !");
            Ok(router)
        })
        .await
    }

    /// Append a worker to a load balancer and push the whole member list.
    ///
    /// Duplicates are kept as given.
    pub async fn add_worker_to_load_balancer(
        &self,
        router_name: &str,
        lb_name: &str,
        worker_name: &str,
    ) -> RouterResult<Router> {
        observed("add_worker_to_load_balancer", router_name, async {
            validate_name(ResourceKind::Worker, worker_name)?;
            info!("Router '{router_name}' - Add Worker '{worker_name}' to Loadbalancer '{lb_name}'");
            let _guard = self.locks.lock(router_name).await;

            let mut router = self.get_router(router_name).await?;
            let agent = self.agent_of(&router).await?;
            let lb = router.load_balancer_mut(lb_name)?;
            lb.members.push(worker_name.to_string());
            let command = AgentCommand::redefine_load_balancer(lb);

            let mut session = AgentSession::new(self.agents.as_ref(), &agent, router_name);
            session.send(command).await?;
            session.reload().await?;

            let router = recorded(
                "add worker to load balancer",
                self.registry.update_router(&router).await,
            )?;
            info!("Router '{router_name}' - Worker '{worker_name}' added to Loadbalancer '{lb_name}' !");
            Ok(router)
        })
        .await
    }

    /// Move a router through `transition`, sending `command` in between.
    ///
    /// The pending state is persisted before the agent is called and stays
    /// recorded if the call fails.
    async fn transition(
        &self,
        name: &str,
        transition: Transition,
        command: AgentCommand,
    ) -> RouterResult<Router> {
        let _guard = self.locks.lock(name).await;

        let mut router = self.get_router(name).await?;
        if !router.state.accepts(transition) {
            return Err(RouterError::InvalidState {
                router: name.to_string(),
                state: router.state.to_string(),
                operation: transition.as_str(),
            });
        }
        let agent = self.agent_of(&router).await?;

        router.state = transition.pending_state();
        let mut router = self.registry.update_router(&router).await?;

        let mut session = AgentSession::new(self.agents.as_ref(), &agent, name);
        session.send(command).await?;

        match transition.settled_state() {
            Some(state) => {
                router.state = state;
                recorded(transition.as_str(), self.registry.update_router(&router).await)
            }
            None => Ok(router),
        }
    }

    async fn set_worker_enabled(
        &self,
        router_name: &str,
        worker_name: &str,
        enabled: bool,
    ) -> RouterResult<Router> {
        let _guard = self.locks.lock(router_name).await;

        let mut router = self.get_router(router_name).await?;
        router.worker(worker_name)?;
        let agent = self.agent_of(&router).await?;

        let name = worker_name.to_string();
        let command = if enabled {
            AgentCommand::EnableWorker { name }
        } else {
            AgentCommand::DisableWorker { name }
        };
        let mut session = AgentSession::new(self.agents.as_ref(), &agent, router_name);
        session.send(command).await?;
        session.reload().await?;

        router.worker_mut(worker_name)?.enabled = enabled;
        recorded(
            if enabled {
                "enable worker"
            } else {
                "disable worker"
            },
            self.registry.update_router(&router).await,
        )
    }

    async fn agent_of(&self, router: &Router) -> RouterResult<Agent> {
        self.registry
            .find_agent_by_router(&router.id)
            .await?
            .ok_or_else(|| RouterError::NoAgent(router.name.clone()))
    }
}

/// Run one public operation, counting and logging its outcome.
async fn observed<T, F>(operation: &'static str, router: &str, fut: F) -> RouterResult<T>
where
    F: Future<Output = RouterResult<T>>,
{
    let result = fut.await;
    metrics::observe_operation(operation, result.is_ok());
    if let Err(e) = &result {
        if e.is_partial() {
            error!("Router '{router}' - {operation} partially applied: {e}");
        } else {
            warn!("Router '{router}' - {operation} failed: {e}");
        }
    }
    result
}

/// Tag a registry failure that happens after the agent already changed.
fn recorded<T>(operation: &str, result: RouterResult<T>) -> RouterResult<T> {
    result.map_err(|source| RouterError::RegistryWriteFailed {
        operation: operation.to_string(),
        source: Box::new(source),
    })
}

fn validate_name(kind: ResourceKind, name: &str) -> RouterResult<()> {
    if NAME_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(validation_error!("Invalid {} name '{}'", kind, name))
    }
}
