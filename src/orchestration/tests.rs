//! Orchestrator tests against an in-memory registry and a recording agent.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;

use super::RouterOrchestrator;
use crate::{
    agent::{AgentCommand, AgentReply},
    catalog::StaticCatalog,
    core::{
        error::AgentFailure,
        model::{Agent, Profile, Router},
        AgentClient, InMemoryRegistry, LifecycleState, Registry, ResourceKind, RouterError,
        RouterResult,
    },
};

/// Agent that records every command and rejects the ones it is told to.
#[derive(Default)]
struct RecordingAgent {
    calls: Mutex<Vec<AgentCommand>>,
    failing: Mutex<Vec<AgentCommand>>,
}

impl RecordingAgent {
    fn calls(&self) -> Vec<AgentCommand> {
        self.calls.lock().unwrap().clone()
    }

    fn fail_on(&self, command: AgentCommand) {
        self.failing.lock().unwrap().push(command);
    }

    fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    fn forget(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl AgentClient for RecordingAgent {
    async fn execute(&self, _agent: &Agent, command: &AgentCommand) -> RouterResult<AgentReply> {
        self.calls.lock().unwrap().push(command.clone());
        if self.failing.lock().unwrap().contains(command) {
            return Err(RouterError::AgentCallFailed {
                command: command.to_string(),
                reason: AgentFailure::Status(500),
                partial: false,
            });
        }
        Ok(AgentReply {
            status: 200,
            body: Some("OK".to_string()),
        })
    }
}

/// Registry whose router updates can be switched off.
struct FlakyRegistry {
    inner: InMemoryRegistry,
    fail_updates: AtomicBool,
}

#[async_trait]
impl Registry for FlakyRegistry {
    async fn find_routers(&self) -> RouterResult<Vec<Router>> {
        self.inner.find_routers().await
    }

    async fn create_router(&self, router: Router) -> RouterResult<Router> {
        self.inner.create_router(router).await
    }

    async fn update_router(&self, router: &Router) -> RouterResult<Router> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(RouterError::Registry("connection reset".to_string()));
        }
        self.inner.update_router(router).await
    }

    async fn delete_router(&self, router_id: &str) -> RouterResult<()> {
        self.inner.delete_router(router_id).await
    }

    async fn find_agents(&self) -> RouterResult<Vec<Agent>> {
        self.inner.find_agents().await
    }

    async fn find_agent_by_router(&self, router_id: &str) -> RouterResult<Option<Agent>> {
        self.inner.find_agent_by_router(router_id).await
    }

    async fn find_router_ids_by_agent(&self, agent_id: &str) -> RouterResult<Vec<String>> {
        self.inner.find_router_ids_by_agent(agent_id).await
    }

    async fn add_router_agent_link(&self, router_id: &str, agent_id: &str) -> RouterResult<()> {
        self.inner.add_router_agent_link(router_id, agent_id).await
    }

    async fn remove_router_agent_link(
        &self,
        router_id: &str,
        agent_id: &str,
    ) -> RouterResult<()> {
        self.inner.remove_router_agent_link(router_id, agent_id).await
    }

    async fn find_compute_by_agent(&self, agent_id: &str) -> RouterResult<Option<String>> {
        self.inner.find_compute_by_agent(agent_id).await
    }

    async fn find_compute_by_router(&self, router_id: &str) -> RouterResult<Option<String>> {
        self.inner.find_compute_by_router(router_id).await
    }

    async fn add_router_compute_link(
        &self,
        router_id: &str,
        compute_id: &str,
    ) -> RouterResult<()> {
        self.inner.add_router_compute_link(router_id, compute_id).await
    }

    async fn remove_router_compute_link(
        &self,
        router_id: &str,
        compute_id: &str,
    ) -> RouterResult<()> {
        self.inner
            .remove_router_compute_link(router_id, compute_id)
            .await
    }
}

fn profile(name: &str, kind: &str, sub_type: &str) -> Profile {
    Profile {
        name: name.to_string(),
        kind: kind.to_string(),
        sub_type: sub_type.to_string(),
        extra: Default::default(),
    }
}

fn catalog() -> Arc<StaticCatalog> {
    Arc::new(StaticCatalog::new(vec![
        profile("jk-default", "router", "jk"),
        profile("jonas-default", "container", "jonas"),
        profile("nginx-default", "router", "nginx"),
    ]))
}

fn registry() -> InMemoryRegistry {
    let registry = InMemoryRegistry::new();
    registry.register_agent(Agent {
        id: "agent-1".to_string(),
        name: "a1".to_string(),
        api_url: "http://10.0.0.1:9000".to_string(),
    });
    registry.register_agent_compute("agent-1", "vm-1");
    registry
}

struct Fixture {
    registry: Arc<InMemoryRegistry>,
    agent: Arc<RecordingAgent>,
    orchestrator: RouterOrchestrator,
}

fn fixture() -> Fixture {
    let registry = Arc::new(registry());
    let agent = Arc::new(RecordingAgent::default());
    let orchestrator = RouterOrchestrator::new(registry.clone(), agent.clone(), catalog());
    Fixture {
        registry,
        agent,
        orchestrator,
    }
}

/// Fixture with router `r1` already created on `a1`.
async fn fixture_with_router() -> Fixture {
    let fx = fixture();
    fx.orchestrator
        .create_router("r1", "a1", "jk-default", Some(80))
        .await
        .unwrap();
    fx
}

fn add_mount(lb: &str, path: &str) -> AgentCommand {
    AgentCommand::AddMountPoint {
        load_balancer: lb.to_string(),
        path: path.to_string(),
    }
}

#[tokio::test]
async fn test_create_then_remove_router() {
    let fx = fixture();
    let router = fx
        .orchestrator
        .create_router("r1", "a1", "jk-default", None)
        .await
        .unwrap();

    assert_eq!(router.state, LifecycleState::Created);
    let agent = fx.registry.find_agent_by_router(&router.id).await.unwrap();
    assert_eq!(agent.map(|a| a.name), Some("a1".to_string()));
    assert_eq!(
        fx.registry.find_compute_by_router(&router.id).await.unwrap(),
        Some("vm-1".to_string())
    );
    assert!(fx.agent.calls().is_empty());

    fx.orchestrator.remove_router("r1").await.unwrap();

    assert!(fx
        .orchestrator
        .get_router("r1")
        .await
        .unwrap_err()
        .is_not_found());
    let stats = fx.registry.get_stats();
    assert_eq!(stats.router_count, 0);
    assert_eq!(stats.agent_link_count, 0);
    assert_eq!(stats.compute_link_count, 0);
    assert!(fx
        .registry
        .find_router_ids_by_agent("agent-1")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_create_router_rejections() {
    let fx = fixture_with_router().await;

    let err = fx
        .orchestrator
        .create_router("r1", "a1", "jk-default", None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RouterError::AlreadyExists {
            kind: ResourceKind::Router,
            ..
        }
    ));

    let err = fx
        .orchestrator
        .create_router("r2", "ghost", "jk-default", None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RouterError::NotFound {
            kind: ResourceKind::Agent,
            ..
        }
    ));

    let err = fx
        .orchestrator
        .create_router("r2", "a1", "missing", None)
        .await
        .unwrap_err();
    assert!(matches!(err, RouterError::ProfileResolution { .. }));

    let err = fx
        .orchestrator
        .create_router("r2", "a1", "jk-default", Some(0))
        .await
        .unwrap_err();
    assert!(matches!(err, RouterError::Validation(_)));

    let err = fx
        .orchestrator
        .create_router("bad name", "a1", "jk-default", None)
        .await
        .unwrap_err();
    assert!(matches!(err, RouterError::Validation(_)));

    assert_eq!(fx.registry.get_stats().router_count, 1);
}

#[tokio::test]
async fn test_invalid_profile_writes_nothing() {
    let fx = fixture();

    let err = fx
        .orchestrator
        .create_router("r1", "a1", "jonas-default", None)
        .await
        .unwrap_err();
    assert!(matches!(err, RouterError::InvalidProfile { field: "type", .. }));

    let err = fx
        .orchestrator
        .create_router("r1", "a1", "nginx-default", None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RouterError::InvalidProfile {
            field: "subtype",
            ..
        }
    ));

    let stats = fx.registry.get_stats();
    assert_eq!(stats.router_count, 0);
    assert_eq!(stats.agent_link_count, 0);
}

#[tokio::test]
async fn test_create_worker_is_idempotent() {
    let fx = fixture_with_router().await;

    for _ in 0..2 {
        fx.orchestrator
            .create_worker("r1", "w1", "10.0.0.5", 8080)
            .await
            .unwrap();
    }

    assert_eq!(
        fx.agent.calls(),
        vec![
            AgentCommand::AddWorker {
                name: "w1".to_string(),
                host: "10.0.0.5".to_string(),
                port: 8080,
            },
            AgentCommand::Reload,
        ]
    );
    let router = fx.orchestrator.get_router("r1").await.unwrap();
    assert_eq!(router.workers.len(), 1);
    let worker = router.worker("w1").unwrap();
    assert!(worker.enabled);
    assert_eq!(worker.port, 8080);
}

#[tokio::test]
async fn test_concurrent_create_worker_sends_once() {
    let fx = fixture_with_router().await;

    let (first, second) = tokio::join!(
        fx.orchestrator.create_worker("r1", "w1", "10.0.0.5", 8080),
        fx.orchestrator.create_worker("r1", "w1", "10.0.0.5", 8080),
    );
    first.unwrap();
    second.unwrap();

    let adds = fx
        .agent
        .calls()
        .iter()
        .filter(|c| matches!(c, AgentCommand::AddWorker { .. }))
        .count();
    assert_eq!(adds, 1);
}

#[tokio::test]
async fn test_create_worker_agent_failure() {
    let fx = fixture_with_router().await;
    fx.agent.fail_on(AgentCommand::AddWorker {
        name: "w1".to_string(),
        host: "10.0.0.5".to_string(),
        port: 8080,
    });

    let err = fx
        .orchestrator
        .create_worker("r1", "w1", "10.0.0.5", 8080)
        .await
        .unwrap_err();
    assert!(matches!(err, RouterError::AgentCallFailed { .. }));
    assert!(!err.is_partial());

    // no reload after the failed add, nothing recorded
    assert_eq!(fx.agent.calls().len(), 1);
    let router = fx.orchestrator.get_router("r1").await.unwrap();
    assert!(router.workers.is_empty());
}

#[tokio::test]
async fn test_create_worker_rejects_bad_input() {
    let fx = fixture_with_router().await;

    assert!(matches!(
        fx.orchestrator
            .create_worker("r1", "w1", "10.0.0.5", 0)
            .await
            .unwrap_err(),
        RouterError::Validation(_)
    ));
    assert!(matches!(
        fx.orchestrator
            .create_worker("r1", "w1", " ", 8080)
            .await
            .unwrap_err(),
        RouterError::Validation(_)
    ));
    assert!(fx
        .orchestrator
        .create_worker("r9", "w1", "10.0.0.5", 8080)
        .await
        .unwrap_err()
        .is_not_found());
    assert!(fx.agent.calls().is_empty());
}

#[tokio::test]
async fn test_remove_worker_prunes_load_balancers() {
    let fx = fixture_with_router().await;
    let o = &fx.orchestrator;
    o.create_worker("r1", "w1", "10.0.0.5", 8080).await.unwrap();
    o.create_worker("r1", "w2", "10.0.0.6", 8080).await.unwrap();
    o.create_load_balancer("r1", "lb1", vec!["w1".into(), "w2".into()], vec!["/app".into()])
        .await
        .unwrap();
    o.create_load_balancer("r1", "lb2", vec!["w1".into()], vec!["/api".into()])
        .await
        .unwrap();
    fx.agent.forget();

    let router = o.remove_worker("r1", "w1").await.unwrap();

    assert_eq!(
        fx.agent.calls(),
        vec![
            AgentCommand::RemoveWorker {
                name: "w1".to_string()
            },
            AgentCommand::Reload,
        ]
    );
    assert!(router.worker("w1").is_err());
    assert_eq!(router.load_balancer("lb1").unwrap().members, vec!["w2"]);
    assert!(router.load_balancer("lb2").unwrap().members.is_empty());

    let stored = o.get_router("r1").await.unwrap();
    assert_eq!(stored, router);
}

#[tokio::test]
async fn test_remove_missing_worker() {
    let fx = fixture_with_router().await;

    let err = fx.orchestrator.remove_worker("r1", "w1").await.unwrap_err();
    assert!(matches!(
        err,
        RouterError::NotFound {
            kind: ResourceKind::Worker,
            ..
        }
    ));
    assert_eq!(err.to_string(), "Worker 'w1' doesn't exist !");
    assert!(fx.agent.calls().is_empty());
}

#[tokio::test]
async fn test_enable_disable_worker() {
    let fx = fixture_with_router().await;
    let o = &fx.orchestrator;
    o.create_worker("r1", "w1", "10.0.0.5", 8080).await.unwrap();
    fx.agent.forget();

    let router = o.disable_worker("r1", "w1").await.unwrap();
    assert!(!router.worker("w1").unwrap().enabled);

    let router = o.enable_worker("r1", "w1").await.unwrap();
    assert!(router.worker("w1").unwrap().enabled);

    assert_eq!(
        fx.agent.calls(),
        vec![
            AgentCommand::DisableWorker {
                name: "w1".to_string()
            },
            AgentCommand::Reload,
            AgentCommand::EnableWorker {
                name: "w1".to_string()
            },
            AgentCommand::Reload,
        ]
    );
}

#[tokio::test]
async fn test_disable_worker_agent_failure_keeps_flag() {
    let fx = fixture_with_router().await;
    let o = &fx.orchestrator;
    o.create_worker("r1", "w1", "10.0.0.5", 8080).await.unwrap();
    fx.agent.fail_on(AgentCommand::Reload);

    let err = o.disable_worker("r1", "w1").await.unwrap_err();
    // the disable itself landed before the reload failed
    assert!(err.is_partial());
    let router = o.get_router("r1").await.unwrap();
    assert!(router.worker("w1").unwrap().enabled);
}

#[tokio::test]
async fn test_start_and_stop_router() {
    let fx = fixture_with_router().await;
    let o = &fx.orchestrator;

    let router = o.start_router("r1").await.unwrap();
    assert_eq!(router.state, LifecycleState::Running);

    let router = o.stop_router("r1").await.unwrap();
    assert_eq!(router.state, LifecycleState::Stopped);

    let router = o.start_router("r1").await.unwrap();
    assert_eq!(router.state, LifecycleState::Running);

    assert_eq!(
        fx.agent.calls(),
        vec![AgentCommand::Reload, AgentCommand::Stop, AgentCommand::Reload]
    );
}

#[tokio::test]
async fn test_start_failure_leaves_starting() {
    let fx = fixture_with_router().await;
    let o = &fx.orchestrator;
    fx.agent.fail_on(AgentCommand::Reload);

    let err = o.start_router("r1").await.unwrap_err();
    assert!(matches!(err, RouterError::AgentCallFailed { .. }));
    assert_eq!(
        o.get_router("r1").await.unwrap().state,
        LifecycleState::Starting
    );

    fx.agent.heal();
    let router = o.start_router("r1").await.unwrap();
    assert_eq!(router.state, LifecycleState::Running);
}

#[tokio::test]
async fn test_stop_created_router() {
    let fx = fixture_with_router().await;

    let router = fx.orchestrator.stop_router("r1").await.unwrap();

    assert_eq!(router.state, LifecycleState::Stopped);
    assert_eq!(fx.agent.calls(), vec![AgentCommand::Stop]);
}

#[tokio::test]
async fn test_start_rejected_while_stopping() {
    let fx = fixture_with_router().await;
    let o = &fx.orchestrator;
    fx.agent.fail_on(AgentCommand::Stop);
    o.stop_router("r1").await.unwrap_err();
    assert_eq!(
        o.get_router("r1").await.unwrap().state,
        LifecycleState::Stopping
    );
    fx.agent.forget();

    let err = o.start_router("r1").await.unwrap_err();
    assert!(matches!(
        err,
        RouterError::InvalidState {
            operation: "start",
            ..
        }
    ));
    assert!(fx.agent.calls().is_empty());
}

#[tokio::test]
async fn test_member_names_must_be_worker_names() {
    let fx = fixture_with_router().await;
    let o = &fx.orchestrator;

    let err = o
        .create_load_balancer("r1", "lb1", vec!["w1,w2".into()], vec!["/app".into()])
        .await
        .unwrap_err();
    assert!(matches!(err, RouterError::Validation(_)));
    assert!(o.get_router("r1").await.unwrap().load_balancers.is_empty());

    o.create_load_balancer("r1", "lb1", vec!["w1".into()], vec!["/app".into()])
        .await
        .unwrap();
    fx.agent.forget();

    let err = o
        .add_worker_to_load_balancer("r1", "lb1", "x,y")
        .await
        .unwrap_err();
    assert!(matches!(err, RouterError::Validation(_)));
    assert!(fx.agent.calls().is_empty());
    assert_eq!(
        o.get_router("r1")
            .await
            .unwrap()
            .load_balancer("lb1")
            .unwrap()
            .members,
        vec!["w1"]
    );
}

#[tokio::test]
async fn test_create_load_balancer_commands() {
    let fx = fixture_with_router().await;

    let router = fx
        .orchestrator
        .create_load_balancer(
            "r1",
            "lb1",
            vec!["w2".into(), "w1".into()],
            vec!["/app".into(), "/api".into(), "/app".into()],
        )
        .await
        .unwrap();

    assert_eq!(
        fx.agent.calls(),
        vec![
            AgentCommand::DefineLoadBalancer {
                name: "lb1".to_string(),
                members: "w2,w1".to_string(),
            },
            add_mount("lb1", "/app"),
            add_mount("lb1", "/api"),
            AgentCommand::Reload,
        ]
    );
    let lb = router.load_balancer("lb1").unwrap();
    assert_eq!(lb.members, vec!["w2", "w1"]);
    assert_eq!(lb.mount_points, vec!["/app", "/api"]);
}

#[tokio::test]
async fn test_create_load_balancer_partial_failure() {
    let fx = fixture_with_router().await;
    fx.agent.fail_on(add_mount("lb1", "/api"));

    let err = fx
        .orchestrator
        .create_load_balancer(
            "r1",
            "lb1",
            vec!["w1".into()],
            vec!["/app".into(), "/api".into(), "/static".into()],
        )
        .await
        .unwrap_err();

    assert!(err.is_partial());
    // remaining mount and reload are never sent
    assert_eq!(fx.agent.calls().len(), 3);
    assert!(fx
        .orchestrator
        .get_router("r1")
        .await
        .unwrap()
        .load_balancers
        .is_empty());

    // retrying converges once the agent recovers
    fx.agent.heal();
    let router = fx
        .orchestrator
        .create_load_balancer(
            "r1",
            "lb1",
            vec!["w1".into()],
            vec!["/app".into(), "/api".into(), "/static".into()],
        )
        .await
        .unwrap();
    assert_eq!(router.load_balancer("lb1").unwrap().mount_points.len(), 3);
}

#[tokio::test]
async fn test_create_load_balancer_existing() {
    let fx = fixture_with_router().await;
    let o = &fx.orchestrator;
    o.create_load_balancer("r1", "lb1", vec!["w1".into()], vec!["/app".into()])
        .await
        .unwrap();
    fx.agent.forget();

    o.create_load_balancer("r1", "lb1", vec!["w1".into()], vec!["/app".into()])
        .await
        .unwrap();
    assert!(fx.agent.calls().is_empty());

    let err = o
        .create_load_balancer("r1", "lb1", vec!["w2".into()], vec!["/app".into()])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RouterError::AlreadyExists {
            kind: ResourceKind::LoadBalancer,
            ..
        }
    ));

    let err = o
        .create_load_balancer("r1", "lb2", vec![], vec!["app".into()])
        .await
        .unwrap_err();
    assert!(matches!(err, RouterError::Validation(_)));
}

#[tokio::test]
async fn test_remove_load_balancer_order() {
    let fx = fixture_with_router().await;
    let o = &fx.orchestrator;
    o.create_load_balancer(
        "r1",
        "lb1",
        vec!["w1".into()],
        vec!["/app".into(), "/api".into()],
    )
    .await
    .unwrap();
    fx.agent.forget();

    let router = o.remove_load_balancer("r1", "lb1").await.unwrap();

    assert!(router.load_balancers.is_empty());
    assert_eq!(
        fx.agent.calls(),
        vec![
            AgentCommand::RemoveLoadBalancer {
                name: "lb1".to_string()
            },
            AgentCommand::Reload,
            AgentCommand::RemoveMountPoint {
                load_balancer: "lb1".to_string(),
                path: "/app".to_string(),
            },
            AgentCommand::RemoveMountPoint {
                load_balancer: "lb1".to_string(),
                path: "/api".to_string(),
            },
        ]
    );

    let err = o.remove_load_balancer("r1", "lb1").await.unwrap_err();
    assert_eq!(err.to_string(), "Load Balancer 'lb1' doesn't exist !");
}

#[tokio::test]
async fn test_add_worker_to_load_balancer() {
    let fx = fixture_with_router().await;
    let o = &fx.orchestrator;
    o.create_load_balancer("r1", "lb1", vec!["w1".into()], vec!["/app".into()])
        .await
        .unwrap();
    fx.agent.forget();

    o.add_worker_to_load_balancer("r1", "lb1", "w2")
        .await
        .unwrap();

    assert_eq!(
        fx.agent.calls(),
        vec![
            AgentCommand::RedefineLoadBalancer {
                name: "lb1".to_string(),
                members: "w1,w2".to_string(),
            },
            AgentCommand::Reload,
        ]
    );
    let stored = o.get_router("r1").await.unwrap();
    assert_eq!(stored.load_balancer("lb1").unwrap().members, vec!["w1", "w2"]);

    // duplicates are passed through
    let router = o
        .add_worker_to_load_balancer("r1", "lb1", "w2")
        .await
        .unwrap();
    assert_eq!(
        router.load_balancer("lb1").unwrap().members,
        vec!["w1", "w2", "w2"]
    );
}

#[tokio::test]
async fn test_registry_failure_after_agent_update() {
    let registry = Arc::new(FlakyRegistry {
        inner: registry(),
        fail_updates: AtomicBool::new(false),
    });
    let agent = Arc::new(RecordingAgent::default());
    let o = RouterOrchestrator::new(registry.clone(), agent.clone(), catalog());
    o.create_router("r1", "a1", "jk-default", None)
        .await
        .unwrap();

    registry.fail_updates.store(true, Ordering::SeqCst);
    let err = o
        .create_worker("r1", "w1", "10.0.0.5", 8080)
        .await
        .unwrap_err();

    assert!(matches!(err, RouterError::RegistryWriteFailed { .. }));
    assert!(err.is_partial());
    assert_eq!(agent.calls().len(), 2);

    // once the registry is back, retrying records the worker
    registry.fail_updates.store(false, Ordering::SeqCst);
    let router = o
        .create_worker("r1", "w1", "10.0.0.5", 8080)
        .await
        .unwrap();
    assert!(router.worker("w1").is_ok());
}

#[tokio::test]
async fn test_missing_agent_link() {
    let fx = fixture_with_router().await;
    let router = fx.orchestrator.get_router("r1").await.unwrap();
    fx.registry
        .remove_router_agent_link(&router.id, "agent-1")
        .await
        .unwrap();

    let err = fx
        .orchestrator
        .create_worker("r1", "w1", "10.0.0.5", 8080)
        .await
        .unwrap_err();
    assert!(matches!(err, RouterError::NoAgent(ref name) if name == "r1"));
    assert_eq!(err.to_string(), "Unable to get the agent for router 'r1' !");
    assert!(fx.agent.calls().is_empty());
}

#[tokio::test]
async fn test_full_lifecycle() {
    let fx = fixture();
    let o = &fx.orchestrator;

    let router = o
        .create_router("r1", "a1", "jk-default", None)
        .await
        .unwrap();
    assert_eq!(router.state, LifecycleState::Created);

    let router = o.create_worker("r1", "w1", "10.0.0.5", 8080).await.unwrap();
    assert!(router.worker("w1").unwrap().enabled);

    let router = o
        .create_load_balancer("r1", "lb1", vec!["w1".into()], vec!["/app".into()])
        .await
        .unwrap();
    let lb = router.load_balancer("lb1").unwrap();
    assert_eq!(lb.members, vec!["w1"]);
    assert_eq!(lb.mount_points, vec!["/app"]);

    let router = o.remove_worker("r1", "w1").await.unwrap();
    assert!(router.workers.is_empty());
    assert!(router.load_balancer("lb1").unwrap().members.is_empty());

    let router = o.remove_load_balancer("r1", "lb1").await.unwrap();
    assert!(router.load_balancers.is_empty());

    let router = o.stop_router("r1").await.unwrap();
    assert_eq!(router.state, LifecycleState::Stopped);
    o.remove_router("r1").await.unwrap();

    assert!(o.get_router("r1").await.unwrap_err().is_not_found());
    assert_eq!(fx.registry.get_stats().agent_link_count, 0);
}
