use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use etcd_client::{Client, ConnectOptions, GetOptions};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::core::{
    error::ErrorContext,
    model::{Agent, Router},
    ResourceKind, Registry, RouterError, RouterResult,
};

use super::Etcd;

/// Registry persisted in etcd, one JSON document per record.
///
/// Layout under the configured prefix:
///
/// ```text
/// {prefix}/routers/{router_id}        Router
/// {prefix}/agents/{agent_id}          Agent
/// {prefix}/links/agent/{router_id}    agent id
/// {prefix}/links/compute/{router_id}  compute id
/// {prefix}/computes/{agent_id}        compute id (written by provisioning)
/// ```
pub struct EtcdRegistry {
    config: Etcd,
    prefix: String,
    client: Arc<Mutex<Option<Client>>>,
}

impl EtcdRegistry {
    pub fn new(config: Etcd) -> Self {
        let prefix = config.prefix.trim_end_matches('/').to_string();
        Self {
            config,
            prefix,
            client: Arc::new(Mutex::new(None)),
        }
    }

    /// Connect a fresh etcd client from the configured options.
    async fn create_client(&self) -> Result<Client, etcd_client::Error> {
        let mut options = ConnectOptions::default();
        if let Some(timeout) = self.config.timeout {
            options = options.with_timeout(Duration::from_secs(timeout as u64));
        };
        if let Some(connect_timeout) = self.config.connect_timeout {
            options = options.with_connect_timeout(Duration::from_secs(connect_timeout as u64));
        };
        if let (Some(user), Some(password)) = (&self.config.user, &self.config.password) {
            options = options.with_user(user.clone(), password.clone());
        };

        Client::connect(self.config.host.clone(), Some(options)).await
    }

    /// Hand out a connected client, creating one if none is cached.
    async fn client(&self) -> RouterResult<Client> {
        let mut client_guard = self.client.lock().await;

        if client_guard.is_none() {
            log::info!("Creating new etcd client...");
            *client_guard = Some(self.create_client().await.with_context("etcd connect")?);
        }
        client_guard
            .clone()
            .ok_or_else(|| RouterError::Registry("Etcd client is not initialized".to_string()))
    }

    /// Drop the cached client so the next call reconnects.
    async fn reset_client(&self) {
        *self.client.lock().await = None;
    }

    fn router_key(&self, router_id: &str) -> String {
        format!("{}/routers/{}", self.prefix, router_id)
    }

    fn agent_key(&self, agent_id: &str) -> String {
        format!("{}/agents/{}", self.prefix, agent_id)
    }

    fn agent_link_key(&self, router_id: &str) -> String {
        format!("{}/links/agent/{}", self.prefix, router_id)
    }

    fn compute_link_key(&self, router_id: &str) -> String {
        format!("{}/links/compute/{}", self.prefix, router_id)
    }

    fn agent_compute_key(&self, agent_id: &str) -> String {
        format!("{}/computes/{}", self.prefix, agent_id)
    }

    async fn get(&self, key: &str) -> RouterResult<Option<Vec<u8>>> {
        let mut client = self.client().await?;
        match client.get(key, None).await {
            Ok(resp) => Ok(resp.kvs().first().map(|kv| kv.value().to_vec())),
            Err(e) => {
                self.reset_client().await;
                Err(RouterError::Registry(format!("etcd get {key}: {e}")))
            }
        }
    }

    async fn list(&self, prefix: &str) -> RouterResult<Vec<(String, Vec<u8>)>> {
        let mut client = self.client().await?;
        let options = GetOptions::new().with_prefix();
        match client.get(prefix, Some(options)).await {
            Ok(resp) => Ok(resp
                .kvs()
                .iter()
                .map(|kv| {
                    (
                        String::from_utf8_lossy(kv.key()).into_owned(),
                        kv.value().to_vec(),
                    )
                })
                .collect()),
            Err(e) => {
                self.reset_client().await;
                Err(RouterError::Registry(format!("etcd list {prefix}: {e}")))
            }
        }
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> RouterResult<()> {
        let mut client = self.client().await?;
        if let Err(e) = client.put(key, value, None).await {
            self.reset_client().await;
            return Err(RouterError::Registry(format!("etcd put {key}: {e}")));
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> RouterResult<()> {
        let mut client = self.client().await?;
        if let Err(e) = client.delete(key, None).await {
            self.reset_client().await;
            return Err(RouterError::Registry(format!("etcd delete {key}: {e}")));
        }
        Ok(())
    }

    async fn get_string(&self, key: &str) -> RouterResult<Option<String>> {
        Ok(self
            .get(key)
            .await?
            .map(|value| String::from_utf8_lossy(&value).into_owned()))
    }
}

#[async_trait]
impl Registry for EtcdRegistry {
    async fn find_routers(&self) -> RouterResult<Vec<Router>> {
        self.list(&format!("{}/routers/", self.prefix))
            .await?
            .iter()
            .map(|(_, value)| json_to_resource::<Router>(value))
            .collect()
    }

    async fn create_router(&self, mut router: Router) -> RouterResult<Router> {
        if self.find_router(&router.name).await?.is_some() {
            return Err(RouterError::already_exists(
                ResourceKind::Router,
                router.name,
            ));
        }
        if router.id.is_empty() {
            router.id = Uuid::new_v4().to_string();
        }
        self.put(&self.router_key(&router.id), resource_to_json(&router)?)
            .await?;
        Ok(router)
    }

    async fn update_router(&self, router: &Router) -> RouterResult<Router> {
        let key = self.router_key(&router.id);
        if self.get(&key).await?.is_none() {
            return Err(RouterError::not_found(ResourceKind::Router, &router.name));
        }
        self.put(&key, resource_to_json(router)?).await?;
        Ok(router.clone())
    }

    async fn delete_router(&self, router_id: &str) -> RouterResult<()> {
        self.delete(&self.compute_link_key(router_id)).await?;
        self.delete(&self.agent_link_key(router_id)).await?;
        self.delete(&self.router_key(router_id)).await
    }

    async fn find_agents(&self) -> RouterResult<Vec<Agent>> {
        self.list(&format!("{}/agents/", self.prefix))
            .await?
            .iter()
            .map(|(_, value)| json_to_resource::<Agent>(value))
            .collect()
    }

    async fn find_agent_by_router(&self, router_id: &str) -> RouterResult<Option<Agent>> {
        let Some(agent_id) = self.get_string(&self.agent_link_key(router_id)).await? else {
            return Ok(None);
        };
        match self.get(&self.agent_key(&agent_id)).await? {
            Some(value) => json_to_resource::<Agent>(&value).map(Some),
            None => Ok(None),
        }
    }

    async fn find_router_ids_by_agent(&self, agent_id: &str) -> RouterResult<Vec<String>> {
        let links_prefix = format!("{}/links/agent/", self.prefix);
        Ok(self
            .list(&links_prefix)
            .await?
            .into_iter()
            .filter(|(_, value)| value.as_slice() == agent_id.as_bytes())
            .filter_map(|(key, _)| key.strip_prefix(&links_prefix).map(str::to_string))
            .collect())
    }

    async fn add_router_agent_link(&self, router_id: &str, agent_id: &str) -> RouterResult<()> {
        let key = self.agent_link_key(router_id);
        match self.get_string(&key).await? {
            Some(existing) if existing == agent_id => Ok(()),
            Some(existing) => Err(RouterError::Registry(format!(
                "router {router_id} is already linked to agent {existing}"
            ))),
            None => self.put(&key, agent_id.as_bytes().to_vec()).await,
        }
    }

    async fn remove_router_agent_link(
        &self,
        router_id: &str,
        agent_id: &str,
    ) -> RouterResult<()> {
        let key = self.agent_link_key(router_id);
        match self.get_string(&key).await? {
            Some(existing) if existing == agent_id => self.delete(&key).await,
            _ => Ok(()),
        }
    }

    async fn find_compute_by_agent(&self, agent_id: &str) -> RouterResult<Option<String>> {
        self.get_string(&self.agent_compute_key(agent_id)).await
    }

    async fn find_compute_by_router(&self, router_id: &str) -> RouterResult<Option<String>> {
        self.get_string(&self.compute_link_key(router_id)).await
    }

    async fn add_router_compute_link(
        &self,
        router_id: &str,
        compute_id: &str,
    ) -> RouterResult<()> {
        self.put(
            &self.compute_link_key(router_id),
            compute_id.as_bytes().to_vec(),
        )
        .await
    }

    async fn remove_router_compute_link(
        &self,
        router_id: &str,
        compute_id: &str,
    ) -> RouterResult<()> {
        let key = self.compute_link_key(router_id);
        match self.get_string(&key).await? {
            Some(existing) if existing == compute_id => self.delete(&key).await,
            _ => Ok(()),
        }
    }

    async fn find_router_by_id(&self, router_id: &str) -> RouterResult<Router> {
        match self.get(&self.router_key(router_id)).await? {
            Some(value) => json_to_resource::<Router>(&value),
            None => Err(RouterError::not_found(ResourceKind::Router, router_id)),
        }
    }
}

pub fn json_to_resource<T>(value: &[u8]) -> RouterResult<T>
where
    T: DeserializeOwned,
{
    serde_json::from_slice(value).with_context("Invalid JSON data")
}

pub fn resource_to_json<T>(resource: &T) -> RouterResult<Vec<u8>>
where
    T: Serialize,
{
    serde_json::to_vec(resource).with_context("Unable to encode record")
}
