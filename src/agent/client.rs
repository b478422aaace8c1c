use std::time::Instant;

use async_trait::async_trait;
use http::StatusCode;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    config::AgentConfig,
    config_error,
    core::{error::AgentFailure, model::Agent, AgentClient, RouterError, RouterResult},
    metrics,
};

use super::{AgentCommand, AgentReply, Manager};

/// Statuses an agent may answer with for a command to count as applied.
const ACCEPTED_STATUSES: [StatusCode; 4] = [
    StatusCode::OK,
    StatusCode::CREATED,
    StatusCode::ACCEPTED,
    StatusCode::NO_CONTENT,
];

static REDUNDANT_SLASHES: Lazy<Regex> =
    Lazy::new(|| Regex::new("/+").expect("Invalid regex pattern for slash collapsing"));

/// [`AgentClient`] speaking HTTP to the agent's REST API.
pub struct HttpAgentClient {
    http: reqwest::Client,
    config: AgentConfig,
}

impl HttpAgentClient {
    pub fn new(config: AgentConfig) -> RouterResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| config_error!("Unable to build agent HTTP client: {}", e))?;
        Ok(Self { http, config })
    }

    /// Full URL of `command` on `agent`.
    pub fn command_url(&self, agent: &Agent, command: &AgentCommand) -> String {
        let prefix = match command.manager() {
            Manager::Jk => &self.config.jk_manager_path,
            Manager::Server => &self.config.server_manager_path,
        };
        remove_redundant_forward_slash(&format!(
            "{}/{}/{}",
            agent.api_url,
            prefix,
            command.sub_path()
        ))
    }

    async fn send(&self, url: &str, command: &AgentCommand) -> Result<AgentReply, AgentFailure> {
        let response = self
            .http
            .request(command.method(), url)
            .query(&command.params())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgentFailure::Timeout(self.config.timeout())
                } else {
                    AgentFailure::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !ACCEPTED_STATUSES.contains(&status) {
            return Err(AgentFailure::Status(status.as_u16()));
        }

        let body = if status != StatusCode::NO_CONTENT {
            // an unreadable body does not undo an accepted command
            match response.text().await {
                Ok(text) => Some(text),
                Err(e) => {
                    warn!("Unable to read agent response for {command}: {e}");
                    None
                }
            }
        } else {
            None
        };

        Ok(AgentReply {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl AgentClient for HttpAgentClient {
    async fn execute(&self, agent: &Agent, command: &AgentCommand) -> RouterResult<AgentReply> {
        let url = self.command_url(agent, command);
        let bound = self.config.timeout();
        debug!("Agent '{}' request: {} {}", agent.name, command.method(), url);

        let started = Instant::now();
        let result = match tokio::time::timeout(bound, self.send(&url, command)).await {
            Ok(result) => result,
            Err(_) => Err(AgentFailure::Timeout(bound)),
        };
        metrics::observe_agent_request(command.label(), result.is_ok(), started.elapsed());

        match result {
            Ok(reply) => {
                debug!(
                    "Agent '{}' answered {} for {}: {:?}",
                    agent.name, reply.status, command, reply.body
                );
                Ok(reply)
            }
            Err(reason) => Err(RouterError::AgentCallFailed {
                command: command.to_string(),
                reason,
                partial: false,
            }),
        }
    }
}

/// Collapse runs of `/` in a URL while keeping the scheme separator intact.
pub fn remove_redundant_forward_slash(url: &str) -> String {
    REDUNDANT_SLASHES.replace_all(url, "/").replace(":/", "://")
}
