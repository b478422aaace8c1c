use log::{debug, warn};

use crate::core::{model::Agent, AgentClient, RouterError, RouterResult};

use super::{AgentCommand, AgentReply};

/// Ordered sequence of commands sent to one agent on behalf of one operation.
///
/// Commands go out strictly one after another; the first failure stops the
/// sequence. A failure after an earlier command landed is flagged partial,
/// since nothing already applied is rolled back.
pub struct AgentSession<'a> {
    client: &'a dyn AgentClient,
    agent: &'a Agent,
    router: &'a str,
    sent: usize,
}

impl<'a> AgentSession<'a> {
    pub fn new(client: &'a dyn AgentClient, agent: &'a Agent, router: &'a str) -> Self {
        Self {
            client,
            agent,
            router,
            sent: 0,
        }
    }

    pub async fn send(&mut self, command: AgentCommand) -> RouterResult<AgentReply> {
        debug!(
            "Router '{}' - agent '{}' <- {}",
            self.router, self.agent.name, command
        );
        match self.client.execute(self.agent, &command).await {
            Ok(reply) => {
                self.sent += 1;
                Ok(reply)
            }
            Err(RouterError::AgentCallFailed {
                command, reason, ..
            }) => {
                warn!(
                    "Router '{}' - agent '{}' rejected {} after {} applied command(s): {}",
                    self.router, self.agent.name, command, self.sent, reason
                );
                Err(RouterError::AgentCallFailed {
                    command,
                    reason,
                    partial: self.sent > 0,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Send every command in order, stopping at the first failure.
    pub async fn send_all(&mut self, commands: Vec<AgentCommand>) -> RouterResult<()> {
        for command in commands {
            self.send(command).await?;
        }
        Ok(())
    }

    /// Ask the agent to reload its configuration.
    pub async fn reload(&mut self) -> RouterResult<()> {
        self.send(AgentCommand::Reload).await.map(|_| ())
    }

    /// Number of commands the agent acknowledged so far.
    pub fn commands_sent(&self) -> usize {
        self.sent
    }
}
