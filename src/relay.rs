//! One chat turn end to end: session, encoding, submission, extraction.

use std::sync::Arc;
use std::time::Duration;

use crate::config::RelayConfig;
use crate::encoder::encode;
use crate::error::{RelayError, Result};
use crate::extract::extract;
use crate::poller::{submit_and_await, PollConfig};
use crate::session::{derive_session_id, SessionRegistry};
use crate::surface::AgentSurface;
use crate::types::{ExtractedOutput, Message, ToolSpec};

/// Result of a relayed turn.
#[derive(Debug, Clone)]
pub struct Turn {
    pub session_id: String,
    /// Prompt submitted to the agent
    pub prompt: String,
    pub output: ExtractedOutput,
}

/// Drives chat turns against an agent surface.
pub struct Relay {
    surface: Arc<dyn AgentSurface>,
    sessions: SessionRegistry,
    poll: PollConfig,
    default_timeout: Duration,
}

impl Relay {
    pub fn new(surface: Arc<dyn AgentSurface>, config: &RelayConfig) -> Self {
        Self::with_timing(
            surface,
            PollConfig::from(config),
            config.response_timeout(),
            config.input_ready_timeout(),
        )
    }

    pub fn with_timing(
        surface: Arc<dyn AgentSurface>,
        poll: PollConfig,
        default_timeout: Duration,
        input_timeout: Duration,
    ) -> Self {
        Self {
            sessions: SessionRegistry::new(surface.clone(), input_timeout),
            surface,
            poll,
            default_timeout,
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn surface(&self) -> &Arc<dyn AgentSurface> {
        &self.surface
    }

    /// Relay one turn. `timeout` overrides the configured response timeout.
    ///
    /// Commands are only looked for when `tools` is non-empty; otherwise the
    /// answer is returned as text whatever it contains.
    pub async fn run_turn(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
        timeout: Option<Duration>,
    ) -> Result<Turn> {
        if messages.is_empty() {
            return Err(RelayError::InvalidRequest("Messages required".to_string()));
        }

        let session_id = derive_session_id(messages);
        let prompt = encode(messages, tools);
        tracing::info!(
            session = %session_id,
            messages = messages.len(),
            tools = tools.len(),
            len = prompt.len(),
            "Relaying turn"
        );

        let settled = {
            let lease = self.sessions.begin_turn(&session_id, messages.len()).await?;
            submit_and_await(
                self.surface.as_ref(),
                lease.page(),
                &prompt,
                timeout.unwrap_or(self.default_timeout),
                &self.poll,
            )
            .await?
        };

        let output = extract(&settled, !tools.is_empty());
        match &output {
            ExtractedOutput::Commands(commands) => tracing::info!(
                session = %session_id,
                commands = commands.len(),
                "Turn produced tool calls"
            ),
            ExtractedOutput::PlainText(text) => tracing::info!(
                session = %session_id,
                len = text.len(),
                "Turn produced text"
            ),
        }

        Ok(Turn {
            session_id,
            prompt,
            output,
        })
    }

    /// Close every session page and the surface itself.
    pub async fn shutdown(&self) {
        self.sessions.close_all().await;
        if let Err(e) = self.surface.shutdown().await {
            tracing::warn!(surface = self.surface.name(), error = %e, "Surface shutdown failed");
        }
    }
}
