pub mod echo;
pub mod registry;
pub mod slow;
pub mod starter;

use async_trait::async_trait;

use voxgate_core::events::{MessageEvent, SessionEndEvent, SessionStartEvent};
use voxgate_core::messages::ChatMessage;
use voxgate_core::stream::StreamHandle;

pub use registry::{AgentFactory, AgentRegistry, UnknownAgentError};

/// The contract between the gateway and an agent implementation. These are
/// the only entry points the dispatch core ever calls.
///
/// Handlers stream output through the [`StreamHandle`]; they may take many
/// seconds and emit multiple fragments along the way. A handler returning
/// `Err` does not fail the HTTP response — the error is relayed in-band as a
/// `response.data` frame and the stream is still terminated.
#[async_trait]
pub trait VoiceAgent: Send + Sync {
    /// Registry name of this agent.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str {
        ""
    }

    /// Called for `session.start`. No history is available yet.
    async fn handle_session_start(
        &self,
        event: &SessionStartEvent,
        stream: &StreamHandle,
    ) -> anyhow::Result<()>;

    /// Called for `message` with the conversation history so far. Returned
    /// messages are appended to the stored history for subsequent turns.
    async fn handle_message(
        &self,
        event: &MessageEvent,
        stream: &StreamHandle,
        history: &[ChatMessage],
    ) -> anyhow::Result<Vec<ChatMessage>>;

    /// Called for `session.end`. Fire-and-forget from the protocol's view.
    async fn handle_session_end(&self, _event: &SessionEndEvent) -> anyhow::Result<()> {
        Ok(())
    }
}

impl std::fmt::Debug for dyn VoiceAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceAgent")
            .field("name", &self.name())
            .finish()
    }
}
