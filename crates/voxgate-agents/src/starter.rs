use async_trait::async_trait;
use tracing::debug;

use voxgate_core::events::{MessageEvent, SessionEndEvent, SessionStartEvent};
use voxgate_core::messages::ChatMessage;
use voxgate_core::stream::StreamHandle;

use crate::VoiceAgent;

/// Scripted conversational agent. Greets on session start, acknowledges each
/// message, and records both sides of the exchange in the conversation
/// history — the reference agent for exercising the history path without a
/// model behind it.
pub struct StarterAgent {
    welcome: &'static str,
}

impl StarterAgent {
    pub fn new(_model: &str) -> Self {
        Self {
            welcome: "Hi there! How can I help today?",
        }
    }
}

#[async_trait]
impl VoiceAgent for StarterAgent {
    fn name(&self) -> &'static str {
        "starter"
    }

    fn description(&self) -> &'static str {
        "Concise conversational agent"
    }

    async fn handle_session_start(
        &self,
        _event: &SessionStartEvent,
        stream: &StreamHandle,
    ) -> anyhow::Result<()> {
        stream.tts(self.welcome);
        stream.end();
        Ok(())
    }

    async fn handle_message(
        &self,
        event: &MessageEvent,
        stream: &StreamHandle,
        history: &[ChatMessage],
    ) -> anyhow::Result<Vec<ChatMessage>> {
        let user_text = event.text.as_deref().unwrap_or("").to_owned();
        let turn = history.len() / 2 + 1;

        let reply = if user_text.is_empty() {
            "I didn't catch that. Could you say it again?".to_owned()
        } else {
            format!("Got it — noted as turn {turn}.")
        };

        stream.tts(&reply);
        stream.end();

        debug!(turn, "starter agent replied");
        Ok(vec![
            ChatMessage::user(user_text),
            ChatMessage::assistant(reply),
        ])
    }

    async fn handle_session_end(&self, event: &SessionEndEvent) -> anyhow::Result<()> {
        debug!(
            session_id = %event.session_id,
            duration_ms = event.duration,
            "session ended"
        );
        Ok(())
    }
}
