use async_trait::async_trait;

use voxgate_core::events::{MessageEvent, SessionStartEvent};
use voxgate_core::messages::ChatMessage;
use voxgate_core::stream::StreamHandle;

use crate::VoiceAgent;

/// Minimal agent that repeats the user's words back. Keeps no history.
pub struct EchoAgent {
    welcome: &'static str,
}

impl EchoAgent {
    pub fn new(_model: &str) -> Self {
        Self {
            welcome: "Welcome to the Echo Agent!",
        }
    }
}

#[async_trait]
impl VoiceAgent for EchoAgent {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn description(&self) -> &'static str {
        "Simple echo agent"
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
        _history: &[ChatMessage],
    ) -> anyhow::Result<Vec<ChatMessage>> {
        let text = event.text.as_deref().unwrap_or("");
        stream.tts(format!("You said: {text}"));
        stream.end();
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxgate_core::ids::{ConversationId, SessionId, TurnId};

    fn message_event(text: &str) -> MessageEvent {
        MessageEvent {
            session_id: SessionId::from_raw("s1"),
            conversation_id: ConversationId::from_raw("c1"),
            turn_id: TurnId::from_raw("t1"),
            text: Some(text.to_owned()),
            recording_url: None,
            recording_status: None,
            transcript: None,
            usage: None,
            metadata: None,
            from_phone_number: None,
            to_phone_number: None,
        }
    }

    #[tokio::test]
    async fn echoes_user_text() {
        let agent = EchoAgent::new("test");
        let (stream, mut rx) = StreamHandle::channel(TurnId::from_raw("t1"));

        let new_messages = agent
            .handle_message(&message_event("hi"), &stream, &[])
            .await
            .unwrap();
        assert!(new_messages.is_empty());

        let first = rx.try_recv().unwrap();
        assert!(std::str::from_utf8(&first).unwrap().contains("You said: hi"));
        let second = rx.try_recv().unwrap();
        assert!(std::str::from_utf8(&second).unwrap().contains("response.end"));
    }
}
