use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use voxgate_core::events::{MessageEvent, SessionStartEvent};
use voxgate_core::messages::ChatMessage;
use voxgate_core::stream::StreamHandle;

use crate::VoiceAgent;

/// Testing agent that answers in three parts over ~10 seconds with progress
/// payloads between them. Exercises long-lived streaming responses and
/// client-side wait handling.
pub struct SlowAgent {
    part_delay: Duration,
}

impl SlowAgent {
    pub fn new(_model: &str) -> Self {
        Self {
            part_delay: Duration::from_secs(5),
        }
    }

    /// Shrink the inter-part delay (tests).
    pub fn with_part_delay(part_delay: Duration) -> Self {
        Self { part_delay }
    }
}

#[async_trait]
impl VoiceAgent for SlowAgent {
    fn name(&self) -> &'static str {
        "slow"
    }

    fn description(&self) -> &'static str {
        "Responds in 3 parts over ~10 seconds (for wait/timeout testing)"
    }

    async fn handle_session_start(
        &self,
        _event: &SessionStartEvent,
        stream: &StreamHandle,
    ) -> anyhow::Result<()> {
        stream.tts(
            "Welcome! I'm a slow agent. \
             Every response takes about 10 seconds with updates along the way.",
        );
        stream.end();
        Ok(())
    }

    async fn handle_message(
        &self,
        _event: &MessageEvent,
        stream: &StreamHandle,
        _history: &[ChatMessage],
    ) -> anyhow::Result<Vec<ChatMessage>> {
        stream.tts("Processing your request now. Please wait 5 seconds.");
        stream.data(json!({"status": "loading", "progress": 0}));

        tokio::time::sleep(self.part_delay).await;

        stream.tts(" Still working. Please wait 5 more seconds.");
        stream.data(json!({"status": "processing", "progress": 50}));

        tokio::time::sleep(self.part_delay).await;

        stream.tts(" Done! Your request has been processed successfully.");
        stream.data(json!({"status": "complete", "progress": 100}));
        stream.end();

        Ok(Vec::new())
    }
}
