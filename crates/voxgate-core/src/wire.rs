use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::TurnId;

/// Outbound events written to the `text/event-stream` response body. Every
/// frame carries the turn id it answers; `response.end` is terminal and
/// appears exactly once per response.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StreamFrame {
    #[serde(rename = "response.tts")]
    Tts { turn_id: TurnId, content: String },
    #[serde(rename = "response.data")]
    Data { turn_id: TurnId, content: Value },
    #[serde(rename = "response.end")]
    End { turn_id: TurnId },
}

impl StreamFrame {
    pub fn tts(turn_id: TurnId, content: impl Into<String>) -> Self {
        Self::Tts {
            turn_id,
            content: content.into(),
        }
    }

    pub fn data(turn_id: TurnId, content: Value) -> Self {
        Self::Data { turn_id, content }
    }

    pub fn end(turn_id: TurnId) -> Self {
        Self::End { turn_id }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::End { .. })
    }

    pub fn frame_type(&self) -> &'static str {
        match self {
            Self::Tts { .. } => "response.tts",
            Self::Data { .. } => "response.data",
            Self::End { .. } => "response.end",
        }
    }

    /// Encode as a single SSE frame: `data: <json>\n\n`, UTF-8.
    pub fn to_sse(&self) -> Bytes {
        // StreamFrame serialization cannot fail: all fields are Serialize
        // and the map keys are strings.
        let json = serde_json::to_string(self).unwrap_or_default();
        Bytes::from(format!("data: {json}\n\n"))
    }
}
