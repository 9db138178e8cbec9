use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::{ConversationId, SessionId, TurnId};

/// The five inbound webhook event kinds, discriminated by the `type` field.
///
/// `session.start`, `message` and `data` occur inside a conversational turn
/// and require `turn_id`; `session.end` and `session.update` are
/// session-lifecycle events and never carry one. An event missing a required
/// field for its own variant fails parsing — nothing is defaulted silently.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WebhookEvent {
    #[serde(rename = "session.start")]
    SessionStart(SessionStartEvent),
    #[serde(rename = "message")]
    Message(MessageEvent),
    #[serde(rename = "data")]
    Data(DataEvent),
    #[serde(rename = "session.end")]
    SessionEnd(SessionEndEvent),
    #[serde(rename = "session.update")]
    SessionUpdate(SessionUpdateEvent),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionStartEvent {
    pub session_id: SessionId,
    pub conversation_id: ConversationId,
    pub turn_id: TurnId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_phone_number: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageEvent {
    pub session_id: SessionId,
    pub conversation_id: ConversationId,
    pub turn_id: TurnId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_phone_number: Option<String>,
}

/// Client-sent structured JSON. The payload itself is opaque to the gateway;
/// an absent `data` field is treated as an empty object.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataEvent {
    pub session_id: SessionId,
    pub conversation_id: ConversationId,
    pub turn_id: TurnId,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_phone_number: Option<String>,
}

/// One line of the session transcript carried by `session.end`. The platform
/// adds fields over time, so unknown keys are retained rather than rejected.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: String,
    pub text: String,
    /// Unix millis or an ISO-8601 string, depending on platform version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionEndEvent {
    pub session_id: SessionId,
    pub conversation_id: ConversationId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<String>,
    /// Milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcription_duration_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tts_duration_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<Vec<TranscriptEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_phone_number: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionUpdateEvent {
    pub session_id: SessionId,
    pub conversation_id: ConversationId,
    /// "completed" | "failed"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_phone_number: Option<String>,
}

impl WebhookEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SessionStart(_) => "session.start",
            Self::Message(_) => "message",
            Self::Data(_) => "data",
            Self::SessionEnd(_) => "session.end",
            Self::SessionUpdate(_) => "session.update",
        }
    }

    pub fn session_id(&self) -> &SessionId {
        match self {
            Self::SessionStart(e) => &e.session_id,
            Self::Message(e) => &e.session_id,
            Self::Data(e) => &e.session_id,
            Self::SessionEnd(e) => &e.session_id,
            Self::SessionUpdate(e) => &e.session_id,
        }
    }

    pub fn conversation_id(&self) -> &ConversationId {
        match self {
            Self::SessionStart(e) => &e.conversation_id,
            Self::Message(e) => &e.conversation_id,
            Self::Data(e) => &e.conversation_id,
            Self::SessionEnd(e) => &e.conversation_id,
            Self::SessionUpdate(e) => &e.conversation_id,
        }
    }

    /// Present only for the in-turn events.
    pub fn turn_id(&self) -> Option<&TurnId> {
        match self {
            Self::SessionStart(e) => Some(&e.turn_id),
            Self::Message(e) => Some(&e.turn_id),
            Self::Data(e) => Some(&e.turn_id),
            Self::SessionEnd(_) | Self::SessionUpdate(_) => None,
        }
    }
}

/// Why a raw body failed to become a [`WebhookEvent`].
#[derive(Clone, Debug, thiserror::Error)]
pub enum EventError {
    #[error("malformed JSON body: {0}")]
    MalformedJson(String),
    #[error("unsupported event type: {0}")]
    UnsupportedType(String),
    #[error("payload schema violation: {0}")]
    SchemaViolation(String),
}

const EVENT_TYPES: [&str; 5] = [
    "session.start",
    "message",
    "data",
    "session.end",
    "session.update",
];

/// Validate a raw webhook body into a typed event. All-or-nothing: no
/// partially populated event ever escapes this function.
pub fn parse_webhook_event(raw: &[u8]) -> Result<WebhookEvent, EventError> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| EventError::MalformedJson(format!("body is not UTF-8: {e}")))?;
    let value: Value = serde_json::from_str(text)
        .map_err(|e| EventError::MalformedJson(e.to_string()))?;

    let obj = value
        .as_object()
        .ok_or_else(|| EventError::MalformedJson("body is not a JSON object".into()))?;

    let event_type = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| EventError::SchemaViolation("missing string field `type`".into()))?;

    if !EVENT_TYPES.contains(&event_type) {
        return Err(EventError::UnsupportedType(event_type.to_owned()));
    }

    serde_json::from_value(value).map_err(|e| EventError::SchemaViolation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> Result<WebhookEvent, EventError> {
        parse_webhook_event(value.to_string().as_bytes())
    }

    #[test]
    fn parses_all_five_minimal_variants() {
        let turnful = ["session.start", "message", "data"];
        for ty in turnful {
            let event = parse(json!({
                "type": ty,
                "session_id": "s1",
                "conversation_id": "c1",
                "turn_id": "t1",
            }))
            .unwrap();
            assert_eq!(event.event_type(), ty);
            assert_eq!(event.turn_id().unwrap().as_str(), "t1");
        }

        for ty in ["session.end", "session.update"] {
            let event = parse(json!({
                "type": ty,
                "session_id": "s1",
                "conversation_id": "c1",
            }))
            .unwrap();
            assert_eq!(event.event_type(), ty);
            assert!(event.turn_id().is_none());
        }
    }

    #[test]
    fn turn_events_require_turn_id() {
        for ty in ["session.start", "message", "data"] {
            let err = parse(json!({
                "type": ty,
                "session_id": "s1",
                "conversation_id": "c1",
            }))
            .unwrap_err();
            assert!(matches!(err, EventError::SchemaViolation(_)), "{ty}: {err}");
        }
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = parse(json!({
            "type": "unknown.event",
            "session_id": "s1",
            "conversation_id": "c1",
        }))
        .unwrap_err();
        assert!(matches!(err, EventError::UnsupportedType(ref t) if t == "unknown.event"));
    }

    #[test]
    fn missing_required_common_field_is_rejected() {
        let err = parse(json!({
            "type": "message",
            "session_id": "s1",
            "turn_id": "t1",
        }))
        .unwrap_err();
        assert!(matches!(err, EventError::SchemaViolation(_)));
    }

    #[test]
    fn non_object_bodies_are_malformed() {
        assert!(matches!(
            parse_webhook_event(b"not json"),
            Err(EventError::MalformedJson(_))
        ));
        assert!(matches!(
            parse_webhook_event(b"[1,2,3]"),
            Err(EventError::MalformedJson(_))
        ));
        assert!(matches!(
            parse_webhook_event(&[0xff, 0xfe]),
            Err(EventError::MalformedJson(_))
        ));
    }

    #[test]
    fn message_carries_optional_fields() {
        let event = parse(json!({
            "type": "message",
            "session_id": "s1",
            "conversation_id": "c1",
            "turn_id": "t1",
            "text": "hello",
            "recording_status": "enabled",
            "usage": {"tokens": 12},
        }))
        .unwrap();
        let WebhookEvent::Message(msg) = event else {
            panic!("expected message variant");
        };
        assert_eq!(msg.text.as_deref(), Some("hello"));
        assert_eq!(msg.recording_status.as_deref(), Some("enabled"));
        assert_eq!(msg.usage.unwrap()["tokens"], 12);
    }

    #[test]
    fn data_payload_defaults_to_empty_object() {
        let event = parse(json!({
            "type": "data",
            "session_id": "s1",
            "conversation_id": "c1",
            "turn_id": "t1",
        }))
        .unwrap();
        let WebhookEvent::Data(data) = event else {
            panic!("expected data variant");
        };
        assert!(data.data.is_empty());
    }

    #[test]
    fn session_end_transcript_tolerates_extra_fields() {
        let event = parse(json!({
            "type": "session.end",
            "session_id": "s1",
            "conversation_id": "c1",
            "duration": 4200,
            "transcript": [
                {"role": "user", "text": "hi", "timestamp": 1710000000000i64, "confidence": 0.93},
                {"role": "assistant", "text": "hello", "timestamp": "2024-03-09T16:00:01Z"},
            ],
        }))
        .unwrap();
        let WebhookEvent::SessionEnd(end) = event else {
            panic!("expected session.end variant");
        };
        let transcript = end.transcript.unwrap();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].role, "user");
        assert!(transcript[0].extra.contains_key("confidence"));
    }

    #[test]
    fn serde_roundtrip_preserves_tag() {
        let event = parse(json!({
            "type": "session.update",
            "session_id": "s1",
            "conversation_id": "c1",
            "recording_status": "completed",
            "recording_url": "https://example.com/rec.wav",
        }))
        .unwrap();
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "session.update");
        let parsed: WebhookEvent = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.event_type(), "session.update");
    }
}
