use crate::events::EventError;
use crate::signature::SignatureError;

/// HTTP-facing error taxonomy for the webhook gateway. Everything that can
/// abort a request before a stream starts lives here; failures inside an
/// already-streaming agent handler are relayed in-band instead and never
/// become an HTTP error.
#[derive(Clone, Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("missing signature header")]
    MissingSignature,
    #[error("invalid signature: {0}")]
    InvalidSignature(#[from] SignatureError),
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("unsupported event type: {0}")]
    UnsupportedEventType(String),
    #[error("{0} is not configured")]
    ConfigurationMissing(&'static str),
    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(String),
    #[error("upstream error {status}: {body}")]
    UpstreamStatus { status: u16, body: String },
}

impl WebhookError {
    pub fn status_code(&self) -> u16 {
        match self {
            // A missing header is a malformed request; only a present-but-
            // wrong signature is an authentication failure.
            Self::InvalidSignature(_) => 401,
            Self::MissingSignature | Self::InvalidPayload(_) | Self::UnsupportedEventType(_) => 400,
            Self::ConfigurationMissing(_) => 500,
            Self::UpstreamUnreachable(_) => 502,
            Self::UpstreamStatus { status, .. } => *status,
        }
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::MissingSignature => "missing_signature",
            Self::InvalidSignature(_) => "invalid_signature",
            Self::InvalidPayload(_) => "invalid_payload",
            Self::UnsupportedEventType(_) => "unsupported_event_type",
            Self::ConfigurationMissing(_) => "configuration_missing",
            Self::UpstreamUnreachable(_) => "upstream_unreachable",
            Self::UpstreamStatus { .. } => "upstream_status",
        }
    }
}

impl From<EventError> for WebhookError {
    fn from(err: EventError) -> Self {
        match err {
            EventError::UnsupportedType(name) => Self::UnsupportedEventType(name),
            other => Self::InvalidPayload(other.to_string()),
        }
    }
}
