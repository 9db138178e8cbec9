pub mod errors;
pub mod events;
pub mod ids;
pub mod messages;
pub mod signature;
pub mod stream;
pub mod wire;

pub use errors::WebhookError;
pub use events::{parse_webhook_event, EventError, WebhookEvent};
pub use messages::{ChatMessage, Role};
pub use signature::{sign_payload, verify_signature, SignatureError};
pub use stream::StreamHandle;
pub use wire::StreamFrame;
