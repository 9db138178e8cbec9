pub mod authorize;
pub mod config;
pub mod server;
pub mod stream;
pub mod webhook;

pub use config::{ConfigError, ServerConfig};
pub use server::{build_router, start, AppState, ServerHandle};
pub use stream::stream_response;
