use secrecy::SecretString;

use voxgate_core::signature::DEFAULT_TOLERANCE_SECONDS;

/// Platform endpoint that authorizes browser sessions.
pub const AUTHORIZE_ENDPOINT: &str = "https://api.layercode.com/v1/agents/web/authorize_session";

#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("route paths must start with '/': {0}")]
    InvalidRoute(String),
    #[error("invalid port: {0}")]
    InvalidPort(String),
}

/// Server configuration, from environment variables with CLI overrides.
/// Secrets are wrapped in [`SecretString`] so they are redacted in Debug
/// output and never logged by accident.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub agent_route: String,
    pub authorize_route: String,
    pub webhook_secret: Option<SecretString>,
    pub api_key: Option<SecretString>,
    pub authorize_url: String,
    pub signature_tolerance_seconds: i64,
    pub default_model: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            agent_route: "/api/agent".into(),
            authorize_route: "/api/authorize".into(),
            webhook_secret: None,
            api_key: None,
            authorize_url: AUTHORIZE_ENDPOINT.into(),
            signature_tolerance_seconds: DEFAULT_TOLERANCE_SECONDS,
            default_model: "openai:gpt-5-nano".into(),
        }
    }
}

impl ServerConfig {
    /// Build a configuration from the process environment. Unset variables
    /// keep their defaults; routes are validated.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("PORT") {
            config.port = port.parse().map_err(|_| ConfigError::InvalidPort(port))?;
        }
        if let Ok(route) = std::env::var("AGENT_ROUTE") {
            config.agent_route = validate_route(&route)?;
        }
        if let Ok(route) = std::env::var("AUTHORIZE_ROUTE") {
            config.authorize_route = validate_route(&route)?;
        }
        if let Ok(secret) = std::env::var("LAYERCODE_WEBHOOK_SECRET") {
            config.webhook_secret = Some(SecretString::from(secret));
        }
        if let Ok(key) = std::env::var("LAYERCODE_API_KEY") {
            config.api_key = Some(SecretString::from(key));
        }
        if let Ok(model) = std::env::var("DEFAULT_MODEL") {
            config.default_model = model;
        }

        Ok(config)
    }
}

/// Routes must start with a slash; trailing slashes are stripped.
pub fn validate_route(route: &str) -> Result<String, ConfigError> {
    if !route.starts_with('/') {
        return Err(ConfigError::InvalidRoute(route.to_owned()));
    }
    let trimmed = route.trim_end_matches('/');
    Ok(if trimmed.is_empty() {
        "/".to_owned()
    } else {
        trimmed.to_owned()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.agent_route, "/api/agent");
        assert_eq!(config.authorize_route, "/api/authorize");
        assert_eq!(config.signature_tolerance_seconds, 300);
        assert!(config.webhook_secret.is_none());
    }

    #[test]
    fn routes_must_start_with_slash() {
        assert!(validate_route("api/agent").is_err());
        assert_eq!(validate_route("/api/agent/").unwrap(), "/api/agent");
        assert_eq!(validate_route("/").unwrap(), "/");
    }

    #[test]
    fn secrets_are_redacted_in_debug() {
        let config = ServerConfig {
            webhook_secret: Some(SecretString::from("whsec_super_secret")),
            ..Default::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("whsec_super_secret"), "leaked: {debug}");
    }
}
