use clap::Parser;

use voxgate_agents::AgentRegistry;
use voxgate_server::ServerConfig;

/// Webhook gateway between the voice platform and a pluggable agent.
#[derive(Parser, Debug)]
#[command(name = "voxgate", version, about)]
struct Cli {
    /// Agent to serve (starter, echo, slow)
    #[arg(long, default_value = "starter")]
    agent: String,

    /// Bind address override
    #[arg(long)]
    host: Option<String>,

    /// Port override
    #[arg(long)]
    port: Option<u16>,

    /// Model identifier passed to the agent
    #[arg(long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(model) = cli.model {
        config.default_model = model;
    }

    if config.webhook_secret.is_none() {
        tracing::warn!("LAYERCODE_WEBHOOK_SECRET is not set; webhooks will be rejected");
    }

    let registry = AgentRegistry::builtin();
    let agent = registry.create(&cli.agent, &config.default_model)?;
    tracing::info!(
        agent = agent.name(),
        description = agent.description(),
        model = %config.default_model,
        "agent selected"
    );

    let port = config.port;
    let _handle = voxgate_server::start(config, agent).await?;

    tracing::info!(port = port, "voxgate server ready");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    tracing::info!("shutting down");
    Ok(())
}
