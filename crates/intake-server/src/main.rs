use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use intake_llm::{LLMRegistry, OpenRouterProvider};
use intake_server::{AppConfig, AppState, router};

const DEFAULT_FILTER: &str = "task_intake=info,intake_server=info,intake_state=info,tower_http=info";

#[derive(Debug, Parser)]
#[command(name = "task-intake", version, about = "Conversational task intake assistant")]
struct Cli {
    /// YAML config file; defaults apply when it does not exist
    #[arg(short, long, default_value = "task-intake.yaml")]
    config: PathBuf,

    #[arg(long)]
    host: Option<String>,

    #[arg(short, long)]
    port: Option<u16>,

    /// Validate configuration and exit
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let provider = OpenRouterProvider::from_env(config.llm.clone())
        .context("LLM provider is not configured")?;
    info!(model = provider.model_name(), "LLM provider ready");
    let registry = Arc::new(LLMRegistry::single(Arc::new(provider)));

    let state = AppState::build(&config, registry).context("Failed to initialize")?;

    if cli.check_config {
        println!("Configuration OK");
        return Ok(());
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid listen address")?;
    let app = router(Arc::new(state));

    info!(%addr, "Task intake server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
