use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tpa_admin_api::{app, AppState};

#[derive(Debug, Parser)]
#[command(name = "tpa-admin-api", version, about = "TPA administration API and quote intake")]
struct Args {
    /// Address to bind (overrides API_HOST)
    #[arg(long, env = "API_HOST")]
    host: Option<String>,

    /// Port to listen on (overrides API_PORT / PORT)
    #[arg(long, env = "API_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up JWT_SECRET, CONFIG_BUCKET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = tpa_admin_api::config::config().clone();
    if let Some(host) = args.host {
        config.api.host = host;
    }
    if let Some(port) = args.port {
        config.api.port = port;
    }

    if config.identity.jwt_secret.is_empty() {
        tracing::warn!("JWT_SECRET is not set; bearer tokens cannot be verified");
    }

    tracing::info!("Starting TPA Admin API in {:?} mode", config.environment);

    let bind_addr = format!("{}:{}", config.api.host, config.api.port);
    let state = AppState::from_config(config).await?;
    let app = app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("TPA Admin API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
