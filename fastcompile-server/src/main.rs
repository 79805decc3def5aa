use clap::Parser;
use fastcompile::ServiceConfig;
use fastcompile_server::{create_app, run_server};
use std::{net::SocketAddr, path::PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to listen on
    #[arg(short, long, default_value = "127.0.0.1:11111")]
    addr: SocketAddr,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root directory of ephemeral workspaces
    #[arg(long)]
    workspace_root: Option<PathBuf>,

    /// Base directory of the per-language backends
    #[arg(long)]
    backends_dir: Option<PathBuf>,

    /// Job timeout in seconds, 0 disables it
    #[arg(long)]
    job_timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServiceConfig::load(path)?,
        None => ServiceConfig::default(),
    };
    if let Some(root) = args.workspace_root {
        config.workspace_root = root;
    }
    if let Some(dir) = args.backends_dir {
        config.backends_dir = dir;
    }
    if let Some(secs) = args.job_timeout {
        config.job_timeout_secs = secs;
    }

    let (app, dispatcher) = create_app(&config).await?;
    info!("Serving languages: {}", dispatcher.languages().join(", "));

    run_server(app, args.addr, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await?;

    info!("Stopping backends");
    dispatcher.shutdown().await;
    Ok(())
}
