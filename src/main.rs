//! wgsync - keep WireGuard peer endpoints in sync with a directory peer
//!
//! `publish` serves the local peer table over the tunnel, `subscribe` polls a
//! directory and steers local peers toward the endpoints it reports.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{PublishArgs, SubscribeArgs};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use wgsync_api::{ApiServer, ApiServerConfig};
use wgsync_client::{HttpDirectoryClient, PollLoop};
use wgsync_control::WgCommand;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")");

/// wgsync - WireGuard peer endpoint synchronization
#[derive(Parser, Debug)]
#[command(name = "wgsync")]
#[command(about = "Keep WireGuard peer endpoints in sync with a directory peer")]
#[command(version = VERSION)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log level (trace, debug, info, warn, error); overrides --verbose
    #[arg(long, global = true, env = "WGSYNC_LOG_LEVEL")]
    log_level: Option<String>,

    /// Path to YAML configuration file
    #[arg(short, long, global = true, env = "WGSYNC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the local peer table to other peers over the tunnel
    #[command(long_about = r#"
Serve the local interface's peer table at GET /api/peers. Requests must carry
the shared bearer token. Bind to the interface's tunnel address so the table
is only reachable from inside the tunnel.

EXAMPLES:
  wgsync publish --interface wg0 --bind 10.8.0.1:8080 \
    --token-file /etc/wgsync/token
"#)]
    Publish(PublishArgs),

    /// Poll a directory and steer local peer endpoints toward it
    #[command(long_about = r#"
Poll the directory's peer table and, for every peer both sides know, set the
local endpoint to the one the directory observed and the keepalive to match
the peer's liveness. Peers the directory has lost track of are cleared.

EXAMPLES:
  wgsync subscribe --interface wg0 \
    --directory-url http://10.8.0.1:8080/api/peers \
    --token-file /etc/wgsync/token --dry-run

ENVIRONMENT VARIABLES:
  WGSYNC_INTERFACE       WireGuard interface
  WGSYNC_DIRECTORY_URL   Directory peers URL
  WGSYNC_TOKEN_FILE      File holding the bearer token
  WGSYNC_POLL            Seconds between polls
"#)]
    Subscribe(SubscribeArgs),
}

/// Setup logging with the specified log level
fn setup_logging(verbose: bool, log_level: Option<&str>) {
    let log_level = log_level.unwrap_or(if verbose { "debug" } else { "info" });

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();
}

async fn run_publish(args: PublishArgs, file: config::ConfigFile) -> Result<()> {
    let settings = config::build_publish_settings(args, file)?;
    let control = Arc::new(WgCommand::with_program(settings.wg_path));

    let server = ApiServer::new(
        ApiServerConfig {
            bind_addr: settings.bind,
            interface: settings.interface,
            tokens: vec![settings.token],
            excluded_peers: settings.exclude_peers,
        },
        control,
    );

    server.start().await.context("Directory server failed")
}

async fn run_subscribe(args: SubscribeArgs, file: config::ConfigFile) -> Result<()> {
    let settings = config::build_subscribe_settings(args, file)?;
    let directory = HttpDirectoryClient::new(
        settings.directory_url.as_str(),
        settings.token,
        settings.sync.fetch_timeout,
    )
    .context("Failed to create directory client")?;
    let control = Arc::new(WgCommand::with_program(settings.wg_path));

    info!("Using directory {}", directory.url());

    let mut poll_loop = PollLoop::new(settings.sync, Arc::new(directory), control);
    let sync = poll_loop.config();
    info!(
        "Syncing {} every {:?}{}",
        sync.interface,
        sync.poll_interval,
        if sync.dry_run { " (dry run)" } else { "" }
    );

    poll_loop.run().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.log_level.as_deref());
    info!("wgsync {} (built {})", VERSION, env!("BUILD_TIME"));

    let file = config::load_config_file(cli.config.as_deref())?;

    let task = async move {
        match cli.command {
            Commands::Publish(args) => run_publish(args, file).await,
            Commands::Subscribe(args) => run_subscribe(args, file).await,
        }
    };

    tokio::select! {
        result = task => {
            if let Err(e) = &result {
                error!("{:#}", e);
            }
            result
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    }
}
