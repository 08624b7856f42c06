//! Command line and config file handling
//!
//! Every setting can come from a CLI flag, an environment variable, or the
//! YAML config file given with `--config`; flags and environment win over the
//! file. The bearer token is always read from a file.

use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;
use wgsync_client::SyncConfig;

const DEFAULT_INTERFACE: &str = "wg0";
const DEFAULT_WG_PATH: &str = "wg";
const DEFAULT_BIND: &str = "127.0.0.1:8080";
const DEFAULT_POLL_SECS: u64 = 10;
const DEFAULT_KEEPALIVE_SECS: u32 = 25;
const DEFAULT_STALE_THRESHOLD_SECS: u64 = 120;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Configuration file format
///
/// ```yaml
/// interface: wg0
/// token_file: /etc/wgsync/token
/// publish:
///   bind: 10.8.0.1:8080
///   exclude_peers: ["<public key>"]
/// subscribe:
///   directory_url: http://10.8.0.1:8080/api/peers
///   poll_interval: 10
///   keepalive: 25
///   stale_threshold: 120
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub interface: Option<String>,
    pub wg_path: Option<PathBuf>,
    pub token_file: Option<PathBuf>,
    #[serde(default)]
    pub publish: PublishSection,
    #[serde(default)]
    pub subscribe: SubscribeSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublishSection {
    pub bind: Option<SocketAddr>,
    #[serde(default)]
    pub exclude_peers: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubscribeSection {
    pub directory_url: Option<String>,
    pub poll_interval: Option<u64>,
    pub keepalive: Option<u32>,
    pub stale_threshold: Option<u64>,
    pub fetch_timeout: Option<u64>,
    pub dry_run: Option<bool>,
}

/// Options shared by both subcommands
#[derive(Args, Debug, Clone, Default)]
pub struct TunnelArgs {
    /// WireGuard interface (e.g., wg0)
    #[arg(long, env = "WGSYNC_INTERFACE")]
    pub interface: Option<String>,

    /// File holding the bearer token
    #[arg(long, env = "WGSYNC_TOKEN_FILE")]
    pub token_file: Option<PathBuf>,

    /// Path to the `wg` binary
    #[arg(long, env = "WGSYNC_WG_PATH")]
    pub wg_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct PublishArgs {
    #[command(flatten)]
    pub tunnel: TunnelArgs,

    /// Address to serve on; use the interface's tunnel address (e.g., 10.8.0.1:8080)
    #[arg(long, env = "WGSYNC_BIND")]
    pub bind: Option<SocketAddr>,

    /// Public key to leave out of the published table (repeatable)
    #[arg(long = "exclude-peer")]
    pub exclude_peers: Vec<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SubscribeArgs {
    #[command(flatten)]
    pub tunnel: TunnelArgs,

    /// Directory peers URL (e.g., http://10.8.0.1:8080/api/peers)
    #[arg(long, env = "WGSYNC_DIRECTORY_URL")]
    pub directory_url: Option<String>,

    /// Seconds between polls
    #[arg(long = "poll", env = "WGSYNC_POLL")]
    pub poll_interval: Option<u64>,

    /// Keepalive seconds for peers that are online
    #[arg(long, env = "WGSYNC_KEEPALIVE")]
    pub keepalive: Option<u32>,

    /// Seconds after the last handshake before a peer counts as offline
    #[arg(long, env = "WGSYNC_STALE_THRESHOLD")]
    pub stale_threshold: Option<u64>,

    /// Directory request timeout in seconds
    #[arg(long, env = "WGSYNC_FETCH_TIMEOUT")]
    pub fetch_timeout: Option<u64>,

    /// Log the changes instead of applying them
    #[arg(long)]
    pub dry_run: bool,
}

/// Resolved settings of `wgsync publish`
#[derive(Debug, Clone)]
pub struct PublishSettings {
    pub interface: String,
    pub wg_path: PathBuf,
    pub token: String,
    pub bind: SocketAddr,
    pub exclude_peers: Vec<String>,
}

/// Resolved settings of `wgsync subscribe`
#[derive(Debug, Clone)]
pub struct SubscribeSettings {
    pub wg_path: PathBuf,
    pub token: String,
    pub directory_url: Url,
    pub sync: SyncConfig,
}

/// Load configuration from YAML file, or defaults when no file was given
pub fn load_config_file(path: Option<&Path>) -> Result<ConfigFile> {
    let Some(path) = path else {
        return Ok(ConfigFile::default());
    };

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Read the bearer token, trimming surrounding whitespace
pub fn load_token(path: &Path) -> Result<String> {
    let token = fs::read_to_string(path)
        .with_context(|| format!("Failed to read token file: {}", path.display()))?;
    let token = token.trim();
    if token.is_empty() {
        anyhow::bail!("Token file is empty: {}", path.display());
    }
    Ok(token.to_string())
}

struct TunnelSettings {
    interface: String,
    wg_path: PathBuf,
    token: String,
}

fn resolve_tunnel(args: TunnelArgs, file: &ConfigFile) -> Result<TunnelSettings> {
    let interface = args
        .interface
        .or_else(|| file.interface.clone())
        .unwrap_or_else(|| DEFAULT_INTERFACE.to_string());
    if interface.trim().is_empty() {
        anyhow::bail!("Interface name cannot be empty");
    }

    let wg_path = args
        .wg_path
        .or_else(|| file.wg_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_WG_PATH));

    let token_file = args
        .token_file
        .or_else(|| file.token_file.clone())
        .ok_or_else(|| anyhow::anyhow!("Token file is required (use --token-file or config file)"))?;

    Ok(TunnelSettings {
        interface,
        wg_path,
        token: load_token(&token_file)?,
    })
}

/// Merge CLI args with config file, giving precedence to CLI args
pub fn build_publish_settings(args: PublishArgs, file: ConfigFile) -> Result<PublishSettings> {
    let tunnel = resolve_tunnel(args.tunnel, &file)?;

    let bind = match args.bind.or(file.publish.bind) {
        Some(bind) => bind,
        None => DEFAULT_BIND
            .parse()
            .context("Invalid default bind address")?,
    };

    let mut exclude_peers = file.publish.exclude_peers;
    for key in args.exclude_peers {
        if !exclude_peers.contains(&key) {
            exclude_peers.push(key);
        }
    }

    Ok(PublishSettings {
        interface: tunnel.interface,
        wg_path: tunnel.wg_path,
        token: tunnel.token,
        bind,
        exclude_peers,
    })
}

/// Merge CLI args with config file, giving precedence to CLI args
pub fn build_subscribe_settings(
    args: SubscribeArgs,
    file: ConfigFile,
) -> Result<SubscribeSettings> {
    let tunnel = resolve_tunnel(args.tunnel, &file)?;
    let section = file.subscribe;

    let directory_url = args
        .directory_url
        .or(section.directory_url)
        .ok_or_else(|| {
            anyhow::anyhow!("Directory URL is required (use --directory-url or config file)")
        })?;
    let directory_url = parse_directory_url(&directory_url)?;

    let poll_interval = args
        .poll_interval
        .or(section.poll_interval)
        .unwrap_or(DEFAULT_POLL_SECS);
    if poll_interval == 0 {
        anyhow::bail!("Poll interval must be at least 1 second");
    }

    let keepalive = args
        .keepalive
        .or(section.keepalive)
        .unwrap_or(DEFAULT_KEEPALIVE_SECS);
    if keepalive > u16::MAX as u32 {
        anyhow::bail!("Keepalive must be at most {} seconds", u16::MAX);
    }

    let fetch_timeout = args
        .fetch_timeout
        .or(section.fetch_timeout)
        .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS);
    if fetch_timeout == 0 {
        anyhow::bail!("Fetch timeout must be at least 1 second");
    }

    let sync = SyncConfig {
        interface: tunnel.interface,
        poll_interval: Duration::from_secs(poll_interval),
        keepalive,
        staleness_threshold: args
            .stale_threshold
            .or(section.stale_threshold)
            .unwrap_or(DEFAULT_STALE_THRESHOLD_SECS),
        dry_run: args.dry_run || section.dry_run.unwrap_or(false),
        fetch_timeout: Duration::from_secs(fetch_timeout),
        ..Default::default()
    };

    Ok(SubscribeSettings {
        wg_path: tunnel.wg_path,
        token: tunnel.token,
        directory_url,
        sync,
    })
}

fn parse_directory_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).with_context(|| {
        format!(
            "Invalid directory URL '{}' (expected http://host:port/path)",
            raw
        )
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        anyhow::bail!(
            "Invalid directory URL '{}' (scheme must be http or https)",
            raw
        );
    }
    if url.host_str().map_or(true, str::is_empty) {
        anyhow::bail!("Invalid directory URL '{}' (host cannot be empty)", raw);
    }
    Ok(url)
}
