use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;

pub const DEFAULT_API_URL: &str = "https://node.netrumlabs.dev";
pub const DEFAULT_RPC_URL: &str = "https://base-rpc.publicnode.com";
pub const DEFAULT_PRICE_URL: &str =
    "https://api.coingecko.com/api/v3/simple/price?ids=ethereum&vs_currencies=usd";

#[derive(Parser, Debug)]
#[command(name = "netwatch", version, about = "Netrum compute-node dashboard")]
pub struct Cli {
    /// Netrum API base URL
    #[arg(long, default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Base chain JSON-RPC endpoint for wallet balances
    #[arg(long, default_value = DEFAULT_RPC_URL)]
    pub rpc_url: String,

    /// ETH/USD spot price endpoint
    #[arg(long, default_value = DEFAULT_PRICE_URL)]
    pub price_url: String,

    /// Wallet address to select at startup
    #[arg(long)]
    pub address: Option<String>,

    /// Auto-refresh period for the selected node, in seconds
    #[arg(long, default_value_t = 300)]
    pub refresh_secs: u64,

    /// Per-endpoint request cooldown, in seconds
    #[arg(long, default_value_t = 30)]
    pub cooldown_secs: u64,

    /// Per-request timeout, in seconds
    #[arg(long, default_value_t = 15)]
    pub timeout_secs: u64,
}

/// Validated runtime settings derived from the CLI.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub rpc_url: String,
    pub price_url: String,
    pub initial_address: Option<String>,
    pub refresh_period: Duration,
    pub cooldown_window: Duration,
    pub request_timeout: Duration,
    pub debounce_quiet: Duration,
    pub settle_delay: Duration,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        if cli.refresh_secs == 0 {
            bail!("refresh period must be at least 1 second");
        }
        if cli.timeout_secs == 0 {
            bail!("request timeout must be at least 1 second");
        }

        Ok(Self {
            api_url: normalize_base_url(&cli.api_url)?,
            rpc_url: normalize_base_url(&cli.rpc_url)?,
            price_url: cli.price_url,
            initial_address: cli.address,
            refresh_period: Duration::from_secs(cli.refresh_secs),
            cooldown_window: Duration::from_secs(cli.cooldown_secs),
            request_timeout: Duration::from_secs(cli.timeout_secs),
            debounce_quiet: Duration::from_millis(300),
            settle_delay: Duration::from_millis(150),
        })
    }
}

/// Strip trailing slashes so path concatenation never doubles them, and
/// require an http(s) scheme up front instead of failing on first request.
fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        bail!("URL must start with http:// or https:// (got {raw:?})");
    }
    Ok(trimmed.to_string())
}
