use anyhow::Result;
use clap::Parser;
use poolscout::{app, config};

#[derive(Parser, Debug)]
#[command(version, about = "New-pool detection and safety screening for Solana DEX launches")]
struct Args {
    /// Path to config file (optional)
    #[arg(long)]
    config: Option<String>,

    /// HTTP RPC endpoint URL
    #[arg(long)]
    rpc_url: Option<String>,

    /// WebSocket RPC endpoint URL
    #[arg(long)]
    ws_url: Option<String>,

    /// Delay between queued RPC calls in milliseconds
    #[arg(long)]
    request_delay_ms: Option<u64>,

    /// Webhook URL for pool notifications
    #[arg(long)]
    webhook_url: Option<String>,

    /// Path of the JSONL decision log
    #[arg(long)]
    verdict_log: Option<String>,

    /// Tolerate a freeze authority on deep, fast pools
    #[arg(long)]
    short_hold: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    // Load base configuration from file if provided
    let mut cfg = if let Some(path) = &args.config {
        config::Config::from_file(path)?
    } else {
        config::Config::default()
    };

    // Override with CLI args if provided (CLI has higher priority)
    if let Some(rpc_url) = args.rpc_url {
        cfg.rpc.http_url = rpc_url;
    }
    if let Some(ws_url) = args.ws_url {
        cfg.rpc.ws_url = ws_url;
    }
    if let Some(request_delay_ms) = args.request_delay_ms {
        cfg.rpc.request_delay_ms = request_delay_ms;
    }
    if let Some(webhook_url) = args.webhook_url {
        cfg.notify.webhook_url = Some(webhook_url);
    }
    if let Some(verdict_log) = args.verdict_log {
        cfg.notify.verdict_log_path = verdict_log;
    }
    if args.short_hold {
        cfg.safety.short_hold.enabled = true;
    }

    app::run(cfg).await
}
