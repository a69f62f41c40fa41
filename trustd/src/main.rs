//! Trust Ledger Node
//!
//! Reads one JSON request per line on stdin and writes one JSON reply per
//! line on stdout. Logs go to stderr.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use trustd::{HttpFetcher, Node, NodeConfig, Reply, Request, Response};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Node configuration file
    #[arg(short, long, default_value = "trustd/configs/node.toml", env = "TRUSTD_CONFIG")]
    config: PathBuf,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = env::var("RUST_LOG").unwrap_or_else(|_| args.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = NodeConfig::load(&args.config)
        .await
        .with_context(|| format!("loading {}", args.config.display()))?;

    let fetcher = Arc::new(HttpFetcher::new(config.oracle.timeout())?);
    let node = Node::start(&config, fetcher)?;
    info!("trustd started; reading requests from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<Request>(line) {
            Ok(request) => node.handle.call(request).await?,
            Err(e) => {
                warn!("Unparseable request: {}", e);
                Reply {
                    height: 0,
                    response: Response::Error {
                        message: format!("invalid request: {}", e),
                    },
                    trust_events: Vec::new(),
                    ledger_events: Vec::new(),
                }
            }
        };

        let mut out = serde_json::to_string(&reply)?;
        out.push('\n');
        stdout.write_all(out.as_bytes()).await?;
        stdout.flush().await?;
    }

    info!("stdin closed, shutting down");
    node.shutdown().await?;
    Ok(())
}
