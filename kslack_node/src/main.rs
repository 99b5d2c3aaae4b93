//! kslack-node entry point.

use eyre::{Result, WrapErr, bail};
use kslack_node::{Config, KSlackNode};
use tokio::io::{BufReader, stdin, stdout};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Initialize tracing. Logs go to stderr, stdout carries the events.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let Some(config_file) = std::env::args().nth(1) else {
        bail!(
            "A configuration file is required.\n\
             Usage: kslack-node /path/to/config.yaml < events.csv"
        );
    };

    info!(config_file = %config_file, "Loading configuration");

    // Load and validate configuration
    let config = Config::load(&config_file)?;
    let node = KSlackNode::new(config)?;

    // Create tokio runtime and run the node
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .wrap_err("Failed to create tokio runtime")?;

    runtime.block_on(node.run(BufReader::new(stdin()), stdout()))?;

    info!("kslack node stopped");
    Ok(())
}
