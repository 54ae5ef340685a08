//! Binary crate for the `openmeteo-weather-mcp` tool server.
//!
//! This crate focuses on:
//! - Parsing CLI arguments and loading configuration
//! - Speaking MCP (JSON-RPC 2.0, one JSON message per line) on stdin/stdout
//! - Encoding tool results and errors for the agent host

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod protocol;
mod server;
mod tools;
mod transport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries protocol frames only.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cmd = cli::Cli::parse();
    cmd.run().await
}
