use std::path::PathBuf;

use clap::Parser;
use tokio::io::BufReader;

use meteo_core::{Config, WeatherService};

use crate::server::McpServer;

/// Top-level CLI struct. Every flag is optional; with none the server runs on defaults.
#[derive(Debug, Parser)]
#[command(
    name = "openmeteo-weather-mcp",
    version,
    about = "MCP server exposing Open-Meteo weather lookups over stdio"
)]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory for cached forecast responses.
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Disable the forecast response cache.
    #[arg(long)]
    pub no_cache: bool,
}

impl Cli {
    /// Load the config file and apply flag overrides on top of it.
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };

        if let Some(dir) = &self.cache_dir {
            config.cache.dir = Some(dir.clone());
        }
        if self.no_cache {
            config.cache.enabled = false;
        }

        Ok(config)
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let config = self.load_config()?;
        let service = WeatherService::from_config(&config)?;

        tracing::info!("Serving weather tools on stdio");
        let mut server =
            McpServer::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout(), service);
        server.run().await?;

        Ok(())
    }
}
