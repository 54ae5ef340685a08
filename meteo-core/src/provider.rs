use crate::{
    Config, WeatherError,
    cache::ResponseCache,
    http::CachedHttp,
    model::{ForecastQuery, WeatherResponse},
    provider::openmeteo::OpenMeteoProvider,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openmeteo;

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch(&self, query: &ForecastQuery) -> Result<WeatherResponse, WeatherError>;
}

/// Construct the Open-Meteo provider from config: HTTP client, cache and retry policy.
pub fn provider_from_config(config: &Config) -> anyhow::Result<OpenMeteoProvider> {
    let http = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))?;

    let cache = if config.cache.enabled {
        let cache = ResponseCache::new(config.cache_dir()?, config.cache_ttl());
        tracing::debug!("Caching forecast responses in {}", cache.dir().display());
        Some(cache)
    } else {
        None
    };

    let transport = CachedHttp::new(http, cache, config.retry_policy());
    OpenMeteoProvider::new(&config.forecast_url, transport)
}
