use std::sync::Arc;

use crate::{
    Config, WeatherError,
    geocode::{Geocoder, NominatimGeocoder},
    model::{
        CURRENT_VARIABLES, Coordinates, CurrentConditions, FORECAST_VARIABLES, ForecastQuery,
        ForecastRecord,
    },
    provider::{WeatherProvider, provider_from_config},
    shape,
};

/// The two weather lookups: geocode, fetch, shape.
#[derive(Debug, Clone)]
pub struct WeatherService {
    geocoder: Arc<dyn Geocoder>,
    provider: Arc<dyn WeatherProvider>,
}

impl WeatherService {
    pub fn new(geocoder: Arc<dyn Geocoder>, provider: Arc<dyn WeatherProvider>) -> Self {
        Self { geocoder, provider }
    }

    /// Nominatim geocoder and Open-Meteo provider configured from `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let geocoder = NominatimGeocoder::new(
            &config.geocoding_url,
            &config.user_agent,
            config.request_timeout(),
        )?;
        let provider = provider_from_config(config)?;

        Ok(Self::new(Arc::new(geocoder), Arc::new(provider)))
    }

    async fn resolve(&self, location: &str) -> Result<Coordinates, WeatherError> {
        self.geocoder
            .geocode(location)
            .await
            .map_err(|e| WeatherError::from_geocode(location, e))
    }

    /// Hourly forecast for the next seven days.
    pub async fn get_7day_weather(
        &self,
        location: &str,
    ) -> Result<Vec<ForecastRecord>, WeatherError> {
        let coordinates = self.resolve(location).await?;

        let query = ForecastQuery::hourly(coordinates, &FORECAST_VARIABLES);
        let response = self.provider.fetch(&query).await?;

        let hourly = response.hourly.ok_or_else(|| {
            WeatherError::ContractViolation("response has no hourly block".to_string())
        })?;

        let records = shape::hourly_records(&hourly);
        tracing::debug!("Shaped {} hourly records for '{}'", records.len(), location);
        Ok(records)
    }

    pub async fn get_current_weather(
        &self,
        location: &str,
    ) -> Result<CurrentConditions, WeatherError> {
        let coordinates = self.resolve(location).await?;

        let query = ForecastQuery::current(coordinates, &CURRENT_VARIABLES);
        let response = self.provider.fetch(&query).await?;

        let current = response.current.ok_or_else(|| {
            WeatherError::ContractViolation("response has no current block".to_string())
        })?;

        shape::current_conditions(&current)
    }
}
