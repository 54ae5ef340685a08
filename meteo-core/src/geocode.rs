//! Forward geocoding: free-text place names to coordinates.
//! Uses Nominatim (OpenStreetMap), which requires a descriptive User-Agent.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::{fmt::Debug, time::Duration};

use crate::{
    error::{GeocodeError, truncate_body},
    model::Coordinates,
};

#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    async fn geocode(&self, location: &str) -> Result<Coordinates, GeocodeError>;
}

#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    base_url: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: Option<String>,
}

impl NominatimGeocoder {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("Failed to build geocoding HTTP client")?;

        Ok(Self { base_url: base_url.to_string(), http })
    }

    async fn lookup(&self, location: &str) -> Result<Coordinates, GeocodeError> {
        let res = self
            .http
            .get(&self.base_url)
            .query(&[("q", location), ("format", "json"), ("limit", "1")])
            .send()
            .await
            .map_err(|e| GeocodeError::Lookup(format!("request failed: {e}")))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| GeocodeError::Lookup(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            return Err(GeocodeError::Lookup(format!(
                "geocoding service returned status {}: {}",
                status,
                truncate_body(&body)
            )));
        }

        let places: Vec<NominatimPlace> = serde_json::from_str(&body)
            .map_err(|e| GeocodeError::Lookup(format!("unexpected response: {e}")))?;

        let place = places.into_iter().next().ok_or(GeocodeError::NotFound)?;
        let coordinates = parse_place(&place)?;

        tracing::info!(
            "Geocoded '{}' to {}, {} ({})",
            location,
            coordinates.latitude,
            coordinates.longitude,
            place.display_name.as_deref().unwrap_or("unnamed")
        );
        Ok(coordinates)
    }
}

fn parse_place(place: &NominatimPlace) -> Result<Coordinates, GeocodeError> {
    let latitude = place
        .lat
        .trim()
        .parse::<f64>()
        .map_err(|e| GeocodeError::Lookup(format!("invalid latitude '{}': {e}", place.lat)))?;
    let longitude = place
        .lon
        .trim()
        .parse::<f64>()
        .map_err(|e| GeocodeError::Lookup(format!("invalid longitude '{}': {e}", place.lon)))?;

    Ok(Coordinates { latitude, longitude })
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, location: &str) -> Result<Coordinates, GeocodeError> {
        let query = location.trim();
        if query.is_empty() {
            return Err(GeocodeError::NotFound);
        }

        match self.lookup(query).await {
            Ok(coords) => Ok(coords),
            Err(GeocodeError::NotFound) => {
                tracing::info!("No geocoding match for '{}'", query);
                Err(GeocodeError::NotFound)
            }
            Err(e) => {
                tracing::warn!("Error geocoding '{}': {}", query, e);
                Err(e)
            }
        }
    }
}
