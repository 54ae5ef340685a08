//! Core library for the Open-Meteo weather tool server.
//!
//! This crate defines:
//! - Configuration handling
//! - Geocoding of free-text locations
//! - The Open-Meteo client with its response cache and retry policy
//! - Shaping of forecast responses into tool output
//!
//! It is used by `meteo-mcp`, but can also be reused by other binaries or services.

pub mod cache;
pub mod config;
pub mod error;
pub mod geocode;
pub mod http;
pub mod model;
pub mod provider;
pub mod retry;
pub mod service;
pub mod shape;

pub use config::{CacheConfig, Config, RetryConfig};
pub use error::{ErrorKind, GeocodeError, WeatherError};
pub use geocode::{Geocoder, NominatimGeocoder};
pub use model::{
    Coordinates, CurrentConditions, ForecastQuery, ForecastRecord, Variable, WeatherResponse,
};
pub use provider::WeatherProvider;
pub use service::WeatherService;
