use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer, ser::SerializeMap};

/// A resolved point on the globe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Weather variables understood by the Open-Meteo forecast endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variable {
    #[serde(rename = "temperature_2m")]
    Temperature2m,
    #[serde(rename = "relative_humidity_2m")]
    RelativeHumidity2m,
    ApparentTemperature,
    Precipitation,
    WeatherCode,
    #[serde(rename = "wind_speed_10m")]
    WindSpeed10m,
    #[serde(rename = "wind_direction_10m")]
    WindDirection10m,
}

impl Variable {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variable::Temperature2m => "temperature_2m",
            Variable::RelativeHumidity2m => "relative_humidity_2m",
            Variable::ApparentTemperature => "apparent_temperature",
            Variable::Precipitation => "precipitation",
            Variable::WeatherCode => "weather_code",
            Variable::WindSpeed10m => "wind_speed_10m",
            Variable::WindDirection10m => "wind_direction_10m",
        }
    }
}

impl std::fmt::Display for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hourly variables requested by the 7-day forecast; output records keep this order.
pub const FORECAST_VARIABLES: [Variable; 3] = [
    Variable::Temperature2m,
    Variable::RelativeHumidity2m,
    Variable::Precipitation,
];

/// Variables requested for current conditions, in output order.
pub const CURRENT_VARIABLES: [Variable; 7] = [
    Variable::Temperature2m,
    Variable::RelativeHumidity2m,
    Variable::ApparentTemperature,
    Variable::Precipitation,
    Variable::WeatherCode,
    Variable::WindSpeed10m,
    Variable::WindDirection10m,
];

/// Which block of the forecast endpoint a query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    Hourly,
    Current,
}

impl Block {
    pub fn as_str(&self) -> &'static str {
        match self {
            Block::Hourly => "hourly",
            Block::Current => "current",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastQuery {
    pub coordinates: Coordinates,
    pub block: Block,
    pub variables: Vec<Variable>,
}

impl ForecastQuery {
    pub fn hourly(coordinates: Coordinates, variables: &[Variable]) -> Self {
        Self { coordinates, block: Block::Hourly, variables: variables.to_vec() }
    }

    pub fn current(coordinates: Coordinates, variables: &[Variable]) -> Self {
        Self { coordinates, block: Block::Current, variables: variables.to_vec() }
    }

    /// Comma-joined variable names, as the API expects them.
    pub fn variable_list(&self) -> String {
        self.variables.iter().map(Variable::as_str).collect::<Vec<_>>().join(",")
    }
}

/// Location metadata echoed back by the forecast endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationMeta {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: Option<f64>,
    pub timezone: String,
    pub timezone_abbreviation: Option<String>,
    pub utc_offset_seconds: i32,
}

/// Hourly time series covering the half-open range `[start, end)`.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlySeries {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub interval: chrono::Duration,
    pub values: Vec<(Variable, Vec<Option<f64>>)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrentValues {
    pub time: DateTime<Utc>,
    pub interval: chrono::Duration,
    pub values: Vec<(Variable, f64)>,
}

impl CurrentValues {
    pub fn get(&self, variable: Variable) -> Option<f64> {
        self.values.iter().find(|(v, _)| *v == variable).map(|(_, value)| *value)
    }
}

/// Normalized forecast response with variables addressed by name.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherResponse {
    pub location: LocationMeta,
    pub hourly: Option<HourlySeries>,
    pub current: Option<CurrentValues>,
}

/// One row of the hourly forecast.
///
/// Serializes as a flat object: `date` first, then each variable in request order.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRecord {
    pub date: DateTime<Utc>,
    pub values: Vec<(Variable, Option<f64>)>,
}

impl ForecastRecord {
    pub fn get(&self, variable: Variable) -> Option<f64> {
        self.values.iter().find(|(v, _)| *v == variable).and_then(|(_, value)| *value)
    }
}

impl Serialize for ForecastRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        map.serialize_entry("date", &self.date)?;
        for (variable, value) in &self.values {
            map.serialize_entry(variable.as_str(), value)?;
        }
        map.end()
    }
}

/// Current conditions at a location. Field order is part of the output contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature_2m: f64,
    pub relative_humidity_2m: f64,
    pub apparent_temperature: f64,
    pub precipitation: f64,
    pub weather_code: f64,
    pub wind_speed_10m: f64,
    pub wind_direction_10m: f64,
}
