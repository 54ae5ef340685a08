use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::Deserialize;
use std::collections::HashMap;

use crate::{
    WeatherError,
    http::CachedHttp,
    model::{
        Block, CurrentValues, ForecastQuery, HourlySeries, LocationMeta, Variable, WeatherResponse,
    },
};

use super::WeatherProvider;

/// Interval assumed for an hourly block too short to infer one from.
const DEFAULT_INTERVAL_SECS: i64 = 3600;

#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    base_url: Url,
    transport: CachedHttp,
}

impl OpenMeteoProvider {
    pub fn new(base_url: &str, transport: CachedHttp) -> anyhow::Result<Self> {
        let base_url =
            Url::parse(base_url).map_err(|e| anyhow!("Invalid forecast URL '{base_url}': {e}"))?;
        Ok(Self { base_url, transport })
    }

    /// Full request URL; also the cache signature of the request.
    pub fn request_url(&self, query: &ForecastQuery) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("latitude", &query.coordinates.latitude.to_string())
            .append_pair("longitude", &query.coordinates.longitude.to_string())
            .append_pair(query.block.as_str(), &query.variable_list())
            .append_pair("timeformat", "unixtime");
        url
    }
}

#[derive(Debug, Deserialize)]
struct OmResponse {
    latitude: f64,
    longitude: f64,
    elevation: Option<f64>,
    #[serde(default)]
    timezone: String,
    timezone_abbreviation: Option<String>,
    #[serde(default)]
    utc_offset_seconds: i32,
    hourly: Option<OmHourly>,
    current: Option<OmCurrent>,
}

#[derive(Debug, Deserialize)]
struct OmHourly {
    time: Vec<i64>,
    #[serde(flatten)]
    values: HashMap<String, Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
struct OmCurrent {
    time: i64,
    interval: Option<i64>,
    #[serde(flatten)]
    values: HashMap<String, Option<f64>>,
}

fn unix_to_utc(ts: i64) -> Result<DateTime<Utc>, WeatherError> {
    DateTime::from_timestamp(ts, 0)
        .ok_or_else(|| WeatherError::ContractViolation(format!("timestamp {ts} out of range")))
}

fn step(from: i64, to: i64) -> Result<i64, WeatherError> {
    to.checked_sub(from).ok_or_else(|| {
        WeatherError::ContractViolation(format!("hourly step from {from} to {to} overflows"))
    })
}

fn hourly_series(
    mut raw: OmHourly,
    variables: &[Variable],
) -> Result<HourlySeries, WeatherError> {
    let interval_secs = match raw.time.as_slice() {
        [first, second, ..] => step(*first, *second)?,
        _ => DEFAULT_INTERVAL_SECS,
    };
    if interval_secs <= 0 {
        return Err(WeatherError::ContractViolation(format!(
            "hourly interval must be positive, got {interval_secs}s"
        )));
    }

    // Records are re-derived as start + n * interval.
    for (i, pair) in raw.time.windows(2).enumerate() {
        let delta = step(pair[0], pair[1])?;
        if delta != interval_secs {
            return Err(WeatherError::ContractViolation(format!(
                "hourly time axis is not uniform: step {} is {delta}s, expected {interval_secs}s",
                i + 1
            )));
        }
    }

    let (start, end) = match (raw.time.first(), raw.time.last()) {
        (Some(first), Some(last)) => {
            let end = last.checked_add(interval_secs).ok_or_else(|| {
                WeatherError::ContractViolation(format!("hourly time axis overflows after {last}"))
            })?;
            (unix_to_utc(*first)?, unix_to_utc(end)?)
        }
        _ => (DateTime::<Utc>::default(), DateTime::<Utc>::default()),
    };

    let values = variables
        .iter()
        .map(|variable| {
            raw.values.remove(variable.as_str()).map(|series| (*variable, series)).ok_or_else(|| {
                WeatherError::ContractViolation(format!(
                    "hourly variable '{variable}' missing from response"
                ))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(HourlySeries { start, end, interval: chrono::Duration::seconds(interval_secs), values })
}

fn current_values(raw: OmCurrent, variables: &[Variable]) -> Result<CurrentValues, WeatherError> {
    let values = variables
        .iter()
        .map(|variable| match raw.values.get(variable.as_str()) {
            Some(Some(value)) => Ok((*variable, *value)),
            Some(None) => Err(WeatherError::ContractViolation(format!(
                "current variable '{variable}' is null"
            ))),
            None => Err(WeatherError::ContractViolation(format!(
                "current variable '{variable}' missing from response"
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CurrentValues {
        time: unix_to_utc(raw.time)?,
        interval: chrono::Duration::seconds(raw.interval.unwrap_or(0)),
        values,
    })
}

fn parse_response(body: &str, query: &ForecastQuery) -> Result<WeatherResponse, WeatherError> {
    let parsed: OmResponse = serde_json::from_str(body)
        .map_err(|e| WeatherError::MalformedResponse(format!("invalid forecast JSON: {e}")))?;

    let location = LocationMeta {
        latitude: parsed.latitude,
        longitude: parsed.longitude,
        elevation: parsed.elevation,
        timezone: parsed.timezone,
        timezone_abbreviation: parsed.timezone_abbreviation,
        utc_offset_seconds: parsed.utc_offset_seconds,
    };

    let (hourly, current) = match query.block {
        Block::Hourly => {
            let raw = parsed.hourly.ok_or_else(|| {
                WeatherError::ContractViolation("response has no hourly block".to_string())
            })?;
            (Some(hourly_series(raw, &query.variables)?), None)
        }
        Block::Current => {
            let raw = parsed.current.ok_or_else(|| {
                WeatherError::ContractViolation("response has no current block".to_string())
            })?;
            (None, Some(current_values(raw, &query.variables)?))
        }
    };

    Ok(WeatherResponse { location, hourly, current })
}

fn log_location(location: &LocationMeta) {
    tracing::info!("Coordinates {}°N {}°E", location.latitude, location.longitude);
    if let Some(elevation) = location.elevation {
        tracing::info!("Elevation {} m asl", elevation);
    }
    tracing::info!(
        "Timezone {}{}",
        location.timezone,
        location.timezone_abbreviation.as_deref().unwrap_or("")
    );
    tracing::info!("Timezone difference to GMT+0 {} s", location.utc_offset_seconds);
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    async fn fetch(&self, query: &ForecastQuery) -> Result<WeatherResponse, WeatherError> {
        let url = self.request_url(query);
        tracing::debug!("Requesting {}", url);

        let body = self.transport.get(&url).await?;
        let response = parse_response(&body, query)?;

        log_location(&response.location);
        if let Some(current) = &response.current {
            tracing::info!(
                "Current conditions observed at {} over {} s",
                current.time,
                current.interval.num_seconds()
            );
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ErrorKind,
        model::{CURRENT_VARIABLES, Coordinates, FORECAST_VARIABLES},
        retry::RetryPolicy,
    };
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PARIS: Coordinates = Coordinates { latitude: 48.85, longitude: 2.35 };

    fn provider(server: &MockServer) -> OpenMeteoProvider {
        let transport = CachedHttp::new(reqwest::Client::new(), None, RetryPolicy::no_retry());
        OpenMeteoProvider::new(&format!("{}/v1/forecast", server.uri()), transport).unwrap()
    }

    fn hourly_body() -> serde_json::Value {
        json!({
            "latitude": 48.86,
            "longitude": 2.34,
            "elevation": 43.0,
            "timezone": "GMT",
            "timezone_abbreviation": "GMT",
            "utc_offset_seconds": 0,
            "hourly_units": { "time": "unixtime", "temperature_2m": "°C" },
            "hourly": {
                "time": [1_700_000_000, 1_700_003_600, 1_700_007_200],
                "precipitation": [0.0, 0.1, null],
                "temperature_2m": [10.0, 11.0, 12.0],
                "relative_humidity_2m": [80.0, 81.0, 82.0]
            }
        })
    }

    #[test]
    fn request_url_carries_coordinates_and_variables() {
        let transport = CachedHttp::new(reqwest::Client::new(), None, RetryPolicy::no_retry());
        let provider =
            OpenMeteoProvider::new("https://api.open-meteo.com/v1/forecast", transport).unwrap();

        let url = provider.request_url(&ForecastQuery::hourly(PARIS, &FORECAST_VARIABLES));
        let pairs: HashMap<String, String> = url.query_pairs().into_owned().collect();

        assert_eq!(pairs["latitude"], "48.85");
        assert_eq!(pairs["longitude"], "2.35");
        assert_eq!(pairs["hourly"], "temperature_2m,relative_humidity_2m,precipitation");
        assert_eq!(pairs["timeformat"], "unixtime");
        assert!(!pairs.contains_key("current"));
    }

    #[tokio::test]
    async fn hourly_values_are_addressed_by_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("hourly", "temperature_2m,relative_humidity_2m,precipitation"))
            .respond_with(ResponseTemplate::new(200).set_body_json(hourly_body()))
            .expect(1)
            .mount(&server)
            .await;

        let response = provider(&server)
            .fetch(&ForecastQuery::hourly(PARIS, &FORECAST_VARIABLES))
            .await
            .unwrap();

        assert_eq!(response.location.elevation, Some(43.0));
        let hourly = response.hourly.unwrap();
        assert_eq!(hourly.start.timestamp(), 1_700_000_000);
        assert_eq!(hourly.end.timestamp(), 1_700_010_800);
        assert_eq!(hourly.interval, chrono::Duration::hours(1));

        let names: Vec<Variable> = hourly.values.iter().map(|(v, _)| *v).collect();
        assert_eq!(names, FORECAST_VARIABLES.to_vec());
        assert_eq!(hourly.values[0].1, vec![Some(10.0), Some(11.0), Some(12.0)]);
        assert_eq!(hourly.values[2].1, vec![Some(0.0), Some(0.1), None]);
    }

    #[tokio::test]
    async fn missing_hourly_variable_is_a_contract_violation() {
        let server = MockServer::start().await;
        let mut body = hourly_body();
        body["hourly"].as_object_mut().unwrap().remove("precipitation");
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let err = provider(&server)
            .fetch(&ForecastQuery::hourly(PARIS, &FORECAST_VARIABLES))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ContractViolation);
        assert!(err.to_string().contains("precipitation"));
    }

    #[tokio::test]
    async fn current_values_ignore_response_key_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param(
                "current",
                "temperature_2m,relative_humidity_2m,apparent_temperature,precipitation,\
                 weather_code,wind_speed_10m,wind_direction_10m",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "latitude": 48.86,
                "longitude": 2.34,
                "timezone": "GMT",
                "utc_offset_seconds": 0,
                "current": {
                    "wind_direction_10m": 270.0,
                    "time": 1_700_000_000,
                    "weather_code": 3,
                    "interval": 900,
                    "temperature_2m": 12.5,
                    "precipitation": 0.0,
                    "wind_speed_10m": 14.2,
                    "apparent_temperature": 10.1,
                    "relative_humidity_2m": 77
                }
            })))
            .mount(&server)
            .await;

        let response = provider(&server)
            .fetch(&ForecastQuery::current(PARIS, &CURRENT_VARIABLES))
            .await
            .unwrap();

        let current = response.current.unwrap();
        assert_eq!(current.get(Variable::Temperature2m), Some(12.5));
        assert_eq!(current.get(Variable::RelativeHumidity2m), Some(77.0));
        assert_eq!(current.get(Variable::WeatherCode), Some(3.0));
        assert_eq!(current.get(Variable::WindDirection10m), Some(270.0));
        assert_eq!(current.interval, chrono::Duration::minutes(15));
    }

    #[tokio::test]
    async fn non_json_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = provider(&server)
            .fetch(&ForecastQuery::current(PARIS, &CURRENT_VARIABLES))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[tokio::test]
    async fn missing_block_is_a_contract_violation() {
        let server = MockServer::start().await;
        let mut body = hourly_body();
        body.as_object_mut().unwrap().remove("hourly");
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let err = provider(&server)
            .fetch(&ForecastQuery::hourly(PARIS, &FORECAST_VARIABLES))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ContractViolation);
    }

    #[test]
    fn single_timestamp_uses_default_interval() {
        let raw = OmHourly {
            time: vec![1_700_000_000],
            values: HashMap::from([("temperature_2m".to_string(), vec![Some(5.0)])]),
        };
        let series = hourly_series(raw, &[Variable::Temperature2m]).unwrap();
        assert_eq!(series.interval, chrono::Duration::hours(1));
        assert_eq!(series.end.timestamp() - series.start.timestamp(), 3600);
    }

    #[test]
    fn non_increasing_times_are_rejected() {
        let raw = OmHourly {
            time: vec![1_700_000_000, 1_700_000_000],
            values: HashMap::from([("temperature_2m".to_string(), vec![Some(5.0), Some(6.0)])]),
        };
        let err = hourly_series(raw, &[Variable::Temperature2m]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ContractViolation);
    }

    #[test]
    fn uneven_time_axis_is_rejected() {
        let raw = OmHourly {
            time: vec![1_700_000_000, 1_700_000_001, 1_710_000_000],
            values: HashMap::from([(
                "temperature_2m".to_string(),
                vec![Some(1.0), Some(2.0), Some(3.0)],
            )]),
        };
        let err = hourly_series(raw, &[Variable::Temperature2m]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ContractViolation);
        assert!(err.to_string().contains("not uniform"));
    }

    #[test]
    fn overflowing_time_axis_is_rejected() {
        let raw = OmHourly {
            time: vec![0, 1, i64::MAX],
            values: HashMap::from([(
                "temperature_2m".to_string(),
                vec![Some(1.0), Some(2.0), Some(3.0)],
            )]),
        };
        let err = hourly_series(raw, &[Variable::Temperature2m]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ContractViolation);
    }

    #[test]
    fn overflowing_end_is_rejected() {
        let raw = OmHourly {
            time: vec![i64::MAX - 1, i64::MAX],
            values: HashMap::from([("temperature_2m".to_string(), vec![Some(1.0), Some(2.0)])]),
        };
        let err = hourly_series(raw, &[Variable::Temperature2m]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ContractViolation);
    }
}
