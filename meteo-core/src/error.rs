use serde::Serialize;

/// Why a place name could not be turned into coordinates.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeocodeError {
    #[error("no match")]
    NotFound,
    #[error("{0}")]
    Lookup(String),
}

/// Failures of a weather lookup, classified so callers can decide whether to retry.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Location '{location}' could not be found")]
    LocationNotFound { location: String },

    #[error("Geocoding '{location}' failed: {reason}")]
    Geocoding { location: String, reason: String },

    #[error("Network error talking to the forecast API: {0}")]
    Network(String),

    #[error("Forecast API returned status {status}: {body}")]
    Service { status: u16, body: String },

    #[error("Malformed forecast response: {0}")]
    MalformedResponse(String),

    #[error("Forecast response violates the expected shape: {0}")]
    ContractViolation(String),
}

/// Stable machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    LocationNotFound,
    GeocodingFailed,
    Network,
    Service,
    MalformedResponse,
    ContractViolation,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::LocationNotFound => "location_not_found",
            ErrorKind::GeocodingFailed => "geocoding_failed",
            ErrorKind::Network => "network",
            ErrorKind::Service => "service",
            ErrorKind::MalformedResponse => "malformed_response",
            ErrorKind::ContractViolation => "contract_violation",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl WeatherError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WeatherError::LocationNotFound { .. } => ErrorKind::LocationNotFound,
            WeatherError::Geocoding { .. } => ErrorKind::GeocodingFailed,
            WeatherError::Network(_) => ErrorKind::Network,
            WeatherError::Service { .. } => ErrorKind::Service,
            WeatherError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            WeatherError::ContractViolation(_) => ErrorKind::ContractViolation,
        }
    }

    /// Attach the queried location to a geocoder failure.
    pub fn from_geocode(location: &str, err: GeocodeError) -> Self {
        match err {
            GeocodeError::NotFound => {
                WeatherError::LocationNotFound { location: location.to_string() }
            }
            GeocodeError::Lookup(reason) => {
                WeatherError::Geocoding { location: location.to_string(), reason }
            }
        }
    }
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut cut = MAX;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}
