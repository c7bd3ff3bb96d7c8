//! OpenAQ Measurements API Client
//!
//! Retrieves recent pollutant measurements near a coordinate from the
//! OpenAQ v2 measurements endpoint, and reduces them into AQI sub-indices.
//!
//! The fetch never fails outward: it widens the search radius when a
//! request fails or finds nothing, and returns an empty result once every
//! radius is exhausted. Each failure is logged with its classification.
//!
//! API documentation: <https://docs.openaq.org/>

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::breakpoints::to_subindex;
use crate::config::OpenAqConfig;
use crate::logging::{self, DataSource};
use crate::model::{Coordinate, Pollutant, SubIndices};

const PARAMETERS: &str = "pm25,o3,no2,co";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP error: {0}")]
    Status(u16),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("No results within {radius_m} m")]
    NoResults { radius_m: u32 },
}

// ============================================================================
// OpenAQ API Response Structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct MeasurementsResponse {
    #[serde(default)]
    results: Vec<MeasurementRecord>,
}

#[derive(Debug, Deserialize)]
struct MeasurementRecord {
    parameter: Option<String>,
    value: Option<f64>,
    unit: Option<String>,
    date: Option<MeasurementDate>,
    location: Option<String>,
    coordinates: Option<MeasurementCoordinates>,
}

#[derive(Debug, Deserialize)]
struct MeasurementDate {
    utc: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MeasurementCoordinates {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

/// One flattened measurement. Every field is optional because the feed
/// omits them freely.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveMeasurement {
    pub parameter: Option<String>,
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub date_utc: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl From<MeasurementRecord> for LiveMeasurement {
    fn from(record: MeasurementRecord) -> Self {
        let (latitude, longitude) = record
            .coordinates
            .map(|c| (c.latitude, c.longitude))
            .unwrap_or((None, None));
        LiveMeasurement {
            parameter: record.parameter,
            value: record.value,
            unit: record.unit,
            date_utc: record.date.and_then(|d| d.utc),
            location: record.location,
            latitude,
            longitude,
        }
    }
}

impl LiveMeasurement {
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        let raw = self.date_utc.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Measurements returned by a fetch, and the radius that produced them.
/// An empty fetch has no radius.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveFetch {
    pub measurements: Vec<LiveMeasurement>,
    pub radius_used_m: Option<u32>,
}

/// Parses a measurements response body.
pub fn parse_measurements(body: &str) -> Result<Vec<LiveMeasurement>, FeedError> {
    let response: MeasurementsResponse = serde_json::from_str(body)?;
    Ok(response.results.into_iter().map(LiveMeasurement::from).collect())
}

// ============================================================================
// API Client
// ============================================================================

pub struct OpenAqClient {
    http: reqwest::blocking::Client,
    config: OpenAqConfig,
}

impl OpenAqClient {
    pub fn new(config: OpenAqConfig) -> Result<Self, FeedError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { http, config })
    }

    /// Query string for one attempt, newest measurements first.
    pub fn query_params(&self, at: Coordinate, radius_m: u32) -> Vec<(&'static str, String)> {
        vec![
            ("coordinates", format!("{},{}", at.latitude, at.longitude)),
            ("limit", self.config.limit.to_string()),
            ("order_by", "datetime".to_string()),
            ("sort", "desc".to_string()),
            ("parameters", PARAMETERS.to_string()),
            ("radius", radius_m.to_string()),
        ]
    }

    fn fetch_once(&self, at: Coordinate, radius_m: u32) -> Result<Vec<LiveMeasurement>, FeedError> {
        let mut request = self
            .http
            .get(&self.config.base_url)
            .header("Accept", "application/json")
            .query(&self.query_params(at, radius_m));
        if let Some(key) = &self.config.api_key {
            request = request.header("X-API-Key", key);
        }

        let response = request.send()?;
        if !response.status().is_success() {
            return Err(FeedError::Status(response.status().as_u16()));
        }

        let body = response.text()?;
        parse_measurements(&body)
    }

    /// Fetches recent measurements near `at`, widening the radius on
    /// failure or an empty answer.
    ///
    /// Never returns an error. A transport or HTTP failure moves on to the
    /// next radius; a body that does not parse ends the search with an
    /// empty result, since a wider radius will not fix it.
    pub fn fetch_nearby(&self, at: Coordinate) -> LiveFetch {
        let subject = at.to_string();

        for radius_m in self.config.radii() {
            match self.fetch_once(at, radius_m) {
                Ok(measurements) if measurements.is_empty() => {
                    logging::log_feed_failure(
                        &subject,
                        "measurements fetch",
                        &FeedError::NoResults { radius_m },
                    );
                }
                Ok(measurements) => {
                    logging::info(
                        DataSource::OpenAq,
                        Some(&subject),
                        &format!("{} measurements within {} m", measurements.len(), radius_m),
                    );
                    return LiveFetch {
                        measurements,
                        radius_used_m: Some(radius_m),
                    };
                }
                Err(e @ FeedError::Parse(_)) => {
                    logging::log_feed_failure(&subject, "measurements parse", &e);
                    return LiveFetch::default();
                }
                Err(e) => {
                    logging::log_feed_failure(&subject, &format!("measurements fetch ({} m)", radius_m), &e);
                }
            }
        }

        logging::warn(
            DataSource::OpenAq,
            Some(&subject),
            "all search radii exhausted, returning no measurements",
        );
        LiveFetch::default()
    }
}

// ============================================================================
// Unit Normalization
// ============================================================================

/// Converts a measurement into its pollutant and a concentration in the unit
/// the breakpoint tables expect.
///
/// Returns `None` for unsupported parameters, unknown or incompatible
/// units (e.g. O3 reported in µg/m³, which needs temperature and pressure to
/// convert), and negative sentinel values.
pub fn normalize(measurement: &LiveMeasurement) -> Option<(Pollutant, f64)> {
    let kind: Pollutant = measurement.parameter.as_deref()?.parse().ok()?;
    let value = measurement.value.filter(|v| v.is_finite() && *v >= 0.0)?;
    let unit = measurement.unit.as_deref()?.trim().to_lowercase();

    let is_mass = matches!(unit.as_str(), "µg/m³" | "µg/m3" | "ug/m3" | "ug/m³" | "μg/m³");
    let converted = match (kind, unit.as_str()) {
        (Pollutant::Pm25, _) if is_mass => value,
        (Pollutant::O3 | Pollutant::No2, "ppb") => value,
        (Pollutant::O3 | Pollutant::No2, "ppm") => value * 1000.0,
        (Pollutant::Co, "ppm") => value,
        (Pollutant::Co, "ppb") => value / 1000.0,
        _ => return None,
    };
    Some((kind, converted))
}

/// Reduces measurements to one sub-index per pollutant, using the newest
/// normalizable measurement of each. Undated measurements rank below dated
/// ones; among equals the earliest in the list wins.
pub fn latest_subindices(measurements: &[LiveMeasurement]) -> SubIndices {
    let mut newest: [Option<(Option<DateTime<Utc>>, f64)>; 4] = [None; 4];

    for m in measurements {
        let Some((kind, value)) = normalize(m) else {
            continue;
        };
        let slot = &mut newest[slot_of(kind)];
        let ts = m.timestamp();
        let replace = match slot {
            None => true,
            Some((current_ts, _)) => ts > *current_ts,
        };
        if replace {
            *slot = Some((ts, value));
        }
    }

    let mut subs = SubIndices::default();
    for kind in Pollutant::ALL {
        let concentration = newest[slot_of(kind)].map(|(_, v)| v);
        subs.set(kind, to_subindex(concentration, kind));
    }
    subs
}

fn slot_of(kind: Pollutant) -> usize {
    match kind {
        Pollutant::Co => 0,
        Pollutant::O3 => 1,
        Pollutant::No2 => 2,
        Pollutant::Pm25 => 3,
    }
}

// ============================================================================
// Tests
// ============================================================================
