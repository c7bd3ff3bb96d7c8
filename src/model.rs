//! Core data types for the CleanAir air quality service.
//!
//! This module defines the shared domain model imported by all other modules:
//! pollutant kinds, coordinates, per-pollutant sub-index bundles and the
//! reference point records used for nearest-station lookup.
//! It contains no I/O.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::category::Category;

// ---------------------------------------------------------------------------
// Pollutant kinds
// ---------------------------------------------------------------------------

/// A pollutant with a published breakpoint table.
///
/// Each kind expects its concentration in a specific unit (see [`Pollutant::unit`]).
/// The unit is a convention, not something the type system enforces: callers
/// must normalize before interpolating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pollutant {
    /// Fine particulate matter, PM2.5.
    Pm25,
    /// Ozone.
    O3,
    /// Nitrogen dioxide.
    No2,
    /// Carbon monoxide.
    Co,
}

impl Pollutant {
    /// All supported kinds, in the order the dataset lists their columns.
    pub const ALL: [Pollutant; 4] = [Pollutant::Co, Pollutant::O3, Pollutant::No2, Pollutant::Pm25];

    /// Short parameter code, as used by OpenAQ and the HTTP API.
    pub fn code(&self) -> &'static str {
        match self {
            Pollutant::Pm25 => "pm25",
            Pollutant::O3 => "o3",
            Pollutant::No2 => "no2",
            Pollutant::Co => "co",
        }
    }

    /// Unit the breakpoint table for this kind is expressed in.
    pub fn unit(&self) -> &'static str {
        match self {
            Pollutant::Pm25 => "µg/m³",
            Pollutant::O3 => "ppb",
            Pollutant::No2 => "ppb",
            Pollutant::Co => "ppm",
        }
    }

    /// Averaging window the breakpoints assume.
    pub fn averaging_window(&self) -> &'static str {
        match self {
            Pollutant::Pm25 => "24h",
            Pollutant::O3 => "8h",
            Pollutant::No2 => "1h",
            Pollutant::Co => "8h",
        }
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown pollutant '{0}' (expected one of pm25, o3, no2, co)")]
pub struct UnknownPollutant(pub String);

impl FromStr for Pollutant {
    type Err = UnknownPollutant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pm25" | "pm2.5" | "pm2_5" => Ok(Pollutant::Pm25),
            "o3" | "ozone" => Ok(Pollutant::O3),
            "no2" => Ok(Pollutant::No2),
            "co" => Ok(Pollutant::Co),
            _ => Err(UnknownPollutant(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Sub-index bundle
// ---------------------------------------------------------------------------

/// One optional AQI sub-index per supported pollutant.
///
/// `None` means the value was missing or out of the table's supported range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubIndices {
    pub co: Option<u16>,
    pub o3: Option<u16>,
    pub no2: Option<u16>,
    pub pm25: Option<u16>,
}

impl SubIndices {
    pub fn get(&self, kind: Pollutant) -> Option<u16> {
        match kind {
            Pollutant::Pm25 => self.pm25,
            Pollutant::O3 => self.o3,
            Pollutant::No2 => self.no2,
            Pollutant::Co => self.co,
        }
    }

    pub fn set(&mut self, kind: Pollutant, value: Option<u16>) {
        match kind {
            Pollutant::Pm25 => self.pm25 = value,
            Pollutant::O3 => self.o3 = value,
            Pollutant::No2 => self.no2 = value,
            Pollutant::Co => self.co = value,
        }
    }

    /// Iterates `(kind, sub-index)` pairs in [`Pollutant::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Pollutant, Option<u16>)> + '_ {
        Pollutant::ALL.iter().map(move |&kind| (kind, self.get(kind)))
    }
}

// ---------------------------------------------------------------------------
// Coordinates and reference points
// ---------------------------------------------------------------------------

/// WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// True when both components are finite and inside
    /// latitude [-90, 90] / longitude [-180, 180].
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// A city-level observation from the reference dataset.
///
/// Every point in a loaded `ReferencePointSet` has a valid coordinate; rows
/// without one never become a `ReferencePoint`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferencePoint {
    pub city: String,
    pub country: String,
    pub location: Coordinate,
    /// Observed overall AQI value; `None` when the dataset cell is blank or
    /// not numeric. The point is still locatable.
    pub aqi_value: Option<u16>,
    /// Category label exactly as recorded in the dataset.
    pub category_label: String,
    /// `category_label` parsed; unrecognized labels are `Unknown`.
    pub category: Category,
    /// Per-pollutant AQI values reported alongside the overall value.
    pub sub_indices: SubIndices,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
