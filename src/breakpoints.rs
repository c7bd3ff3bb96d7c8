//! Breakpoint tables and sub-index interpolation.
//!
//! Defines the US EPA-style breakpoint table for every supported pollutant
//! and converts a single concentration into its AQI sub-index by
//! piecewise-linear interpolation. The table values are a compatibility
//! contract with the published breakpoints: they are not tuning parameters.
//!
//! Every table expects an already-normalized unit:
//!   - PM2.5 in µg/m³ (24h)
//!   - O3 in ppb (8h)
//!   - NO2 in ppb (1h)
//!   - CO in ppm (8h)

use crate::model::{Pollutant, SubIndices};

// ---------------------------------------------------------------------------
// Table types
// ---------------------------------------------------------------------------

/// A single linear segment of a breakpoint table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoint {
    pub concentration_low: f64,
    pub concentration_high: f64,
    pub index_low: u16,
    pub index_high: u16,
}

const fn bp(concentration_low: f64, concentration_high: f64, index_low: u16, index_high: u16) -> Breakpoint {
    Breakpoint {
        concentration_low,
        concentration_high,
        index_low,
        index_high,
    }
}

impl Breakpoint {
    /// Inclusive on both ends.
    pub fn contains(&self, concentration: f64) -> bool {
        self.concentration_low <= concentration && concentration <= self.concentration_high
    }

    /// Linear interpolation within this segment, before rounding.
    fn interpolate(&self, concentration: f64) -> f64 {
        let index_span = f64::from(self.index_high - self.index_low);
        let concentration_span = self.concentration_high - self.concentration_low;
        index_span / concentration_span * (concentration - self.concentration_low)
            + f64::from(self.index_low)
    }
}

// ---------------------------------------------------------------------------
// Published tables
// ---------------------------------------------------------------------------

/// PM2.5, µg/m³ (24h). Note the 0.1 gaps between bands.
pub static PM25_BREAKPOINTS: &[Breakpoint] = &[
    bp(0.0, 12.0, 0, 50),
    bp(12.1, 35.4, 51, 100),
    bp(35.5, 55.4, 101, 150),
    bp(55.5, 150.4, 151, 200),
    bp(150.5, 250.4, 201, 300),
    bp(250.5, 500.4, 301, 500),
];

/// Ozone, ppb (8h). The 8-hour table stops at 200 ppb / index 300; higher
/// concentrations are reported on the 1-hour scale, which is not carried here.
pub static O3_BREAKPOINTS: &[Breakpoint] = &[
    bp(0.0, 54.0, 0, 50),
    bp(55.0, 70.0, 51, 100),
    bp(71.0, 85.0, 101, 150),
    bp(86.0, 105.0, 151, 200),
    bp(106.0, 200.0, 201, 300),
];

/// Nitrogen dioxide, ppb (1h).
pub static NO2_BREAKPOINTS: &[Breakpoint] = &[
    bp(0.0, 53.0, 0, 50),
    bp(54.0, 100.0, 51, 100),
    bp(101.0, 360.0, 101, 150),
    bp(361.0, 649.0, 151, 200),
    bp(650.0, 1249.0, 201, 300),
    bp(1250.0, 2049.0, 301, 500),
];

/// Carbon monoxide, ppm (8h).
pub static CO_BREAKPOINTS: &[Breakpoint] = &[
    bp(0.0, 4.4, 0, 50),
    bp(4.5, 9.4, 51, 100),
    bp(9.5, 12.4, 101, 150),
    bp(12.5, 15.4, 151, 200),
    bp(15.5, 30.4, 201, 300),
    bp(30.5, 50.4, 301, 500),
];

/// Returns the breakpoint table for a pollutant.
pub fn table_for(kind: Pollutant) -> &'static [Breakpoint] {
    match kind {
        Pollutant::Pm25 => PM25_BREAKPOINTS,
        Pollutant::O3 => O3_BREAKPOINTS,
        Pollutant::No2 => NO2_BREAKPOINTS,
        Pollutant::Co => CO_BREAKPOINTS,
    }
}

// ---------------------------------------------------------------------------
// Interpolation
// ---------------------------------------------------------------------------

/// Converts a concentration (in the unit documented for `kind`) into an AQI
/// sub-index.
///
/// Returns `None` when:
///   - the concentration is missing or NaN,
///   - it falls in a gap between two bands,
///   - it is negative or above the table's highest breakpoint.
///
/// Bands are matched first-wins in ascending order, inclusive on both ends.
/// The interpolated value is rounded half-to-even, so a result of exactly
/// 50.5 becomes 50 and 51.5 becomes 52.
pub fn to_subindex(concentration: Option<f64>, kind: Pollutant) -> Option<u16> {
    let concentration = concentration.filter(|c| !c.is_nan())?;

    table_for(kind)
        .iter()
        .find(|band| band.contains(concentration))
        .map(|band| band.interpolate(concentration).round_ties_even() as u16)
}

impl SubIndices {
    /// Interpolates one concentration per pollutant into a sub-index bundle.
    pub fn from_concentrations(co: Option<f64>, o3: Option<f64>, no2: Option<f64>, pm25: Option<f64>) -> Self {
        SubIndices {
            co: to_subindex(co, Pollutant::Co),
            o3: to_subindex(o3, Pollutant::O3),
            no2: to_subindex(no2, Pollutant::No2),
            pm25: to_subindex(pm25, Pollutant::Pm25),
        }
    }
}

/// The overall AQI is the highest defined sub-index, or `None` if every
/// sub-index is undefined.
pub fn overall_index(sub_indices: &SubIndices) -> Option<u16> {
    sub_indices.iter().filter_map(|(_, value)| value).max()
}

/// The pollutant driving the overall index. Ties go to the first pollutant in
/// [`Pollutant::ALL`] order.
pub fn dominant_pollutant(sub_indices: &SubIndices) -> Option<Pollutant> {
    let overall = overall_index(sub_indices)?;
    sub_indices
        .iter()
        .find(|(_, value)| *value == Some(overall))
        .map(|(kind, _)| kind)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
