//! Category predictor seam.
//!
//! The surrounding application can plug in an externally trained classifier
//! that predicts a category label straight from six raw features. It is an
//! opaque collaborator: nothing here trains or evaluates a model. Its answer
//! is independent of the breakpoint pipeline and may disagree with it.
//!
//! `SubIndexPredictor` is the built-in, deterministic stand-in used when no
//! model is wired up.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::category::Category;

/// Model input. The pollutant fields are AQI sub-indices, not
/// concentrations; `lat`/`lng` locate the reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub co: f64,
    pub o3: f64,
    pub no2: f64,
    pub pm25: f64,
    pub lat: f64,
    pub lng: f64,
}

impl FeatureVector {
    /// Feature names in model column order.
    pub const COLUMNS: [&'static str; 6] = ["co", "o3", "no2", "pm25", "lat", "lng"];

    /// Features in model column order.
    pub fn as_array(&self) -> [f64; 6] {
        [self.co, self.o3, self.no2, self.pm25, self.lat, self.lng]
    }

    /// Rejects non-finite features.
    pub fn validate(&self) -> Result<(), PredictError> {
        for (name, value) in Self::COLUMNS.into_iter().zip(self.as_array()) {
            if !value.is_finite() {
                return Err(PredictError::InvalidFeature { name, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictError {
    #[error("feature '{name}' is not a finite number ({value})")]
    InvalidFeature { name: &'static str, value: f64 },
}

/// Anything that maps a feature vector to a category label.
pub trait CategoryPredictor: Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> &str;

    fn predict(&self, features: &FeatureVector) -> Result<String, PredictError>;
}

/// Labels the worst of the four sub-indices. Coordinates are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubIndexPredictor;

impl CategoryPredictor for SubIndexPredictor {
    fn name(&self) -> &str {
        "max-subindex"
    }

    fn predict(&self, features: &FeatureVector) -> Result<String, PredictError> {
        features.validate()?;
        let worst = [features.co, features.o3, features.no2, features.pm25]
            .into_iter()
            .fold(f64::NEG_INFINITY, f64::max);
        Ok(Category::from_value(worst).label().to_string())
    }
}
