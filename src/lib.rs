//! CleanAir air quality service.
//!
//! The core is three pure components:
//! - [`breakpoints`] converts a pollutant concentration into an AQI sub-index,
//! - [`category`] maps an AQI value onto a health category,
//! - [`locate`] finds the nearest reference city by great-circle distance.
//!
//! Everything else (dataset loading, the live OpenAQ feed, the predictor
//! seam, the HTTP boundary, configuration and logging) calls into the core.

pub mod breakpoints;
pub mod category;
pub mod config;
pub mod dataset;
pub mod ingest;
pub mod locate;
pub mod logging;
pub mod model;
pub mod predict;
pub mod server;

pub use breakpoints::{overall_index, to_subindex};
pub use category::{band_progress, classify, Category};
pub use dataset::ReferencePointSet;
pub use locate::{haversine_km, nearest, LocateError, Nearest};
pub use model::{Coordinate, Pollutant, ReferencePoint, SubIndices};
