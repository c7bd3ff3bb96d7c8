//! Live data sources.
//!
//! Submodules:
//! - `openaq`: recent pollutant measurements near a coordinate.

pub mod openaq;
