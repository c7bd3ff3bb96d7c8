//! Nearest reference point lookup.
//!
//! Great-circle (haversine) distance on a spherical Earth, and a linear scan
//! over the reference set that returns the closest point. The set is small
//! (hundreds of cities) and static, so there is no spatial index. Ties go to
//! the first point in the set's insertion order; any future index must keep
//! that rule.

use serde::Serialize;
use thiserror::Error;

use crate::dataset::ReferencePointSet;
use crate::model::{Coordinate, ReferencePoint};

/// Mean Earth radius, km.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Why a lookup produced no point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LocateError {
    /// The reference set holds no points.
    #[error("reference point set is empty")]
    EmptyReferenceSet,
    /// The query coordinate is not a finite latitude/longitude pair.
    #[error("query coordinate is not a finite latitude/longitude")]
    InvalidCoordinate,
}

/// The closest reference point to a query, and how far away it is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Nearest<'a> {
    pub point: &'a ReferencePoint,
    pub distance_km: f64,
}

/// Great-circle distance between two coordinates, in kilometres.
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    Origin::new(a).distance_km(b)
}

/// A query coordinate with its trigonometry precomputed, so a pass over the
/// whole set evaluates `cos(φ1)` once instead of once per point.
#[derive(Debug, Clone, Copy)]
struct Origin {
    latitude_deg: f64,
    longitude_deg: f64,
    cos_phi: f64,
}

impl Origin {
    fn new(at: Coordinate) -> Self {
        Self {
            latitude_deg: at.latitude,
            longitude_deg: at.longitude,
            cos_phi: at.latitude.to_radians().cos(),
        }
    }

    fn distance_km(&self, to: Coordinate) -> f64 {
        let phi2 = to.latitude.to_radians();
        let d_phi = (to.latitude - self.latitude_deg).to_radians();
        let d_lambda = (to.longitude - self.longitude_deg).to_radians();

        let a = (d_phi / 2.0).sin().powi(2)
            + self.cos_phi * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
        // Rounding can push `a` a hair past 1 for antipodal points.
        2.0 * EARTH_RADIUS_KM * a.min(1.0).sqrt().asin()
    }
}

/// Distance from `query` to every point in `points`, in set order.
fn distances_km<'a>(query: Coordinate, points: &'a [ReferencePoint]) -> impl Iterator<Item = f64> + 'a {
    let origin = Origin::new(query);
    points.iter().map(move |p| origin.distance_km(p.location))
}

/// Finds the reference point closest to `query`.
///
/// Scans the full set; the first point achieving the minimum distance wins.
pub fn nearest(query: Coordinate, points: &ReferencePointSet) -> Result<Nearest<'_>, LocateError> {
    nearest_in(query, points.as_slice())
}

/// Slice form of [`nearest`].
pub fn nearest_in(query: Coordinate, points: &[ReferencePoint]) -> Result<Nearest<'_>, LocateError> {
    if !query.latitude.is_finite() || !query.longitude.is_finite() {
        return Err(LocateError::InvalidCoordinate);
    }

    let mut best: Option<(usize, f64)> = None;
    for (i, d) in distances_km(query, points).enumerate() {
        // Strict `<` keeps the earliest point on ties.
        if best.is_none_or(|(_, best_d)| d < best_d) {
            best = Some((i, d));
        }
    }

    best.map(|(i, distance_km)| Nearest {
        point: &points[i],
        distance_km,
    })
    .ok_or(LocateError::EmptyReferenceSet)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
