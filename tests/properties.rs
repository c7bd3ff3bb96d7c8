/// Property tests for the AQI core
///
/// Covers the algebraic guarantees of the interpolator, classifier and
/// locator over generated inputs rather than hand-picked cases.
///
/// Run with: cargo test --test properties

use cleanair_service::breakpoints::{table_for, to_subindex};
use cleanair_service::category::{classify, Category};
use cleanair_service::dataset::ReferencePointSet;
use cleanair_service::locate::{haversine_km, nearest, EARTH_RADIUS_KM};
use cleanair_service::model::{Coordinate, Pollutant, ReferencePoint, SubIndices};

use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn pollutant() -> impl Strategy<Value = Pollutant> {
    prop::sample::select(Pollutant::ALL.to_vec())
}

fn coordinate() -> impl Strategy<Value = Coordinate> {
    (-90.0f64..=90.0, -180.0f64..=180.0).prop_map(|(lat, lng)| Coordinate::new(lat, lng))
}

fn point(i: usize, at: Coordinate) -> ReferencePoint {
    ReferencePoint {
        city: format!("City {}", i),
        country: "Testland".to_string(),
        location: at,
        aqi_value: Some(42),
        category_label: "Good".to_string(),
        category: Category::Good,
        sub_indices: SubIndices::default(),
    }
}

fn point_set(coords: &[Coordinate]) -> ReferencePointSet {
    ReferencePointSet::new(coords.iter().enumerate().map(|(i, c)| point(i, *c)).collect())
}

// ---------------------------------------------------------------------------
// Interpolator
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn test_subindex_is_monotonic_within_a_band(
        kind in pollutant(),
        band_pick in any::<prop::sample::Index>(),
        a in 0.0f64..=1.0,
        b in 0.0f64..=1.0,
    ) {
        let table = table_for(kind);
        let band = table[band_pick.index(table.len())];
        let span = band.concentration_high - band.concentration_low;
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let c1 = (band.concentration_low + lo * span).min(band.concentration_high);
        let c2 = (band.concentration_low + hi * span).min(band.concentration_high);

        let s1 = to_subindex(Some(c1), kind).unwrap();
        let s2 = to_subindex(Some(c2), kind).unwrap();
        prop_assert!(s1 <= s2, "{} {} -> {} but {} -> {}", kind, c1, s1, c2, s2);
        prop_assert!(s1 >= band.index_low && s2 <= band.index_high);
    }

    #[test]
    fn test_subindex_never_exceeds_table_maximum(kind in pollutant(), c in -1000.0f64..5000.0) {
        let max = table_for(kind).last().unwrap().index_high;
        if let Some(index) = to_subindex(Some(c), kind) {
            prop_assert!(index <= max);
        }
    }

    #[test]
    fn test_negative_concentrations_are_undefined(kind in pollutant(), c in -1.0e6f64..-1.0e-9) {
        prop_assert_eq!(to_subindex(Some(c), kind), None);
    }
}

#[test]
fn test_missing_concentration_is_undefined_for_every_pollutant() {
    for kind in Pollutant::ALL {
        assert_eq!(to_subindex(None, kind), None);
        assert_eq!(to_subindex(Some(f64::NAN), kind), None);
    }
    assert_eq!(classify(None), Category::Unknown);
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

#[test]
fn test_category_ranges_partition_the_scale() {
    for v in 0u16..=500 {
        let owners: Vec<Category> = Category::ALL
            .into_iter()
            .filter(|c| c.range().is_some_and(|(lo, hi)| lo <= v && v <= hi))
            .collect();
        assert_eq!(owners.len(), 1, "{} owned by {:?}", v, owners);
        assert_eq!(classify(Some(v)), owners[0]);
    }
}

proptest! {
    #[test]
    fn test_classify_is_monotonic(a in 0u16..=1000, b in 0u16..=1000) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(classify(Some(lo)) <= classify(Some(hi)));
    }

    #[test]
    fn test_integer_and_real_classification_agree(v in 0u16..=1000) {
        prop_assert_eq!(classify(Some(v)), Category::from_value(f64::from(v)));
    }
}

// ---------------------------------------------------------------------------
// Locator
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn test_haversine_is_symmetric(a in coordinate(), b in coordinate()) {
        let ab = haversine_km(a, b);
        let ba = haversine_km(b, a);
        prop_assert!((ab - ba).abs() < 1e-6, "{} vs {}", ab, ba);
    }

    #[test]
    fn test_haversine_self_distance_is_zero(p in coordinate()) {
        prop_assert!(haversine_km(p, p).abs() < 1e-9);
    }

    #[test]
    fn test_haversine_is_bounded_by_half_circumference(a in coordinate(), b in coordinate()) {
        let d = haversine_km(a, b);
        prop_assert!(d >= 0.0);
        prop_assert!(d <= std::f64::consts::PI * EARTH_RADIUS_KM + 1e-6);
    }

    #[test]
    fn test_nearest_is_the_first_minimum(
        coords in prop::collection::vec(coordinate(), 1..25),
        query in coordinate(),
    ) {
        let set = point_set(&coords);
        let found = nearest(query, &set).unwrap();

        let distances: Vec<f64> = set.iter().map(|p| haversine_km(query, p.location)).collect();
        let min = distances.iter().copied().fold(f64::INFINITY, f64::min);
        let first = distances.iter().position(|d| *d == min).unwrap();

        prop_assert_eq!(found.distance_km, min);
        prop_assert!(std::ptr::eq(found.point, &set.as_slice()[first]));
    }

    #[test]
    fn test_duplicated_points_resolve_to_the_first_copy(
        coords in prop::collection::vec(coordinate(), 1..10),
        query in coordinate(),
    ) {
        let mut doubled = coords.clone();
        doubled.extend_from_slice(&coords);
        let set = point_set(&doubled);

        let found = nearest(query, &set).unwrap();
        let index = set
            .iter()
            .position(|p| std::ptr::eq(p, found.point))
            .unwrap();
        prop_assert!(index < coords.len());
    }
}
