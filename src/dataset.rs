//! Reference dataset loader
//!
//! Parses the city-level AQI dataset (CSV with a header row) into the
//! immutable `ReferencePointSet` used for nearest-station lookup. The set is
//! loaded once at startup and only read afterwards.
//!
//! Expected columns (order free, extra columns ignored):
//!   Country, City, AQI Value, AQI Category, lat, lng
//! Optional per-pollutant columns:
//!   CO AQI Value, Ozone AQI Value, NO2 AQI Value, PM2.5 AQI Value

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::category::{classify, Category};
use crate::locate::{self, LocateError, Nearest};
use crate::logging::{self, DataSource};
use crate::model::{Coordinate, Pollutant, ReferencePoint, SubIndices};

const COL_COUNTRY: &str = "Country";
const COL_CITY: &str = "City";
const COL_AQI_VALUE: &str = "AQI Value";
const COL_AQI_CATEGORY: &str = "AQI Category";
const COL_LAT: &str = "lat";
const COL_LNG: &str = "lng";

const REQUIRED_COLUMNS: [&str; 6] = [COL_COUNTRY, COL_CITY, COL_AQI_VALUE, COL_AQI_CATEGORY, COL_LAT, COL_LNG];

fn sub_index_column(kind: Pollutant) -> &'static str {
    match kind {
        Pollutant::Co => "CO AQI Value",
        Pollutant::O3 => "Ozone AQI Value",
        Pollutant::No2 => "NO2 AQI Value",
        Pollutant::Pm25 => "PM2.5 AQI Value",
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("dataset has no header row")]
    MissingHeader,
    #[error("dataset is missing required column '{0}'")]
    MissingColumn(String),
}

// ============================================================================
// Reference Point Set
// ============================================================================

/// Immutable, insertion-ordered collection of locatable reference points.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferencePointSet {
    points: Vec<ReferencePoint>,
}

impl ReferencePointSet {
    /// Builds a set from points, dropping any whose coordinate is invalid.
    /// Order is preserved.
    pub fn new(points: Vec<ReferencePoint>) -> Self {
        Self {
            points: points.into_iter().filter(|p| p.location.is_valid()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ReferencePoint> {
        self.points.iter()
    }

    pub fn as_slice(&self) -> &[ReferencePoint] {
        &self.points
    }

    /// Closest point to `query`; see [`locate::nearest`].
    pub fn nearest(&self, query: Coordinate) -> Result<Nearest<'_>, LocateError> {
        locate::nearest(query, self)
    }

    /// Distinct country names, sorted.
    pub fn countries(&self) -> Vec<&str> {
        self.points
            .iter()
            .map(|p| p.country.as_str())
            .filter(|c| !c.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// The subset whose country is in `countries`. An empty selection means
    /// "no filter" and returns the whole set.
    pub fn filter_countries<S: AsRef<str>>(&self, countries: &[S]) -> ReferencePointSet {
        if countries.is_empty() {
            return self.clone();
        }
        ReferencePointSet {
            points: self
                .points
                .iter()
                .filter(|p| countries.iter().any(|c| c.as_ref() == p.country))
                .cloned()
                .collect(),
        }
    }

    /// Arithmetic mean of latitudes and longitudes; a default map center.
    pub fn centroid(&self) -> Option<Coordinate> {
        if self.points.is_empty() {
            return None;
        }
        let n = self.points.len() as f64;
        let (lat_sum, lng_sum) = self
            .points
            .iter()
            .fold((0.0, 0.0), |(lat, lng), p| (lat + p.location.latitude, lng + p.location.longitude));
        Some(Coordinate::new(lat_sum / n, lng_sum / n))
    }
}

impl<'a> IntoIterator for &'a ReferencePointSet {
    type Item = &'a ReferencePoint;
    type IntoIter = std::slice::Iter<'a, ReferencePoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

// ============================================================================
// CSV Parsing
// ============================================================================

/// Row counts from a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub kept: usize,
    pub dropped: usize,
}

/// Reads and parses the dataset at `path`, logging one summary line.
pub fn load_reference_csv<P: AsRef<Path>>(path: P) -> Result<ReferencePointSet, DatasetError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let (set, report) = parse_reference_csv(&content)?;
    logging::log_load_summary(DataSource::Dataset, report.total_rows, report.kept, report.dropped);
    Ok(set)
}

/// Parses dataset text. Rows with a missing, unparseable or out-of-range
/// coordinate are dropped and counted. A blank or non-numeric AQI value
/// leaves the row in place with `aqi_value: None`.
pub fn parse_reference_csv(text: &str) -> Result<(ReferencePointSet, LoadReport), DatasetError> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());

    let header_line = lines.next().ok_or(DatasetError::MissingHeader)?;
    let header: HashMap<String, usize> = split_record(header_line.trim_start_matches('\u{feff}'))
        .into_iter()
        .enumerate()
        .map(|(i, name)| (name.trim().to_string(), i))
        .collect();

    let column = |name: &str| -> Result<usize, DatasetError> {
        header
            .get(name)
            .copied()
            .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))
    };
    for name in REQUIRED_COLUMNS {
        column(name)?;
    }
    let country_col = column(COL_COUNTRY)?;
    let city_col = column(COL_CITY)?;
    let aqi_col = column(COL_AQI_VALUE)?;
    let category_col = column(COL_AQI_CATEGORY)?;
    let lat_col = column(COL_LAT)?;
    let lng_col = column(COL_LNG)?;
    let sub_cols: Vec<(Pollutant, Option<usize>)> = Pollutant::ALL
        .iter()
        .map(|&kind| (kind, header.get(sub_index_column(kind)).copied()))
        .collect();

    let mut points = Vec::new();
    let mut total_rows = 0;

    for line in lines {
        total_rows += 1;
        let fields = split_record(line);
        let field = |i: usize| fields.get(i).map(|s| s.trim()).unwrap_or("");

        let location = match (parse_number(field(lat_col)), parse_number(field(lng_col))) {
            (Some(lat), Some(lng)) => Coordinate::new(lat, lng),
            _ => continue,
        };
        if !location.is_valid() {
            continue;
        }
        let aqi_value = parse_index(field(aqi_col));

        let mut sub_indices = SubIndices::default();
        for (kind, col) in &sub_cols {
            sub_indices.set(*kind, col.and_then(|i| parse_index(field(i))));
        }

        let category_text = field(category_col);
        let (category_label, category) = if category_text.is_empty() {
            let derived = classify(aqi_value);
            (derived.label().to_string(), derived)
        } else {
            let parsed = category_text.parse::<Category>().unwrap_or(Category::Unknown);
            (category_text.to_string(), parsed)
        };

        points.push(ReferencePoint {
            city: field(city_col).to_string(),
            country: field(country_col).to_string(),
            location,
            aqi_value,
            category_label,
            category,
            sub_indices,
        });
    }

    let kept = points.len();
    let report = LoadReport {
        total_rows,
        kept,
        dropped: total_rows - kept,
    };
    Ok((ReferencePointSet { points }, report))
}

/// Splits one CSV record. Double-quoted fields may contain commas; a doubled
/// quote inside a quoted field is a literal quote.
fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Parses a numeric cell. Empty, "NaN" and "null" cells are missing.
fn parse_number(s: &str) -> Option<f64> {
    if s.is_empty() || s.eq_ignore_ascii_case("null") {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses an AQI cell into a non-negative integer index.
fn parse_index(s: &str) -> Option<u16> {
    parse_number(s)
        .filter(|v| *v >= 0.0 && *v <= f64::from(u16::MAX))
        .map(|v| v.round() as u16)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Country,City,AQI Value,AQI Category,CO AQI Value,CO AQI Category,Ozone AQI Value,Ozone AQI Category,NO2 AQI Value,NO2 AQI Category,PM2.5 AQI Value,PM2.5 AQI Category,lat,lng";

    fn csv(rows: &[&str]) -> String {
        let mut text = String::from(HEADER);
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        text
    }

    #[test]
    fn test_parses_complete_rows_in_order() {
        let text = csv(&[
            "Russian Federation,Praskoveya,51,Moderate,1,Good,36,Good,0,Good,51,Moderate,44.7444,44.2031",
            "Brazil,Presidente Dutra,41,Good,1,Good,5,Good,1,Good,41,Good,-5.29,-44.49",
        ]);
        let (set, report) = parse_reference_csv(&text).unwrap();
        assert_eq!(report, LoadReport { total_rows: 2, kept: 2, dropped: 0 });
        let first = &set.as_slice()[0];
        assert_eq!(first.city, "Praskoveya");
        assert_eq!(first.country, "Russian Federation");
        assert_eq!(first.aqi_value, Some(51));
        assert_eq!(first.category_label, "Moderate");
        assert_eq!(first.category, Category::Moderate);
        assert_eq!(first.location, Coordinate::new(44.7444, 44.2031));
        assert_eq!(first.sub_indices.o3, Some(36));
        assert_eq!(first.sub_indices.pm25, Some(51));
        assert_eq!(set.as_slice()[1].city, "Presidente Dutra");
    }

    #[test]
    fn test_rows_without_coordinates_are_dropped() {
        let text = csv(&[
            "India,Delhi,152,Unhealthy,3,Good,40,Good,10,Good,152,Unhealthy,,77.2",
            "India,Mumbai,90,Moderate,2,Good,30,Good,8,Good,90,Moderate,19.07,72.87",
            "India,Nowhere,90,Moderate,2,Good,30,Good,8,Good,90,Moderate,null,NaN",
            "India,Offworld,90,Moderate,2,Good,30,Good,8,Good,90,Moderate,95.0,72.87",
        ]);
        let (set, report) = parse_reference_csv(&text).unwrap();
        assert_eq!(report, LoadReport { total_rows: 4, kept: 1, dropped: 3 });
        assert_eq!(set.as_slice()[0].city, "Mumbai");
    }

    #[test]
    fn test_quoted_fields_keep_commas() {
        let text = csv(&[
            "\"Korea, Republic of\",\"Seoul\",60,Moderate,1,Good,30,Good,20,Good,60,Moderate,37.56,126.97",
        ]);
        let (set, _) = parse_reference_csv(&text).unwrap();
        assert_eq!(set.as_slice()[0].country, "Korea, Republic of");
        assert_eq!(set.as_slice()[0].location.longitude, 126.97);
    }

    #[test]
    fn test_unknown_or_blank_category() {
        let text = csv(&[
            "X,A,120,Smoky,1,Good,30,Good,20,Good,120,x,1.0,1.0",
            "X,B,120,,1,Good,30,Good,20,Good,120,x,1.0,1.0",
        ]);
        let (set, _) = parse_reference_csv(&text).unwrap();
        assert_eq!(set.as_slice()[0].category, Category::Unknown);
        assert_eq!(set.as_slice()[0].category_label, "Smoky");
        assert_eq!(set.as_slice()[1].category, Category::UnhealthyForSensitiveGroups);
        assert_eq!(set.as_slice()[1].category_label, "Unhealthy for Sensitive Groups");
    }

    #[test]
    fn test_blank_aqi_value_keeps_the_row_locatable() {
        let text = "Country,City,AQI Value,AQI Category,lat,lng\n\
                    X,Blank,,Good,1.0,1.0\n\
                    Y,Far,40,Good,50.0,50.0\n\
                    Z,Wordy,n/a,,2.0,2.0";
        let (set, report) = parse_reference_csv(text).unwrap();
        assert_eq!(report, LoadReport { total_rows: 3, kept: 3, dropped: 0 });

        let blank = &set.as_slice()[0];
        assert_eq!(blank.aqi_value, None);
        assert_eq!(blank.category, Category::Good);

        let wordy = &set.as_slice()[2];
        assert_eq!(wordy.aqi_value, None);
        assert_eq!(wordy.category, Category::Unknown);
        assert_eq!(wordy.category_label, "Unknown");

        let found = set.nearest(Coordinate::new(0.0, 0.0)).unwrap();
        assert_eq!(found.point.city, "Blank");
    }

    #[test]
    fn test_optional_sub_index_columns_may_be_absent() {
        let text = "City,Country,lat,lng,AQI Value,AQI Category\nLima,Peru,-12.04,-77.04,45,Good";
        let (set, report) = parse_reference_csv(text).unwrap();
        assert_eq!(report.kept, 1);
        assert_eq!(set.as_slice()[0].sub_indices, SubIndices::default());
        assert_eq!(set.as_slice()[0].city, "Lima");
    }

    #[test]
    fn test_missing_required_column_is_an_error() {
        let text = "Country,City,AQI Value,AQI Category,lat\nPeru,Lima,45,Good,-12.04";
        match parse_reference_csv(text) {
            Err(DatasetError::MissingColumn(name)) => assert_eq!(name, "lng"),
            other => panic!("expected MissingColumn, got {:?}", other),
        }
        assert!(matches!(parse_reference_csv(""), Err(DatasetError::MissingHeader)));
    }

    #[test]
    fn test_countries_filter_and_centroid() {
        let text = csv(&[
            "Peru,Lima,45,Good,1,Good,1,Good,1,Good,45,Good,-12.0,-77.0",
            "Chile,Santiago,70,Moderate,1,Good,1,Good,1,Good,70,Moderate,-33.0,-70.0",
            "Peru,Cusco,30,Good,1,Good,1,Good,1,Good,30,Good,-13.5,-72.0",
        ]);
        let (set, _) = parse_reference_csv(&text).unwrap();
        assert_eq!(set.countries(), vec!["Chile", "Peru"]);

        let peru = set.filter_countries(&["Peru"]);
        assert_eq!(peru.len(), 2);
        assert!(peru.iter().all(|p| p.country == "Peru"));
        assert_eq!(set.filter_countries::<&str>(&[]).len(), 3);

        let center = peru.centroid().unwrap();
        assert!((center.latitude - (-12.75)).abs() < 1e-9);
        assert!((center.longitude - (-74.5)).abs() < 1e-9);
        assert_eq!(ReferencePointSet::default().centroid(), None);
    }

    #[test]
    fn test_new_drops_invalid_points() {
        let valid = ReferencePoint {
            city: "A".to_string(),
            country: "X".to_string(),
            location: Coordinate::new(10.0, 10.0),
            aqi_value: Some(10),
            category_label: "Good".to_string(),
            category: Category::Good,
            sub_indices: SubIndices::default(),
        };
        let invalid = ReferencePoint {
            location: Coordinate::new(f64::NAN, 10.0),
            ..valid.clone()
        };
        let set = ReferencePointSet::new(vec![invalid, valid]);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_split_record_handles_escaped_quotes() {
        assert_eq!(split_record("a,\"b \"\"c\"\"\",d"), vec!["a", "b \"c\"", "d"]);
        assert_eq!(split_record("a,,"), vec!["a", "", ""]);
    }
}
