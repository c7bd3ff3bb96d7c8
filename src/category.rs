//! AQI health categories.
//!
//! Maps an AQI value onto the six ordered health categories, and carries the
//! static display metadata (color, advisory text) each category is shown
//! with. `Unknown` is the sentinel for an undefined sub-index; it is not an
//! error.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Health categories, in ascending order of severity. `Unknown` sorts last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Good,
    Moderate,
    #[serde(rename = "Unhealthy for Sensitive Groups")]
    UnhealthyForSensitiveGroups,
    Unhealthy,
    #[serde(rename = "Very Unhealthy")]
    VeryUnhealthy,
    Hazardous,
    Unknown,
}

impl Category {
    /// The six real categories from best to worst. Excludes `Unknown`.
    pub const ALL: [Category; 6] = [
        Category::Good,
        Category::Moderate,
        Category::UnhealthyForSensitiveGroups,
        Category::Unhealthy,
        Category::VeryUnhealthy,
        Category::Hazardous,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Good => "Good",
            Category::Moderate => "Moderate",
            Category::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            Category::Unhealthy => "Unhealthy",
            Category::VeryUnhealthy => "Very Unhealthy",
            Category::Hazardous => "Hazardous",
            Category::Unknown => "Unknown",
        }
    }

    /// Closed AQI range `(low, high)` covered by this category.
    /// `Unknown` covers no range.
    pub fn range(&self) -> Option<(u16, u16)> {
        match self {
            Category::Good => Some((0, 50)),
            Category::Moderate => Some((51, 100)),
            Category::UnhealthyForSensitiveGroups => Some((101, 150)),
            Category::Unhealthy => Some((151, 200)),
            Category::VeryUnhealthy => Some((201, 300)),
            Category::Hazardous => Some((301, 500)),
            Category::Unknown => None,
        }
    }

    /// Display color as a `#RRGGBB` hex string.
    pub fn color(&self) -> &'static str {
        match self {
            Category::Good => "#2ECC71",
            Category::Moderate => "#F1C40F",
            Category::UnhealthyForSensitiveGroups => "#E67E22",
            Category::Unhealthy => "#E74C3C",
            Category::VeryUnhealthy => "#8E44AD",
            Category::Hazardous => "#7D3C98",
            Category::Unknown => "#64748B",
        }
    }

    /// Short health advisory for this category.
    pub fn advisory(&self) -> &'static str {
        match self {
            Category::Good => "Air quality is satisfactory—enjoy outdoor activities.",
            Category::Moderate => {
                "Unusually sensitive people should consider limiting prolonged outdoor exertion."
            }
            Category::UnhealthyForSensitiveGroups => {
                "Sensitive groups reduce prolonged outdoor exertion; consider a mask."
            }
            Category::Unhealthy => "Everyone limit prolonged outdoor exertion; mask recommended.",
            Category::VeryUnhealthy => "Avoid outdoor activity; use high-quality masks indoors/outdoors.",
            Category::Hazardous => "Stay indoors; consider air purifiers; follow local health advisories.",
            Category::Unknown => "Check local guidance.",
        }
    }

    /// The next worse category, if any.
    pub fn next_worse(&self) -> Option<Category> {
        match self {
            Category::Good => Some(Category::Moderate),
            Category::Moderate => Some(Category::UnhealthyForSensitiveGroups),
            Category::UnhealthyForSensitiveGroups => Some(Category::Unhealthy),
            Category::Unhealthy => Some(Category::VeryUnhealthy),
            Category::VeryUnhealthy => Some(Category::Hazardous),
            Category::Hazardous | Category::Unknown => None,
        }
    }

    /// Classifies an arbitrary real-valued AQI. NaN is `Unknown`; anything
    /// at or below 50 (negatives included) is `Good`; anything above 300 is
    /// `Hazardous`.
    ///
    /// Fractional values are compared against the band upper bounds, so 50.5
    /// is `Moderate`.
    pub fn from_value(aqi: f64) -> Category {
        if aqi.is_nan() {
            Category::Unknown
        } else if aqi <= 50.0 {
            Category::Good
        } else if aqi <= 100.0 {
            Category::Moderate
        } else if aqi <= 150.0 {
            Category::UnhealthyForSensitiveGroups
        } else if aqi <= 200.0 {
            Category::Unhealthy
        } else if aqi <= 300.0 {
            Category::VeryUnhealthy
        } else {
            Category::Hazardous
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Category {
    type Err = std::convert::Infallible;

    /// Parses a category label case-insensitively. Anything unrecognized
    /// becomes `Unknown`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Ok(Category::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(wanted))
            .unwrap_or(Category::Unknown))
    }
}

/// Classifies an AQI sub-index. An undefined sub-index is `Unknown`; values
/// above 500 stay `Hazardous`.
pub fn classify(aqi: Option<u16>) -> Category {
    match aqi {
        None => Category::Unknown,
        Some(0..=50) => Category::Good,
        Some(51..=100) => Category::Moderate,
        Some(101..=150) => Category::UnhealthyForSensitiveGroups,
        Some(151..=200) => Category::Unhealthy,
        Some(201..=300) => Category::VeryUnhealthy,
        Some(_) => Category::Hazardous,
    }
}

// ---------------------------------------------------------------------------
// Band progress
// ---------------------------------------------------------------------------

/// How close a value is to tipping into the next worse category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BandProgress {
    pub current: Category,
    pub next: Category,
    /// First AQI value of `next`.
    pub next_start: u16,
    /// `next_start - value`, clamped at zero.
    pub remaining: f64,
    /// Position of `value` between the start of `current` and `next_start`,
    /// as a percentage clamped to [0, 100].
    pub percent: f64,
}

/// Computes progress from `value` towards the category after `current`.
///
/// `current` is taken as given rather than derived from `value`, so a
/// category predicted by some other means can be paired with a raw reading.
/// Returns `None` for `Hazardous` and `Unknown`, which have no next band.
pub fn band_progress(current: Category, value: f64) -> Option<BandProgress> {
    let next = current.next_worse()?;
    let (low, _) = current.range()?;
    let (next_start, _) = next.range()?;

    let remaining = (f64::from(next_start) - value).max(0.0);
    let span = f64::from(next_start - low).max(1.0);
    let percent = ((value - f64::from(low)) / span * 100.0).clamp(0.0, 100.0);

    Some(BandProgress {
        current,
        next,
        next_start,
        remaining,
        percent,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
