//! Radar echo classification: intensity band to category, action and severity.
//!
//! Bands are half-open `[min, max)`; the top band is unbounded and anything
//! below the first band (including negative values) is CLEAR.

use serde::Serialize;

// ---------------------------------------------------------------------------
// Categories and actions
// ---------------------------------------------------------------------------

/// Echo colour category. Declaration order is severity order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EchoCategory {
    Clear,
    Green,
    Yellow,
    Orange,
    Red,
    Magenta,
}

impl EchoCategory {
    /// Severity rank, 0 (clear) through 5 (magenta).
    pub fn severity(&self) -> u8 {
        *self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EchoCategory::Clear => "CLEAR",
            EchoCategory::Green => "GREEN",
            EchoCategory::Yellow => "YELLOW",
            EchoCategory::Orange => "ORANGE",
            EchoCategory::Red => "RED",
            EchoCategory::Magenta => "MAGENTA",
        }
    }

    /// Precipitation wording used in reports.
    pub fn description(&self) -> &'static str {
        match self {
            EchoCategory::Clear => "Clear",
            EchoCategory::Green => "Light precipitation",
            EchoCategory::Yellow => "Moderate precipitation",
            EchoCategory::Orange => "Heavy precipitation",
            EchoCategory::Red => "Very heavy precipitation / thunderstorm",
            EchoCategory::Magenta => "Extreme / hail",
        }
    }
}

impl std::fmt::Display for EchoCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recommended pilot action for an echo category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendedAction {
    GoThrough,
    GoThroughCaution,
    AvoidCircumnavigate,
    MandatoryAvoidance,
    CompleteAvoidance,
}

impl RecommendedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendedAction::GoThrough => "GO_THROUGH",
            RecommendedAction::GoThroughCaution => "GO_THROUGH_CAUTION",
            RecommendedAction::AvoidCircumnavigate => "AVOID_CIRCUMNAVIGATE",
            RecommendedAction::MandatoryAvoidance => "MANDATORY_AVOIDANCE",
            RecommendedAction::CompleteAvoidance => "COMPLETE_AVOIDANCE",
        }
    }
}

impl std::fmt::Display for RecommendedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Band table
// ---------------------------------------------------------------------------

/// One row of the echo table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EchoBand {
    pub min_dbz: f64,
    /// Exclusive upper bound; `None` for the top band.
    pub max_dbz: Option<f64>,
    pub category: EchoCategory,
    pub action: RecommendedAction,
}

impl EchoBand {
    pub fn contains(&self, dbz: f64) -> bool {
        dbz >= self.min_dbz && self.max_dbz.is_none_or(|max| dbz < max)
    }
}

/// Precipitation bands in ascending order. Below the first band is CLEAR.
pub const ECHO_BANDS: &[EchoBand] = &[
    EchoBand {
        min_dbz: 5.0,
        max_dbz: Some(30.0),
        category: EchoCategory::Green,
        action: RecommendedAction::GoThrough,
    },
    EchoBand {
        min_dbz: 30.0,
        max_dbz: Some(40.0),
        category: EchoCategory::Yellow,
        action: RecommendedAction::GoThroughCaution,
    },
    EchoBand {
        min_dbz: 40.0,
        max_dbz: Some(50.0),
        category: EchoCategory::Orange,
        action: RecommendedAction::AvoidCircumnavigate,
    },
    EchoBand {
        min_dbz: 50.0,
        max_dbz: Some(60.0),
        category: EchoCategory::Red,
        action: RecommendedAction::MandatoryAvoidance,
    },
    EchoBand {
        min_dbz: 60.0,
        max_dbz: None,
        category: EchoCategory::Magenta,
        action: RecommendedAction::CompleteAvoidance,
    },
];

/// Result of [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EchoClassification {
    pub category: EchoCategory,
    pub action: RecommendedAction,
    pub severity: u8,
}

/// Classify an intensity (dBZ-like) into its band.
pub fn classify(dbz: f64) -> EchoClassification {
    let (category, action) = ECHO_BANDS
        .iter()
        .find(|band| band.contains(dbz))
        .map(|band| (band.category, band.action))
        .unwrap_or((EchoCategory::Clear, RecommendedAction::GoThrough));

    EchoClassification {
        category,
        action,
        severity: category.severity(),
    }
}

// ---------------------------------------------------------------------------
// Weather sample
// ---------------------------------------------------------------------------

/// Classified intensity at one position for one cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherSample {
    pub intensity_dbz: f64,
    pub category: EchoCategory,
    pub severity: u8,
    pub in_weather: bool,
    /// Name of the estimator that produced the intensity.
    pub source: &'static str,
}

impl WeatherSample {
    pub fn from_intensity(intensity_dbz: f64, source: &'static str) -> Self {
        let echo = classify(intensity_dbz);
        WeatherSample {
            intensity_dbz,
            category: echo.category,
            severity: echo.severity,
            in_weather: intensity_dbz > 0.0,
            source,
        }
    }

    pub fn action(&self) -> RecommendedAction {
        classify(self.intensity_dbz).action
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_orange() {
        let c = classify(42.0);
        assert_eq!(c.category, EchoCategory::Orange);
        assert_eq!(c.action, RecommendedAction::AvoidCircumnavigate);
        assert_eq!(c.severity, 3);
    }

    #[test]
    fn test_boundaries_low_inclusive() {
        assert_eq!(classify(4.999).category, EchoCategory::Clear);
        assert_eq!(classify(5.0).category, EchoCategory::Green);
        assert_eq!(classify(30.0).category, EchoCategory::Yellow);
        assert_eq!(classify(40.0).category, EchoCategory::Orange);
        assert_eq!(classify(50.0).category, EchoCategory::Red);
        assert_eq!(classify(60.0).category, EchoCategory::Magenta);
        assert_eq!(classify(250.0).category, EchoCategory::Magenta);
    }

    #[test]
    fn test_negative_is_clear() {
        let c = classify(-12.0);
        assert_eq!(c.category, EchoCategory::Clear);
        assert_eq!(c.action, RecommendedAction::GoThrough);
        assert_eq!(c.severity, 0);
    }

    #[test]
    fn test_severity_monotonic_without_gaps() {
        let mut last = 0u8;
        let mut dbz = 0.0;
        while dbz <= 80.0 {
            let sev = classify(dbz).severity;
            assert!(sev >= last, "severity dropped at {dbz}");
            assert!(sev <= last + 1, "severity skipped a rank at {dbz}");
            last = sev;
            dbz += 0.25;
        }
        assert_eq!(last, 5);
    }

    #[test]
    fn test_bands_contiguous() {
        for pair in ECHO_BANDS.windows(2) {
            assert_eq!(pair[0].max_dbz, Some(pair[1].min_dbz));
            assert!(pair[0].category < pair[1].category);
        }
    }

    #[test]
    fn test_sample_in_weather() {
        let s = WeatherSample::from_intensity(3.0, "test");
        assert_eq!(s.category, EchoCategory::Clear);
        assert!(s.in_weather);
        let s = WeatherSample::from_intensity(0.0, "test");
        assert!(!s.in_weather);
        assert_eq!(
            WeatherSample::from_intensity(55.0, "test").action(),
            RecommendedAction::MandatoryAvoidance
        );
    }
}
