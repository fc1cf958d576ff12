//! Wind decomposition against a flight's bearing, and condition bucketing.

use serde::Serialize;

/// Components above this magnitude (m/s) are no longer calm.
pub const MODERATE_WIND_MPS: f64 = 2.0;
/// Components above this magnitude (m/s) are strong.
pub const STRONG_WIND_MPS: f64 = 5.0;

/// Headwind/crosswind split of a wind vector relative to a direction of travel.
///
/// Positive headwind opposes travel; negative is a tailwind. Crosswind is
/// signed (positive = from the right of the flight).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindComponents {
    pub headwind: f64,
    pub crosswind: f64,
}

impl WindComponents {
    pub fn crosswind_abs(&self) -> f64 {
        self.crosswind.abs()
    }
}

/// Resolve wind blowing *from* `wind_direction` against `flight_bearing`.
pub fn resolve(flight_bearing: f64, wind_direction: f64, wind_speed: f64) -> WindComponents {
    let relative = (wind_direction - flight_bearing).to_radians();
    WindComponents {
        headwind: wind_speed * relative.cos(),
        crosswind: wind_speed * relative.sin(),
    }
}

// ---------------------------------------------------------------------------
// Bucketing
// ---------------------------------------------------------------------------

/// Coarse wind grouping used for statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WindCategory {
    Calm,
    Headwind,
    Tailwind,
    Crosswind,
}

impl WindCategory {
    pub const ALL: [WindCategory; 4] = [
        WindCategory::Calm,
        WindCategory::Headwind,
        WindCategory::Tailwind,
        WindCategory::Crosswind,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WindCategory::Calm => "CALM",
            WindCategory::Headwind => "HEADWIND",
            WindCategory::Tailwind => "TAILWIND",
            WindCategory::Crosswind => "CROSSWIND",
        }
    }
}

impl std::fmt::Display for WindCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wind condition label for one flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WindCondition {
    Calm,
    ModerateHeadwind,
    StrongHeadwind,
    ModerateTailwind,
    StrongTailwind,
    ModerateCrosswind,
    StrongCrosswind,
}

impl WindCondition {
    /// Bucket resolved components.
    ///
    /// A dominant crosswind wins before the headwind sign is looked at.
    /// Thresholds are strict: exactly 5.0 m/s is still moderate.
    pub fn from_components(c: &WindComponents) -> Self {
        let cross = c.crosswind.abs();
        let head = c.headwind;

        if cross > head.abs() {
            if cross > STRONG_WIND_MPS {
                WindCondition::StrongCrosswind
            } else {
                WindCondition::ModerateCrosswind
            }
        } else if head > MODERATE_WIND_MPS {
            if head > STRONG_WIND_MPS {
                WindCondition::StrongHeadwind
            } else {
                WindCondition::ModerateHeadwind
            }
        } else if head < -MODERATE_WIND_MPS {
            if head < -STRONG_WIND_MPS {
                WindCondition::StrongTailwind
            } else {
                WindCondition::ModerateTailwind
            }
        } else {
            WindCondition::Calm
        }
    }

    pub fn category(&self) -> WindCategory {
        match self {
            WindCondition::Calm => WindCategory::Calm,
            WindCondition::ModerateHeadwind | WindCondition::StrongHeadwind => {
                WindCategory::Headwind
            }
            WindCondition::ModerateTailwind | WindCondition::StrongTailwind => {
                WindCategory::Tailwind
            }
            WindCondition::ModerateCrosswind | WindCondition::StrongCrosswind => {
                WindCategory::Crosswind
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WindCondition::Calm => "CALM",
            WindCondition::ModerateHeadwind => "MODERATE_HEADWIND",
            WindCondition::StrongHeadwind => "STRONG_HEADWIND",
            WindCondition::ModerateTailwind => "MODERATE_TAILWIND",
            WindCondition::StrongTailwind => "STRONG_TAILWIND",
            WindCondition::ModerateCrosswind => "MODERATE_CROSSWIND",
            WindCondition::StrongCrosswind => "STRONG_CROSSWIND",
        }
    }
}

impl std::fmt::Display for WindCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_resolve_headwind_along_heading() {
        for heading in [0.0, 45.0, 230.0, 359.0] {
            let c = resolve(heading, heading, 7.5);
            assert!((c.headwind - 7.5).abs() < EPS);
            assert!(c.crosswind.abs() < EPS);
        }
    }

    #[test]
    fn test_resolve_pure_crosswind() {
        let c = resolve(100.0, 190.0, 6.0);
        assert!(c.headwind.abs() < EPS);
        assert!((c.crosswind - 6.0).abs() < EPS);
    }

    #[test]
    fn test_resolve_tailwind() {
        let c = resolve(50.0, 230.0, 4.0);
        assert!((c.headwind + 4.0).abs() < EPS);
    }

    #[test]
    fn test_bucket_strong_headwind_at_ten_knots() {
        let speed = crate::types::knots_to_mps(10.0);
        let c = resolve(230.0, 230.0, speed);
        assert!((c.headwind - 5.14444).abs() < 1e-6);
        assert_eq!(
            WindCondition::from_components(&c),
            WindCondition::StrongHeadwind
        );
    }

    #[test]
    fn test_bucket_boundaries_are_strict() {
        let at = |head, cross| {
            WindCondition::from_components(&WindComponents {
                headwind: head,
                crosswind: cross,
            })
        };
        assert_eq!(at(5.0, 0.0), WindCondition::ModerateHeadwind);
        assert_eq!(at(2.0, 0.0), WindCondition::Calm);
        assert_eq!(at(-2.0, 0.0), WindCondition::Calm);
        assert_eq!(at(-5.0, 0.0), WindCondition::ModerateTailwind);
        assert_eq!(at(-5.1, 0.0), WindCondition::StrongTailwind);
        assert_eq!(at(0.0, -5.1), WindCondition::StrongCrosswind);
        assert_eq!(at(0.0, 1.0), WindCondition::ModerateCrosswind);
        assert_eq!(at(0.0, 0.0), WindCondition::Calm);
    }

    #[test]
    fn test_bucket_crosswind_dominates_near_45() {
        // 46 deg off the nose: crosswind just exceeds headwind
        let c = resolve(0.0, 46.0, 10.0);
        assert_eq!(
            WindCondition::from_components(&c),
            WindCondition::StrongCrosswind
        );
        // 44 deg: headwind wins
        let c = resolve(0.0, 44.0, 10.0);
        assert_eq!(
            WindCondition::from_components(&c),
            WindCondition::StrongHeadwind
        );
    }

    #[test]
    fn test_category() {
        assert_eq!(
            WindCondition::StrongTailwind.category(),
            WindCategory::Tailwind
        );
        assert_eq!(WindCondition::Calm.category(), WindCategory::Calm);
        assert_eq!(WindCondition::ModerateCrosswind.to_string(), "MODERATE_CROSSWIND");
    }
}
