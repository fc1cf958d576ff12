//! Observed-decision inference, compliance cross-tabulation, and the
//! heading-deviation avoidance assessment.
//!
//! The observed decision is inferred from the same severity that produced the
//! recommendation, so compliance is a self-consistency check only.

use serde::Serialize;

use crate::types::meters_to_feet;

/// Altitude (ft) separating AVOIDED from DIVERTED for severe echoes.
pub const AVOID_ALTITUDE_FT: f64 = 1500.0;
/// |vertical rate| (m/s) above which an ORANGE encounter counts as manoeuvring.
pub const MANEUVER_VERTICAL_RATE_MPS: f64 = 5.0;

// ---------------------------------------------------------------------------
// Observed decision
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObservedDecision {
    ContinuedNormal,
    ContinuedWithCaution,
    Circumnavigated,
    Avoided,
    Diverted,
}

impl ObservedDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObservedDecision::ContinuedNormal => "CONTINUED_NORMAL",
            ObservedDecision::ContinuedWithCaution => "CONTINUED_WITH_CAUTION",
            ObservedDecision::Circumnavigated => "CIRCUMNAVIGATED",
            ObservedDecision::Avoided => "AVOIDED",
            ObservedDecision::Diverted => "DIVERTED",
        }
    }

    /// True for AVOIDED, CIRCUMNAVIGATED and DIVERTED.
    pub fn is_avoidance(&self) -> bool {
        matches!(
            self,
            ObservedDecision::Avoided
                | ObservedDecision::Circumnavigated
                | ObservedDecision::Diverted
        )
    }
}

impl std::fmt::Display for ObservedDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Infer what the aircraft did from echo severity and its vertical profile.
///
/// `altitude_m` is converted to feet before the 1500 ft comparison. A missing
/// vertical rate counts as zero.
pub fn infer_decision(
    severity: u8,
    altitude_m: f64,
    vertical_rate_mps: Option<f64>,
) -> ObservedDecision {
    match severity {
        s if s >= 4 => {
            if meters_to_feet(altitude_m) > AVOID_ALTITUDE_FT {
                ObservedDecision::Avoided
            } else {
                ObservedDecision::Diverted
            }
        }
        3 => {
            if vertical_rate_mps.unwrap_or(0.0).abs() > MANEUVER_VERTICAL_RATE_MPS {
                ObservedDecision::Circumnavigated
            } else {
                ObservedDecision::ContinuedWithCaution
            }
        }
        _ => ObservedDecision::ContinuedNormal,
    }
}

// ---------------------------------------------------------------------------
// Compliance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceLabel {
    CompliantGoThrough,
    ConservativeAvoidance,
    RiskyPenetration,
    CompliantAvoidance,
    Undetermined,
}

impl ComplianceLabel {
    pub const ALL: [ComplianceLabel; 5] = [
        ComplianceLabel::CompliantGoThrough,
        ComplianceLabel::ConservativeAvoidance,
        ComplianceLabel::RiskyPenetration,
        ComplianceLabel::CompliantAvoidance,
        ComplianceLabel::Undetermined,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceLabel::CompliantGoThrough => "COMPLIANT_GO_THROUGH",
            ComplianceLabel::ConservativeAvoidance => "CONSERVATIVE_AVOIDANCE",
            ComplianceLabel::RiskyPenetration => "RISKY_PENETRATION",
            ComplianceLabel::CompliantAvoidance => "COMPLIANT_AVOIDANCE",
            ComplianceLabel::Undetermined => "UNDETERMINED",
        }
    }
}

impl std::fmt::Display for ComplianceLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cross-tabulate a recommended action string against the observed decision.
///
/// Matching is by substring: `GO_THROUGH` is checked before `AVOID`.
pub fn classify_compliance(recommended: &str, observed: ObservedDecision) -> ComplianceLabel {
    let avoided = observed.is_avoidance();
    if recommended.contains("GO_THROUGH") {
        if avoided {
            ComplianceLabel::ConservativeAvoidance
        } else {
            ComplianceLabel::CompliantGoThrough
        }
    } else if recommended.contains("AVOID") {
        if avoided {
            ComplianceLabel::CompliantAvoidance
        } else {
            ComplianceLabel::RiskyPenetration
        }
    } else {
        ComplianceLabel::Undetermined
    }
}

// ---------------------------------------------------------------------------
// Weather impact
// ---------------------------------------------------------------------------

/// Impact wording from echo severity, flagged when the flight was disrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeatherImpact {
    pub severity: u8,
    pub disrupted: bool,
}

impl WeatherImpact {
    pub fn new(severity: u8, decision: ObservedDecision) -> Self {
        WeatherImpact {
            severity,
            disrupted: matches!(decision, ObservedDecision::Avoided | ObservedDecision::Diverted),
        }
    }

    pub fn base_label(&self) -> &'static str {
        match self.severity {
            0 => "NO_IMPACT",
            1 => "MINIMAL_IMPACT",
            2 => "MINOR_IMPACT",
            3 => "MODERATE_IMPACT",
            4 => "SIGNIFICANT_IMPACT",
            _ => "SEVERE_IMPACT",
        }
    }

    pub fn label(&self) -> String {
        if self.disrupted {
            format!("{}_WITH_OPERATIONAL_DISRUPTION", self.base_label())
        } else {
            self.base_label().to_string()
        }
    }
}

// ---------------------------------------------------------------------------
// Deviation assessment
// ---------------------------------------------------------------------------

/// Deviation above which a flight in weather is treated as avoiding it.
pub const DEVIATION_AVOID_DEG: f64 = 20.0;
/// Smaller deviation accepted far out and high for severe weather.
pub const PRECAUTION_DEVIATION_DEG: f64 = 10.0;
pub const PRECAUTION_DISTANCE_KM: f64 = 40.0;
pub const PRECAUTION_ALTITUDE_FT: f64 = 2000.0;

/// Whether the flight's track suggests it is steering around weather.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvoidanceAssessment {
    pub avoiding: bool,
    /// `WEATHER_HIGH_DEVIATION`, `WEATHER_MEDIUM_DEVIATION`,
    /// `WEATHER_HIGH_PRECAUTION`, or `None`.
    pub reason: Option<String>,
}

impl AvoidanceAssessment {
    pub fn none() -> Self {
        AvoidanceAssessment {
            avoiding: false,
            reason: None,
        }
    }
}

/// Inputs to [`assess_deviation`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviationInput {
    pub in_weather: bool,
    pub severity: u8,
    /// `None` when the track is unknown.
    pub deviation_deg: Option<f64>,
    pub distance_km: f64,
    pub altitude_ft: f64,
}

/// Severity 4 and above is HIGH, 2 and 3 MEDIUM, below that not assessed.
fn severity_level(severity: u8) -> Option<&'static str> {
    match severity {
        s if s >= 4 => Some("HIGH"),
        2 | 3 => Some("MEDIUM"),
        _ => None,
    }
}

pub fn assess_deviation(input: &DeviationInput) -> AvoidanceAssessment {
    if !input.in_weather {
        return AvoidanceAssessment::none();
    }
    let Some(level) = severity_level(input.severity) else {
        return AvoidanceAssessment::none();
    };
    let Some(deviation) = input.deviation_deg else {
        return AvoidanceAssessment::none();
    };

    if deviation > DEVIATION_AVOID_DEG {
        return AvoidanceAssessment {
            avoiding: true,
            reason: Some(format!("WEATHER_{level}_DEVIATION")),
        };
    }

    if input.distance_km > PRECAUTION_DISTANCE_KM
        && input.altitude_ft > PRECAUTION_ALTITUDE_FT
        && level == "HIGH"
        && deviation > PRECAUTION_DEVIATION_DEG
    {
        return AvoidanceAssessment {
            avoiding: true,
            reason: Some("WEATHER_HIGH_PRECAUTION".to_string()),
        };
    }

    AvoidanceAssessment::none()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
