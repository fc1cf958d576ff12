//! Per-cycle classification: arrival filter → wind + echo → decision.
//!
//! [`Classifier::classify_cycle`] takes one batch of state vectors, the
//! current wind, and any [`IntensityEstimator`], and returns one
//! [`FlightClassification`] per arriving aircraft. Nothing is carried between
//! calls.

use serde::Serialize;

use crate::arrival::{is_arrival, ArrivalCriteria};
use crate::decision::{
    assess_deviation, classify_compliance, infer_decision, AvoidanceAssessment, ComplianceLabel,
    DeviationInput, ObservedDecision, WeatherImpact,
};
use crate::echo::{RecommendedAction, WeatherSample};
use crate::estimate::{builtin_zone_sets, IntensityEstimator, WeatherZone, BANGKOK_STATION};
use crate::geo::{bearing_deg, distance_km, heading_deviation_deg};
use crate::types::{
    meters_to_feet, mps_to_knots, AircraftState, BoundingBox, Position, WindObservation,
};
use crate::wind::{resolve, WindCategory, WindComponents, WindCondition};

// ---------------------------------------------------------------------------
// Airport profile
// ---------------------------------------------------------------------------

/// Immutable description of the airport being monitored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AirportProfile {
    pub code: String,
    pub name: String,
    pub reference: Position,
    pub metar_station: String,
    pub bbox: BoundingBox,
    /// Zones used by the fixed-zone estimator.
    pub zones: Vec<WeatherZone>,
    /// Zones used by the age-decayed estimator.
    pub decayed_zones: Vec<WeatherZone>,
}

impl AirportProfile {
    /// Bangkok Suvarnabhumi.
    pub fn suvarnabhumi() -> Self {
        let reference = Position::new(13.6811, 100.7475);
        let (zones, decayed_zones) = builtin_zone_sets(BANGKOK_STATION, reference);
        AirportProfile {
            code: "BKK".to_string(),
            name: "Suvarnabhumi Airport".to_string(),
            reference,
            metar_station: BANGKOK_STATION.to_string(),
            bbox: BoundingBox {
                min_lat: 13.1,
                max_lat: 14.3,
                min_lon: 100.2,
                max_lon: 101.3,
            },
            zones,
            decayed_zones,
        }
    }
}

impl Default for AirportProfile {
    fn default() -> Self {
        Self::suvarnabhumi()
    }
}

// ---------------------------------------------------------------------------
// Confidence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceQuality {
    High,
    Medium,
    Low,
}

impl ConfidenceQuality {
    pub fn from_score(score: u8) -> Self {
        match score {
            s if s >= 80 => ConfidenceQuality::High,
            s if s >= 60 => ConfidenceQuality::Medium,
            _ => ConfidenceQuality::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceQuality::High => "HIGH",
            ConfidenceQuality::Medium => "MEDIUM",
            ConfidenceQuality::Low => "LOW",
        }
    }
}

/// How much the classification of one flight can be trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Confidence {
    pub score: u8,
    pub quality: ConfidenceQuality,
    pub reasons: Vec<String>,
}

/// Score a classification. `weather_age_minutes` is `None` when no radar
/// frame backed the weather sample.
pub fn confidence(
    has_track: bool,
    weather_age_minutes: Option<f64>,
    altitude_ft: f64,
    distance_km: f64,
) -> Confidence {
    let mut score: i32 = 100;
    let mut reasons = Vec::new();

    if !has_track {
        score -= 30;
        reasons.push("no track data".to_string());
    }

    match weather_age_minutes {
        Some(age) if age > 15.0 => {
            score -= 20;
            reasons.push(format!("weather data {age:.0} min old"));
        }
        Some(age) if age > 10.0 => {
            score -= 10;
            reasons.push(format!("weather data {age:.0} min old"));
        }
        Some(_) => {}
        None => {
            score -= 40;
            reasons.push("no radar data".to_string());
        }
    }

    if altitude_ft > 8000.0 {
        score -= 15;
        reasons.push("high altitude".to_string());
    } else if altitude_ft > 5000.0 {
        score -= 10;
        reasons.push("medium altitude".to_string());
    }

    if distance_km > 60.0 {
        score -= 10;
        reasons.push("far from airport".to_string());
    }

    let score = score.max(0) as u8;
    Confidence {
        score,
        quality: ConfidenceQuality::from_score(score),
        reasons,
    }
}

/// Minimum ground speed (m/s) for an ETA to be meaningful.
pub const MIN_ETA_SPEED_MPS: f64 = 10.0;

/// Minutes to cover `distance_km` at the current ground speed.
pub fn eta_minutes(distance_km: f64, ground_speed_mps: Option<f64>) -> Option<f64> {
    match ground_speed_mps {
        Some(v) if v >= MIN_ETA_SPEED_MPS => Some(distance_km / (v * 3.6) * 60.0),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Classification record
// ---------------------------------------------------------------------------

/// Everything derived for one arriving aircraft in one cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightClassification {
    pub state: AircraftState,
    pub position: Position,
    pub altitude_m: f64,
    pub altitude_ft: f64,
    pub ground_speed_kt: Option<f64>,
    /// Flight → reference point.
    pub distance_km: f64,
    /// Flight → reference point.
    pub bearing_deg: f64,
    /// Track vs. bearing; `None` without a track.
    pub heading_deviation_deg: Option<f64>,
    pub wind: WindComponents,
    pub wind_condition: WindCondition,
    pub wind_category: WindCategory,
    pub weather: WeatherSample,
    pub recommended_action: RecommendedAction,
    pub observed_decision: ObservedDecision,
    pub compliance: ComplianceLabel,
    pub avoidance: AvoidanceAssessment,
    pub weather_impact: String,
    pub eta_minutes: Option<f64>,
    pub confidence: Confidence,
}

impl FlightClassification {
    pub fn callsign(&self) -> &str {
        &self.state.callsign
    }

    /// Avoiding by track deviation or by inferred decision.
    pub fn is_avoiding(&self) -> bool {
        self.avoidance.avoiding || self.observed_decision.is_avoidance()
    }
}

/// Result of one cycle, with the counts of what was dropped and why.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleOutcome {
    pub classifications: Vec<FlightClassification>,
    pub seen: usize,
    /// Missing position or altitude.
    pub malformed: usize,
    pub above_ceiling: usize,
    pub not_arriving: usize,
    pub estimator: &'static str,
    pub weather_age_minutes: Option<f64>,
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Stateless pipeline bound to one airport.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    pub profile: AirportProfile,
    pub criteria: ArrivalCriteria,
}

impl Classifier {
    pub fn new(profile: AirportProfile, criteria: ArrivalCriteria) -> Self {
        Classifier { profile, criteria }
    }

    /// Classify one state, or `None` when it is incomplete or not an arrival.
    pub fn classify_state(
        &self,
        state: &AircraftState,
        wind: &WindObservation,
        estimator: &dyn IntensityEstimator,
        weather_age_minutes: Option<f64>,
    ) -> Option<FlightClassification> {
        let (position, altitude_m) = match (state.position, state.baro_altitude_m) {
            (Some(p), Some(a)) => (p, a),
            _ => return None,
        };
        if !is_arrival(state, self.profile.reference, &self.criteria) {
            return None;
        }

        let reference = self.profile.reference;
        let distance = distance_km(position, reference);
        let bearing = bearing_deg(position, reference);
        let deviation = state.track_deg.map(|t| heading_deviation_deg(t, bearing));
        let altitude_ft = meters_to_feet(altitude_m);

        let components = resolve(bearing, wind.direction_deg, wind.speed_mps);
        let condition = WindCondition::from_components(&components);

        let weather = WeatherSample::from_intensity(estimator.estimate(position), estimator.name());
        let action = weather.action();
        let observed = infer_decision(weather.severity, altitude_m, state.vertical_rate_mps);
        let compliance = classify_compliance(action.as_str(), observed);
        let avoidance = assess_deviation(&DeviationInput {
            in_weather: weather.in_weather,
            severity: weather.severity,
            deviation_deg: deviation,
            distance_km: distance,
            altitude_ft,
        });
        let impact = WeatherImpact::new(weather.severity, observed);

        Some(FlightClassification {
            state: state.clone(),
            position,
            altitude_m,
            altitude_ft,
            ground_speed_kt: state.ground_speed_mps.map(mps_to_knots),
            distance_km: distance,
            bearing_deg: bearing,
            heading_deviation_deg: deviation,
            wind: components,
            wind_condition: condition,
            wind_category: condition.category(),
            recommended_action: action,
            observed_decision: observed,
            compliance,
            avoidance,
            weather_impact: impact.label(),
            eta_minutes: eta_minutes(distance, state.ground_speed_mps),
            confidence: confidence(
                state.track_deg.is_some(),
                weather_age_minutes,
                altitude_ft,
                distance,
            ),
            weather,
        })
    }

    /// Classify a whole batch. Output is sorted by distance, nearest first.
    pub fn classify_cycle(
        &self,
        states: &[AircraftState],
        wind: &WindObservation,
        estimator: &dyn IntensityEstimator,
        weather_age_minutes: Option<f64>,
    ) -> CycleOutcome {
        let mut outcome = CycleOutcome {
            seen: states.len(),
            estimator: estimator.name(),
            weather_age_minutes,
            ..CycleOutcome::default()
        };

        for state in states {
            if !state.is_complete() {
                outcome.malformed += 1;
                continue;
            }
            if self.criteria.above_ceiling(state) {
                outcome.above_ceiling += 1;
                continue;
            }
            match self.classify_state(state, wind, estimator, weather_age_minutes) {
                Some(c) => outcome.classifications.push(c),
                None => outcome.not_arriving += 1,
            }
        }

        outcome
            .classifications
            .sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        outcome
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::echo::EchoCategory;

    const BKK: Position = Position::new(13.6811, 100.7475);

    /// Constant intensity everywhere.
    struct Uniform(f64);

    impl IntensityEstimator for Uniform {
        fn estimate(&self, _position: Position) -> f64 {
            self.0
        }

        fn name(&self) -> &'static str {
            "uniform"
        }
    }

    fn make_state(
        icao: &str,
        pos: Option<Position>,
        alt: Option<f64>,
        vr: Option<f64>,
    ) -> AircraftState {
        let mut s = AircraftState::new(icao, Some("THA661"));
        s.position = pos;
        s.baro_altitude_m = alt;
        s.vertical_rate_mps = vr;
        s.ground_speed_mps = Some(80.0);
        s.track_deg = Some(180.0);
        s
    }

    fn north_of(km: f64) -> Position {
        Position::new(BKK.lat + km / 111.195, BKK.lon)
    }

    fn wind_230_10kt() -> WindObservation {
        WindObservation::fallback(0.0)
    }

    #[test]
    fn test_cycle_counts() {
        let states = vec![
            make_state("a", Some(north_of(20.0)), Some(900.0), Some(-3.0)),
            make_state("b", None, Some(900.0), Some(-3.0)),
            make_state("c", Some(north_of(20.0)), None, Some(-3.0)),
            make_state("d", Some(north_of(20.0)), Some(5000.0), Some(-3.0)),
            make_state("e", Some(north_of(120.0)), Some(900.0), Some(-3.0)),
            make_state("f", Some(north_of(5.0)), Some(300.0), Some(-3.0)),
        ];
        let out = Classifier::default().classify_cycle(
            &states,
            &wind_230_10kt(),
            &Uniform(0.0),
            Some(2.0),
        );
        assert_eq!(out.seen, 6);
        assert_eq!(out.malformed, 2);
        assert_eq!(out.above_ceiling, 1);
        assert_eq!(out.not_arriving, 1);
        assert_eq!(out.classifications.len(), 2);
        // Sorted nearest first
        assert_eq!(out.classifications[0].state.icao24, "f");
        assert_eq!(out.estimator, "uniform");
    }

    #[test]
    fn test_flight_geometry_toward_reference() {
        let state = make_state("a", Some(north_of(20.0)), Some(900.0), Some(-3.0));
        let c = Classifier::default()
            .classify_state(&state, &wind_230_10kt(), &Uniform(0.0), Some(0.0))
            .unwrap();
        assert!((c.distance_km - 20.0).abs() < 0.1);
        // North of the field, so the bearing to it is due south
        assert!((c.bearing_deg - 180.0).abs() < 0.01);
        assert!(c.heading_deviation_deg.unwrap() < 0.01);
        assert!((c.altitude_ft - 2952.756).abs() < 0.01);
    }

    #[test]
    fn test_orange_cell_risky_penetration() {
        let state = make_state("a", Some(north_of(20.0)), Some(900.0), Some(-3.0));
        let c = Classifier::default()
            .classify_state(&state, &wind_230_10kt(), &Uniform(42.0), Some(0.0))
            .unwrap();
        assert_eq!(c.weather.category, EchoCategory::Orange);
        assert_eq!(c.recommended_action, RecommendedAction::AvoidCircumnavigate);
        assert_eq!(c.observed_decision, ObservedDecision::ContinuedWithCaution);
        assert_eq!(c.compliance, ComplianceLabel::RiskyPenetration);
        assert_eq!(c.weather_impact, "MODERATE_IMPACT");
        assert!(!c.is_avoiding());
    }

    #[test]
    fn test_headwind_on_bearing() {
        // Approaching from the north-east on bearing 230 into a 230/10 wind
        let bearing_230_start = Position::new(BKK.lat + 0.1157, BKK.lon + 0.1412);
        let mut state = make_state("a", Some(bearing_230_start), Some(900.0), Some(-3.0));
        state.track_deg = None;
        let c = Classifier::default()
            .classify_state(&state, &wind_230_10kt(), &Uniform(0.0), Some(0.0))
            .unwrap();
        assert!((c.bearing_deg - 230.0).abs() < 1.0);
        assert!(c.wind.headwind > 5.0);
        assert_eq!(c.wind_condition, WindCondition::StrongHeadwind);
        assert_eq!(c.wind_category, WindCategory::Headwind);
        assert_eq!(c.heading_deviation_deg, None);
    }

    #[test]
    fn test_confidence_scoring() {
        let c = confidence(true, Some(3.0), 3000.0, 20.0);
        assert_eq!(c.score, 100);
        assert_eq!(c.quality, ConfidenceQuality::High);
        assert!(c.reasons.is_empty());

        let c = confidence(false, Some(12.0), 6000.0, 70.0);
        assert_eq!(c.score, 100 - 30 - 10 - 10 - 10);
        assert_eq!(c.quality, ConfidenceQuality::Low);
        assert_eq!(c.reasons.len(), 4);

        let c = confidence(true, None, 3000.0, 20.0);
        assert_eq!(c.score, 60);
        assert_eq!(c.quality, ConfidenceQuality::Medium);

        let c = confidence(false, None, 9000.0, 70.0);
        assert_eq!(c.score, 5);
        let c = confidence(false, Some(30.0), 9000.0, 70.0);
        assert_eq!(c.score, 25);
    }

    #[test]
    fn test_eta() {
        assert_eq!(eta_minutes(30.0, None), None);
        assert_eq!(eta_minutes(30.0, Some(9.9)), None);
        let eta = eta_minutes(36.0, Some(100.0)).unwrap();
        assert!((eta - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_default_profile() {
        let p = AirportProfile::default();
        assert_eq!(p.code, "BKK");
        assert_eq!(p.metar_station, "VTBS");
        assert!(p.bbox.contains(p.reference));
        assert_eq!(p.zones.len(), 4);
        assert_eq!(p.decayed_zones.len(), 3);
    }
}
