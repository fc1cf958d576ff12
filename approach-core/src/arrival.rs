//! Arrival heuristic: is this state vector on approach to the reference point?
//!
//! All altitudes in metres, distances in kilometres, vertical rate in m/s
//! (negative = descending). This is a heuristic: slow-descending overflights
//! inside the radius pass, long shallow finals outside it do not.

use serde::Serialize;

use crate::geo::distance_km;
use crate::types::{AircraftState, Position};

/// 10,000 ft.
pub const ARRIVAL_CEILING_M: f64 = 3048.0;
/// 5,000 ft.
pub const FINAL_APPROACH_CEILING_M: f64 = 1524.0;
pub const APPROACH_RADIUS_KM: f64 = 80.0;
pub const FINAL_APPROACH_RADIUS_KM: f64 = 30.0;
pub const DESCENT_RATE_MPS: f64 = -1.0;

/// Thresholds for [`is_arrival`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArrivalCriteria {
    pub ceiling_m: f64,
    pub radius_km: f64,
    pub descent_rate_mps: f64,
    pub final_ceiling_m: f64,
    pub final_radius_km: f64,
}

impl Default for ArrivalCriteria {
    fn default() -> Self {
        ArrivalCriteria {
            ceiling_m: ARRIVAL_CEILING_M,
            radius_km: APPROACH_RADIUS_KM,
            descent_rate_mps: DESCENT_RATE_MPS,
            final_ceiling_m: FINAL_APPROACH_CEILING_M,
            final_radius_km: FINAL_APPROACH_RADIUS_KM,
        }
    }
}

impl ArrivalCriteria {
    /// Early-exit check: at or above the arrival ceiling, no distance needed.
    pub fn above_ceiling(&self, state: &AircraftState) -> bool {
        matches!(state.baro_altitude_m, Some(alt) if alt >= self.ceiling_m)
    }
}

/// True when `state` looks like an arrival to `reference`.
///
/// Missing position or altitude always yields `false`.
pub fn is_arrival(state: &AircraftState, reference: Position, criteria: &ArrivalCriteria) -> bool {
    let (position, altitude) = match (state.position, state.baro_altitude_m) {
        (Some(p), Some(a)) => (p, a),
        _ => return false,
    };

    if altitude >= criteria.ceiling_m {
        return false;
    }

    let distance = distance_km(position, reference);
    let close = distance < criteria.radius_km;
    let descending = matches!(state.vertical_rate_mps, Some(vr) if vr < criteria.descent_rate_mps);
    let final_approach = altitude < criteria.final_ceiling_m && distance < criteria.final_radius_km;

    close && (descending || final_approach)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const BKK: Position = Position::new(13.6811, 100.7475);

    fn make_ac(position: Option<Position>, alt: Option<f64>, vr: Option<f64>) -> AircraftState {
        let mut ac = AircraftState::new("885123", Some("THA661"));
        ac.position = position;
        ac.baro_altitude_m = alt;
        ac.vertical_rate_mps = vr;
        ac
    }

    /// Point `km` kilometres due north of the reference.
    fn north_of(km: f64) -> Position {
        Position::new(BKK.lat + km / 111.195, BKK.lon)
    }

    #[test]
    fn test_at_reference_descending() {
        let ac = make_ac(Some(BKK), Some(1000.0), Some(-2.0));
        assert!(is_arrival(&ac, BKK, &ArrivalCriteria::default()));
    }

    #[test]
    fn test_too_far() {
        let ac = make_ac(Some(north_of(100.0)), Some(500.0), Some(-5.0));
        assert!(!is_arrival(&ac, BKK, &ArrivalCriteria::default()));
    }

    #[test]
    fn test_missing_fields_never_arrival() {
        let c = ArrivalCriteria::default();
        assert!(!is_arrival(&make_ac(None, Some(500.0), Some(-5.0)), BKK, &c));
        assert!(!is_arrival(&make_ac(Some(BKK), None, Some(-5.0)), BKK, &c));
        assert!(!is_arrival(&make_ac(None, None, None), BKK, &c));
    }

    #[test]
    fn test_above_ceiling() {
        let ac = make_ac(Some(BKK), Some(3048.0), Some(-10.0));
        let c = ArrivalCriteria::default();
        assert!(c.above_ceiling(&ac));
        assert!(!is_arrival(&ac, BKK, &c));
    }

    #[test]
    fn test_level_flight_needs_final_approach() {
        let c = ArrivalCriteria::default();
        // Level at 1200 m, 20 km out: final approach
        assert!(is_arrival(&make_ac(Some(north_of(20.0)), Some(1200.0), Some(0.0)), BKK, &c));
        // Level at 1200 m, 50 km out: neither descending nor final
        assert!(!is_arrival(&make_ac(Some(north_of(50.0)), Some(1200.0), Some(0.0)), BKK, &c));
        // Level at 2000 m, 20 km out: above final ceiling
        assert!(!is_arrival(&make_ac(Some(north_of(20.0)), Some(2000.0), None), BKK, &c));
    }

    #[test]
    fn test_slow_descent_not_descending() {
        let c = ArrivalCriteria::default();
        let ac = make_ac(Some(north_of(50.0)), Some(2500.0), Some(-1.0));
        assert!(!is_arrival(&ac, BKK, &c));
        let ac = make_ac(Some(north_of(50.0)), Some(2500.0), Some(-1.5));
        assert!(is_arrival(&ac, BKK, &c));
    }
}
