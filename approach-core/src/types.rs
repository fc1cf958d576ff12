//! Shared types, error enum, and unit conversions for approach-core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All errors produced by approach-core.
///
/// The classification kernel itself is total; these cover configuration and
/// file handling around it.
#[derive(Debug, Error)]
pub enum ApproachError {
    #[error("invalid position: lat={lat}, lon={lon}")]
    InvalidPosition { lat: f64, lon: f64 },
    #[error("invalid bounding box: {0}")]
    InvalidBoundingBox(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ApproachError>;

// ---------------------------------------------------------------------------
// Unit conversions
// ---------------------------------------------------------------------------

/// Knots to metres per second.
pub const KT_TO_MPS: f64 = 0.514444;
/// Metres to feet.
pub const M_TO_FT: f64 = 3.28084;
/// Metres per second to knots.
pub const MPS_TO_KTS: f64 = 1.94384;

pub fn knots_to_mps(kt: f64) -> f64 {
    kt * KT_TO_MPS
}

pub fn meters_to_feet(m: f64) -> f64 {
    m * M_TO_FT
}

pub fn mps_to_knots(mps: f64) -> f64 {
    mps * MPS_TO_KTS
}

// ---------------------------------------------------------------------------
// Position / bounding box
// ---------------------------------------------------------------------------

/// WGS84 latitude/longitude in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

impl Position {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Position { lat, lon }
    }

    /// Build a position, rejecting out-of-range coordinates.
    pub fn checked(lat: f64, lon: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(ApproachError::InvalidPosition { lat, lon });
        }
        Ok(Position { lat, lon })
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4},{:.4}", self.lat, self.lon)
    }
}

/// Query box for the aircraft state feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Result<Self> {
        if min_lat >= max_lat || min_lon >= max_lon {
            return Err(ApproachError::InvalidBoundingBox(format!(
                "lat {min_lat}..{max_lat}, lon {min_lon}..{max_lon}"
            )));
        }
        Ok(BoundingBox {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        })
    }

    pub fn contains(&self, p: Position) -> bool {
        (self.min_lat..=self.max_lat).contains(&p.lat)
            && (self.min_lon..=self.max_lon).contains(&p.lon)
    }
}

// ---------------------------------------------------------------------------
// Aircraft state
// ---------------------------------------------------------------------------

/// Callsign used when the feed reports a blank one.
pub const UNKNOWN_CALLSIGN: &str = "Unknown";

/// One aircraft snapshot from the state feed. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AircraftState {
    pub icao24: String,
    pub callsign: String,
    pub position: Option<Position>,
    pub baro_altitude_m: Option<f64>,
    pub ground_speed_mps: Option<f64>,
    pub track_deg: Option<f64>,
    pub vertical_rate_mps: Option<f64>,
}

impl AircraftState {
    pub fn new(icao24: &str, callsign: Option<&str>) -> Self {
        AircraftState {
            icao24: icao24.to_string(),
            callsign: normalize_callsign(callsign),
            position: None,
            baro_altitude_m: None,
            ground_speed_mps: None,
            track_deg: None,
            vertical_rate_mps: None,
        }
    }

    pub fn has_position(&self) -> bool {
        self.position.is_some()
    }

    /// True when the record carries everything the classifiers need.
    pub fn is_complete(&self) -> bool {
        self.position.is_some() && self.baro_altitude_m.is_some()
    }

    pub fn altitude_ft(&self) -> Option<f64> {
        self.baro_altitude_m.map(meters_to_feet)
    }
}

/// Trim a raw callsign; blank or missing becomes [`UNKNOWN_CALLSIGN`].
pub fn normalize_callsign(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(cs) if !cs.is_empty() => cs.to_string(),
        _ => UNKNOWN_CALLSIGN.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Wind observation
// ---------------------------------------------------------------------------

/// Surface wind from the most recent METAR (or the fallback).
///
/// `direction_deg` is 0 for variable or calm wind; `variable` distinguishes
/// the two.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindObservation {
    pub direction_deg: f64,
    pub variable: bool,
    pub speed_mps: f64,
    pub speed_kt: u32,
    pub gust_mps: Option<f64>,
    pub gust_kt: Option<u32>,
    pub timestamp: f64,
    pub report_time: Option<String>,
    pub raw: String,
    pub fallback: bool,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_callsign() {
        assert_eq!(normalize_callsign(Some("THA661  ")), "THA661");
        assert_eq!(normalize_callsign(Some("   ")), UNKNOWN_CALLSIGN);
        assert_eq!(normalize_callsign(None), UNKNOWN_CALLSIGN);
    }

    #[test]
    fn test_unit_conversions() {
        assert!((knots_to_mps(10.0) - 5.14444).abs() < 1e-9);
        assert!((meters_to_feet(3048.0) - 10000.0).abs() < 1.0);
        assert!((mps_to_knots(100.0) - 194.384).abs() < 1e-9);
    }

    #[test]
    fn test_position_checked() {
        assert!(Position::checked(13.68, 100.74).is_ok());
        assert!(Position::checked(91.0, 0.0).is_err());
        assert!(Position::checked(0.0, -181.0).is_err());
    }

    #[test]
    fn test_bounding_box() {
        let bbox = BoundingBox::new(13.1, 14.3, 100.2, 101.3).unwrap();
        assert!(bbox.contains(Position::new(13.68, 100.74)));
        assert!(!bbox.contains(Position::new(15.0, 100.74)));
        assert!(BoundingBox::new(14.3, 13.1, 100.2, 101.3).is_err());
    }

    #[test]
    fn test_is_complete() {
        let mut ac = AircraftState::new("885123", Some("THA661"));
        assert!(!ac.is_complete());
        ac.position = Some(Position::new(13.7, 100.7));
        assert!(!ac.is_complete());
        ac.baro_altitude_m = Some(1000.0);
        assert!(ac.is_complete());
    }
}
