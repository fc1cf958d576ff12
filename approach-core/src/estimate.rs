//! Precipitation intensity estimators.
//!
//! Three interchangeable strategies produce a dBZ-like value for a position:
//! fixed geographic zones, zones decayed by radar frame age, and radar pixel
//! sampling ([`crate::radar::RadarPixelSampler`]). The echo classifier does
//! not care which one produced the number.

use serde::Serialize;

use crate::geo::distance_km;
use crate::types::Position;

/// Produces a precipitation intensity at a position.
pub trait IntensityEstimator {
    fn estimate(&self, position: Position) -> f64;

    /// Short name recorded on each weather sample.
    fn name(&self) -> &'static str;
}

/// Which estimator the monitor builds each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherSource {
    Simulated,
    Radar,
    Decayed,
}

impl WeatherSource {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simulated" | "fixed" => Some(WeatherSource::Simulated),
            "radar" => Some(WeatherSource::Radar),
            "decayed" | "temporal" => Some(WeatherSource::Decayed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherSource::Simulated => "simulated",
            WeatherSource::Radar => "radar",
            WeatherSource::Decayed => "decayed",
        }
    }
}

// ---------------------------------------------------------------------------
// Zones
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ZoneShape {
    Rect {
        south: f64,
        north: f64,
        west: f64,
        east: f64,
    },
    /// `falloff` scales intensity linearly to zero at the rim.
    Circle {
        center: Position,
        radius_km: f64,
        falloff: bool,
    },
}

/// A named area of constant (or centre-peaked) intensity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherZone {
    pub name: String,
    pub shape: ZoneShape,
    pub intensity_dbz: f64,
}

impl WeatherZone {
    pub fn rect(name: &str, south: f64, north: f64, west: f64, east: f64, dbz: f64) -> Self {
        WeatherZone {
            name: name.to_string(),
            shape: ZoneShape::Rect {
                south,
                north,
                west,
                east,
            },
            intensity_dbz: dbz,
        }
    }

    pub fn circle(name: &str, center: Position, radius_km: f64, dbz: f64, falloff: bool) -> Self {
        WeatherZone {
            name: name.to_string(),
            shape: ZoneShape::Circle {
                center,
                radius_km,
                falloff,
            },
            intensity_dbz: dbz,
        }
    }

    /// Intensity this zone contributes at `p`; `None` outside the zone.
    pub fn intensity_at(&self, p: Position) -> Option<f64> {
        match &self.shape {
            ZoneShape::Rect {
                south,
                north,
                west,
                east,
            } => {
                let inside = (*south..=*north).contains(&p.lat) && (*west..=*east).contains(&p.lon);
                inside.then_some(self.intensity_dbz)
            }
            ZoneShape::Circle {
                center,
                radius_km,
                falloff,
            } => {
                let d = distance_km(p, *center);
                if d > *radius_km {
                    return None;
                }
                if *falloff && *radius_km > 0.0 {
                    Some(self.intensity_dbz * (1.0 - d / radius_km).max(0.0))
                } else {
                    Some(self.intensity_dbz)
                }
            }
        }
    }
}

/// Strongest zone contribution at `p`, with the zone's name.
pub fn strongest_zone(zones: &[WeatherZone], p: Position) -> Option<(&WeatherZone, f64)> {
    zones
        .iter()
        .filter_map(|z| z.intensity_at(p).map(|i| (z, i)))
        .max_by(|a, b| a.1.total_cmp(&b.1))
}

// ---------------------------------------------------------------------------
// Estimators
// ---------------------------------------------------------------------------

/// Constant-intensity zones; 0 outside every zone.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedZoneEstimator {
    pub zones: Vec<WeatherZone>,
}

impl FixedZoneEstimator {
    pub fn new(zones: Vec<WeatherZone>) -> Self {
        FixedZoneEstimator { zones }
    }
}

impl IntensityEstimator for FixedZoneEstimator {
    fn estimate(&self, position: Position) -> f64 {
        strongest_zone(&self.zones, position)
            .map(|(_, i)| i)
            .unwrap_or(0.0)
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}

/// Zone intensities scaled down by the age of the radar frame they stand in for.
#[derive(Debug, Clone, PartialEq)]
pub struct AgeDecayedZoneEstimator {
    pub zones: Vec<WeatherZone>,
    /// Frame age in minutes; `None` when no usable frame exists.
    pub age_minutes: Option<f64>,
}

/// `max(0.1, 1 - age/20)`.
pub fn age_factor(age_minutes: f64) -> f64 {
    (1.0 - age_minutes / 20.0).max(0.1)
}

impl AgeDecayedZoneEstimator {
    pub fn new(zones: Vec<WeatherZone>, age_minutes: Option<f64>) -> Self {
        AgeDecayedZoneEstimator { zones, age_minutes }
    }
}

impl IntensityEstimator for AgeDecayedZoneEstimator {
    fn estimate(&self, position: Position) -> f64 {
        let Some(age) = self.age_minutes else {
            return 0.0;
        };
        let base = strongest_zone(&self.zones, position)
            .map(|(_, i)| i)
            .unwrap_or(0.0);
        base * age_factor(age)
    }

    fn name(&self) -> &'static str {
        "decayed"
    }
}

// ---------------------------------------------------------------------------
// Built-in zone sets (Bangkok area)
// ---------------------------------------------------------------------------

/// Fixed sectors around Suvarnabhumi plus a light-rain disc over the field.
pub fn bangkok_fixed_zones(airport: Position) -> Vec<WeatherZone> {
    vec![
        WeatherZone::rect("North approach", 13.9, 14.2, 100.6, 100.9, 45.0),
        WeatherZone::rect("East sector", 13.6, 13.8, 101.0, 101.2, 55.0),
        WeatherZone::rect("Southwest", 13.3, 13.5, 100.3, 100.6, 25.0),
        WeatherZone::circle("Near airport", airport, 20.0, 15.0, false),
    ]
}

/// Centre-peaked cells used with frame-age decay.
pub fn bangkok_decayed_zones() -> Vec<WeatherZone> {
    vec![
        WeatherZone::circle("Light Rain", Position::new(13.8, 100.4), 25.0, 20.0, true),
        WeatherZone::circle("Moderate Rain", Position::new(14.1, 100.8), 30.0, 35.0, true),
        WeatherZone::circle("Heavy Rain", Position::new(13.4, 101.0), 20.0, 45.0, true),
    ]
}

/// METAR station the built-in zone sets belong to.
pub const BANGKOK_STATION: &str = "VTBS";

/// Built-in `(fixed, decayed)` zone sets for `station`. Only Suvarnabhumi
/// has any; other airports get empty sets.
pub fn builtin_zone_sets(station: &str, airport: Position) -> (Vec<WeatherZone>, Vec<WeatherZone>) {
    if station.eq_ignore_ascii_case(BANGKOK_STATION) {
        (bangkok_fixed_zones(airport), bangkok_decayed_zones())
    } else {
        (Vec::new(), Vec::new())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
