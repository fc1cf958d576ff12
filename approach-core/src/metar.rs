//! METAR surface-wind group extraction.
//!
//! Only the wind group is read: `dddffKT`, `dddffGggKT`, `VRBffKT`, with two
//! or three digit speeds. Everything else in the report is kept verbatim in
//! [`WindObservation::raw`] for display.

use crate::types::{knots_to_mps, WindObservation};

/// Raw text stored on the fallback observation.
pub const NO_METAR: &str = "NO METAR DATA";

/// Fallback wind when no usable report is available: 230 deg at 10 kt.
pub const FALLBACK_DIRECTION_DEG: u16 = 230;
pub const FALLBACK_SPEED_KT: u32 = 10;

/// Wind group as reported, in knots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetarWind {
    /// `None` for `VRB`.
    pub direction_deg: Option<u16>,
    pub speed_kt: u32,
    pub gust_kt: Option<u32>,
}

impl MetarWind {
    pub fn calm() -> Self {
        MetarWind {
            direction_deg: Some(0),
            speed_kt: 0,
            gust_kt: None,
        }
    }
}

/// Find and parse the wind group in a raw METAR.
///
/// Returns `None` when no wind group is present and the report does not
/// say `CALM`.
pub fn parse_wind(raw: &str) -> Option<MetarWind> {
    for token in raw.split_whitespace() {
        if let Some(wind) = parse_wind_token(token) {
            return Some(wind);
        }
    }
    if raw.contains("CALM") || raw.contains("00000KT") {
        return Some(MetarWind::calm());
    }
    None
}

fn parse_wind_token(token: &str) -> Option<MetarWind> {
    let body = token.strip_suffix("KT")?;
    if body.len() < 5 {
        return None;
    }

    let (dir_part, rest) = body.split_at(3);
    let direction_deg = if dir_part == "VRB" {
        None
    } else if all_digits(dir_part) {
        Some(dir_part.parse::<u16>().ok()?)
    } else {
        return None;
    };

    let (speed_part, gust_part) = match rest.split_once('G') {
        Some((s, g)) => (s, Some(g)),
        None => (rest, None),
    };
    if !is_speed(speed_part) {
        return None;
    }
    let speed_kt = speed_part.parse::<u32>().ok()?;

    let gust_kt = match gust_part {
        Some(g) if is_speed(g) => Some(g.parse::<u32>().ok()?),
        Some(_) => return None,
        None => None,
    };

    Some(MetarWind {
        direction_deg,
        speed_kt,
        gust_kt,
    })
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_speed(s: &str) -> bool {
    (s.len() == 2 || s.len() == 3) && all_digits(s)
}

// ---------------------------------------------------------------------------
// Observation builders
// ---------------------------------------------------------------------------

impl WindObservation {
    /// Convert a parsed wind group into an observation (knots → m/s).
    pub fn from_metar(
        wind: MetarWind,
        raw: &str,
        report_time: Option<String>,
        timestamp: f64,
    ) -> Self {
        WindObservation {
            direction_deg: wind.direction_deg.map(f64::from).unwrap_or(0.0),
            variable: wind.direction_deg.is_none(),
            speed_mps: knots_to_mps(wind.speed_kt as f64),
            speed_kt: wind.speed_kt,
            gust_mps: wind.gust_kt.map(|g| knots_to_mps(g as f64)),
            gust_kt: wind.gust_kt,
            timestamp,
            report_time,
            raw: raw.to_string(),
            fallback: false,
        }
    }

    /// Parse a raw report, or `None` if it has no usable wind group.
    pub fn parse(raw: &str, report_time: Option<String>, timestamp: f64) -> Option<Self> {
        parse_wind(raw).map(|w| Self::from_metar(w, raw, report_time, timestamp))
    }

    /// Default wind used when the METAR feed is unavailable or unparseable.
    pub fn fallback(timestamp: f64) -> Self {
        WindObservation {
            direction_deg: FALLBACK_DIRECTION_DEG as f64,
            variable: false,
            speed_mps: knots_to_mps(FALLBACK_SPEED_KT as f64),
            speed_kt: FALLBACK_SPEED_KT,
            gust_mps: None,
            gust_kt: None,
            timestamp,
            report_time: None,
            raw: NO_METAR.to_string(),
            fallback: true,
        }
    }

    /// Parse a raw report, falling back to the default wind on failure.
    pub fn parse_or_fallback(raw: &str, report_time: Option<String>, timestamp: f64) -> Self {
        Self::parse(raw, report_time, timestamp).unwrap_or_else(|| Self::fallback(timestamp))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
