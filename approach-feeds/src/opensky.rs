//! OpenSky Network `/api/states/all` client.
//!
//! The response carries each state vector as a positional JSON array:
//!
//! | index | field |
//! |---|---|
//! | 0 | icao24 |
//! | 1 | callsign |
//! | 5 | longitude |
//! | 6 | latitude |
//! | 7 | barometric altitude (m) |
//! | 9 | velocity (m/s) |
//! | 10 | true track (deg) |
//! | 11 | vertical rate (m/s) |
//!
//! Rows shorter than 12 entries are skipped. Missing numeric fields stay
//! `None`; the arrival filter decides what is usable.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use approach_core::{AircraftState, BoundingBox, Position};

use crate::error::{get_text, Result};
use crate::AircraftFeed;

pub const DEFAULT_URL: &str = "https://opensky-network.org/api/states/all";
const TIMEOUT: Duration = Duration::from_secs(30);
const MIN_ROW_LEN: usize = 12;

#[derive(Debug, Deserialize)]
struct StatesResponse {
    states: Option<Vec<Vec<Value>>>,
}

/// Parse a `/states/all` body into aircraft states.
///
/// A `null` state list is an empty batch.
pub fn parse_states(body: &str) -> Result<Vec<AircraftState>> {
    let resp: StatesResponse = serde_json::from_str(body)?;
    Ok(resp
        .states
        .unwrap_or_default()
        .iter()
        .filter_map(|row| state_from_row(row))
        .collect())
}

/// Convert one positional row. `None` for short rows or a missing icao24.
pub fn state_from_row(row: &[Value]) -> Option<AircraftState> {
    if row.len() < MIN_ROW_LEN {
        return None;
    }
    let icao24 = row[0].as_str()?.trim();
    if icao24.is_empty() {
        return None;
    }

    let mut state = AircraftState::new(icao24, row[1].as_str());
    state.position = match (row[6].as_f64(), row[5].as_f64()) {
        (Some(lat), Some(lon)) => Position::checked(lat, lon).ok(),
        _ => None,
    };
    state.baro_altitude_m = row[7].as_f64();
    state.ground_speed_mps = row[9].as_f64();
    state.track_deg = row[10].as_f64();
    state.vertical_rate_mps = row[11].as_f64();
    Some(state)
}

/// Anonymous OpenSky REST client.
#[derive(Clone)]
pub struct OpenSkyClient {
    url: String,
    client: reqwest::Client,
}

impl OpenSkyClient {
    pub fn new() -> Result<Self> {
        Self::with_url(DEFAULT_URL)
    }

    pub fn with_url(url: &str) -> Result<Self> {
        Ok(OpenSkyClient {
            url: url.to_string(),
            client: reqwest::Client::builder().timeout(TIMEOUT).build()?,
        })
    }
}

#[async_trait]
impl AircraftFeed for OpenSkyClient {
    async fn fetch_states(&self, bbox: &BoundingBox) -> Result<Vec<AircraftState>> {
        let query = [
            ("lamin", bbox.min_lat.to_string()),
            ("lamax", bbox.max_lat.to_string()),
            ("lomin", bbox.min_lon.to_string()),
            ("lomax", bbox.max_lon.to_string()),
        ];
        let body = get_text(&self.client, &self.url, &query).await?;
        let states = parse_states(&body)?;
        tracing::debug!(count = states.len(), "opensky states fetched");
        Ok(states)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
