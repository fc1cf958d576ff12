//! approach-feeds: adapters for the upstream aircraft, radar, and METAR feeds.
//!
//! Each feed sits behind an async trait so the monitor can be driven by
//! in-memory fakes in tests. Parsing is split out into pure functions that
//! take the response body as text.

pub mod error;
pub mod metar;
pub mod opensky;
pub mod rainviewer;

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use approach_core::radar::{RadarFrame, RadarPixelSampler, RadarTile, TileCoord};
use approach_core::{AircraftState, BoundingBox, Position, WindObservation};

pub use error::{FeedError, Result};
pub use metar::MetarClient;
pub use opensky::OpenSkyClient;
pub use rainviewer::RainViewerClient;

/// Current time as unix seconds.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Point-in-time aircraft state vectors for a bounding box.
#[async_trait]
pub trait AircraftFeed: Send + Sync {
    async fn fetch_states(&self, bbox: &BoundingBox) -> Result<Vec<AircraftState>>;
}

/// Available radar frames, newest first.
#[async_trait]
pub trait FrameFeed: Send + Sync {
    async fn fetch_frames(&self) -> Result<Vec<RadarFrame>>;
}

/// Decoded radar tiles for a frame.
#[async_trait]
pub trait TileSource: Send + Sync {
    async fn fetch_tile(&self, frame: &RadarFrame, tile: TileCoord) -> Result<RadarTile>;
}

/// Latest surface wind for a station.
#[async_trait]
pub trait WindFeed: Send + Sync {
    async fn fetch_wind(&self, station: &str) -> Result<WindObservation>;
}

/// Fetch every tile needed to sample `positions` from `frame`.
///
/// Tiles that fail to load are skipped with a warning; positions in them
/// sample as 0.
pub async fn load_sampler(
    source: &dyn TileSource,
    frame: &RadarFrame,
    positions: &[Position],
    zoom: u8,
) -> RadarPixelSampler {
    let mut sampler = RadarPixelSampler::new(zoom);
    for coord in RadarPixelSampler::tiles_needed(positions.iter().copied(), zoom) {
        match source.fetch_tile(frame, coord).await {
            Ok(tile) => sampler.insert_tile(coord, tile),
            Err(e) => tracing::warn!(
                x = coord.x,
                y = coord.y,
                zoom = coord.zoom,
                "radar tile unavailable: {e}"
            ),
        }
    }
    sampler
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
