//! RainViewer radar frames and tiles.
//!
//! Frames come from `weather-maps.json` (`radar.past[] = {time, path}`).
//! Tiles are 256 px PNGs at `{host}{path}/256/{z}/{x}/{y}/2/1_1.png`
//! (colour scheme 2, smoothed, snow shown) and are decoded to RGBA here so
//! the sampler in approach-core never sees image bytes.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;

use approach_core::radar::{RadarFrame, RadarTile, TileCoord};

use crate::error::{get_text, FeedError, Result};
use crate::{unix_now, FrameFeed, TileSource};

pub const MAPS_URL: &str = "https://api.rainviewer.com/public/weather-maps.json";
pub const TILE_HOST: &str = "https://tilecache.rainviewer.com";
const MAPS_TIMEOUT: Duration = Duration::from_secs(30);
const TILE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct WeatherMaps {
    #[serde(default)]
    radar: RadarSection,
}

#[derive(Debug, Default, Deserialize)]
struct RadarSection {
    #[serde(default)]
    past: Vec<RadarFrame>,
}

/// Parse `weather-maps.json`, keeping frames from the last `hours` before
/// `now` (unix seconds), newest first.
pub fn parse_frames(body: &str, now: i64, hours: u32) -> Result<Vec<RadarFrame>> {
    let maps: WeatherMaps = serde_json::from_str(body)?;
    let cutoff = now - i64::from(hours) * 3600;
    let mut frames: Vec<RadarFrame> = maps
        .radar
        .past
        .into_iter()
        .filter(|f| f.time >= cutoff)
        .collect();
    frames.sort_by(|a, b| b.time.cmp(&a.time));
    Ok(frames)
}

/// Tile URL for a frame path.
pub fn tile_url(host: &str, frame: &RadarFrame, tile: TileCoord) -> String {
    format!(
        "{host}{}/256/{}/{}/{}/2/1_1.png",
        frame.path, tile.zoom, tile.x, tile.y
    )
}

/// Decode PNG bytes into an RGBA tile.
pub fn decode_tile(bytes: &[u8]) -> Result<RadarTile> {
    let img = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = img.dimensions();
    RadarTile::new(width, height, img.into_raw())
        .ok_or_else(|| FeedError::Decode(format!("bad RGBA buffer for {width}x{height} tile")))
}

/// Frame list and tile client with a per-(path, tile) decode cache.
pub struct RainViewerClient {
    maps_url: String,
    tile_host: String,
    hours: u32,
    client: reqwest::Client,
    tiles: Mutex<HashMap<(String, TileCoord), RadarTile>>,
}

impl RainViewerClient {
    pub fn new(hours: u32) -> Result<Self> {
        Self::with_urls(MAPS_URL, TILE_HOST, hours)
    }

    pub fn with_urls(maps_url: &str, tile_host: &str, hours: u32) -> Result<Self> {
        Ok(RainViewerClient {
            maps_url: maps_url.to_string(),
            tile_host: tile_host.to_string(),
            hours,
            client: reqwest::Client::builder().timeout(MAPS_TIMEOUT).build()?,
            tiles: Mutex::new(HashMap::new()),
        })
    }

    /// Drop cached tiles for frames not in `keep`.
    pub async fn retain_frames(&self, keep: &[RadarFrame]) {
        let mut tiles = self.tiles.lock().await;
        tiles.retain(|(path, _), _| keep.iter().any(|f| &f.path == path));
    }

    pub async fn cached_tiles(&self) -> usize {
        self.tiles.lock().await.len()
    }
}

#[async_trait]
impl FrameFeed for RainViewerClient {
    async fn fetch_frames(&self) -> Result<Vec<RadarFrame>> {
        let body = get_text(&self.client, &self.maps_url, &[]).await?;
        let frames = parse_frames(&body, unix_now(), self.hours)?;
        self.retain_frames(&frames).await;
        tracing::debug!(count = frames.len(), "radar frames fetched");
        Ok(frames)
    }
}

#[async_trait]
impl TileSource for RainViewerClient {
    async fn fetch_tile(&self, frame: &RadarFrame, tile: TileCoord) -> Result<RadarTile> {
        let key = (frame.path.clone(), tile);
        if let Some(cached) = self.tiles.lock().await.get(&key) {
            return Ok(cached.clone());
        }

        let url = tile_url(&self.tile_host, frame, tile);
        let resp = self.client.get(&url).timeout(TILE_TIMEOUT).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                url,
                status: status.as_u16(),
            });
        }
        let decoded = decode_tile(&resp.bytes().await?)?;
        self.tiles.lock().await.insert(key, decoded.clone());
        Ok(decoded)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
