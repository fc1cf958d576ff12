//! Radar frames, Web-Mercator tile math, and colour-ramp to dBZ sampling.
//!
//! Tiles arrive already decoded to RGBA (the feed layer does the PNG work),
//! so everything here stays synchronous and pure.

use std::collections::HashMap;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::estimate::IntensityEstimator;
use crate::types::Position;

/// Default zoom for pixel sampling.
pub const DEFAULT_ZOOM: u8 = 9;
/// Tile edge in pixels.
pub const TILE_SIZE: u32 = 256;
/// Frames further than this from the target time are not used.
pub const MAX_FRAME_OFFSET_MIN: f64 = 15.0;

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// One radar frame descriptor from the frame feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RadarFrame {
    /// Opaque tile path token, e.g. `/v2/radar/1700000000`.
    pub path: String,
    /// Unix seconds.
    pub time: i64,
}

impl RadarFrame {
    /// Age relative to `now` (unix seconds), in minutes. Negative for future frames.
    pub fn age_minutes(&self, now: f64) -> f64 {
        (now - self.time as f64) / 60.0
    }
}

/// Most recent frame.
pub fn latest_frame(frames: &[RadarFrame]) -> Option<&RadarFrame> {
    frames.iter().max_by_key(|f| f.time)
}

/// Frame closest to `target` (unix seconds), if one lies within
/// [`MAX_FRAME_OFFSET_MIN`]. Returns the frame and its offset in minutes.
pub fn select_frame(frames: &[RadarFrame], target: f64) -> Option<(&RadarFrame, f64)> {
    frames
        .iter()
        .map(|f| (f, f.age_minutes(target).abs()))
        .filter(|(_, diff)| *diff <= MAX_FRAME_OFFSET_MIN)
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// How usable the selected frame is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Freshness {
    Current,
    Recent,
    Historical,
    Stale,
    NoData,
}

impl Freshness {
    pub fn from_offset(minutes: Option<f64>) -> Self {
        match minutes {
            None => Freshness::NoData,
            Some(m) if m <= 5.0 => Freshness::Current,
            Some(m) if m <= 10.0 => Freshness::Recent,
            Some(m) if m <= MAX_FRAME_OFFSET_MIN => Freshness::Historical,
            Some(_) => Freshness::Stale,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Freshness::Current => "CURRENT",
            Freshness::Recent => "RECENT",
            Freshness::Historical => "HISTORICAL",
            Freshness::Stale => "STALE",
            Freshness::NoData => "NO_DATA",
        }
    }
}

// ---------------------------------------------------------------------------
// Tile math
// ---------------------------------------------------------------------------

/// Slippy-map tile address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub zoom: u8,
}

/// Fractional tile coordinates of a position.
fn tile_fraction(p: Position, zoom: u8) -> (f64, f64) {
    let n = 2.0_f64.powi(zoom as i32);
    let x = (p.lon + 180.0) / 360.0 * n;
    let lat_rad = p.lat.to_radians();
    let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n;
    (x, y)
}

/// Tile containing `p` at `zoom`.
pub fn tile_for(p: Position, zoom: u8) -> TileCoord {
    let (x, y) = tile_fraction(p, zoom);
    TileCoord {
        x: x.floor().max(0.0) as u32,
        y: y.floor().max(0.0) as u32,
        zoom,
    }
}

/// Pixel offset of `p` inside `tile`. May fall outside `0..TILE_SIZE` when
/// `p` is not in the tile.
pub fn pixel_in_tile(p: Position, tile: TileCoord) -> (i64, i64) {
    let (x, y) = tile_fraction(p, tile.zoom);
    let px = ((x - tile.x as f64) * TILE_SIZE as f64).floor() as i64;
    let py = ((y - tile.y as f64) * TILE_SIZE as f64).floor() as i64;
    (px, py)
}

// ---------------------------------------------------------------------------
// Colour ramp
// ---------------------------------------------------------------------------

/// Approximate dBZ from a radar colour-ramp pixel.
///
/// Inverse of the provider's blue → green → yellow → orange → red → magenta
/// ramp; anything unrecognised is mapped from brightness into 20–40 dBZ.
pub fn rgb_to_dbz(r: u8, g: u8, b: u8) -> f64 {
    let (rf, gf, bf) = (r as f64, g as f64, b as f64);

    if r < 10 && g < 10 && b < 10 {
        return 0.0;
    }

    if b > 200 && r < 100 {
        if g < 150 {
            5.0 + (bf - 200.0) / 55.0 * 10.0
        } else {
            15.0 + (gf - 150.0) / 105.0 * 10.0
        }
    } else if g > 200 && r < 150 && b < 150 {
        25.0 + (gf - 200.0) / 55.0 * 10.0
    } else if r > 200 && g > 200 && b < 100 {
        35.0 + (255.0 - bf) / 155.0 * 5.0
    } else if r > 200 && g > 100 && g < 200 && b < 50 {
        40.0 + (200.0 - gf) / 100.0 * 5.0
    } else if r > 200 && g < 100 && b < 100 {
        45.0 + (100.0 - gf) / 100.0 * 10.0
    } else if r > 200 && b > 150 && g < 100 {
        55.0 + (bf - 150.0) / 105.0 * 10.0
    } else {
        let brightness = (rf + gf + bf) / 3.0;
        (20.0 + brightness / 255.0 * 20.0).min(40.0)
    }
}

// ---------------------------------------------------------------------------
// Decoded tile + sampler
// ---------------------------------------------------------------------------

/// Decoded RGBA tile, row-major, 4 bytes per pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct RadarTile {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl RadarTile {
    /// Returns `None` if the buffer length does not match the dimensions.
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        if rgba.len() != (width as usize) * (height as usize) * 4 {
            return None;
        }
        Some(RadarTile {
            width,
            height,
            rgba,
        })
    }

    pub fn pixel(&self, x: i64, y: i64) -> Option<[u8; 4]> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + x as usize) * 4;
        Some([self.rgba[i], self.rgba[i + 1], self.rgba[i + 2], self.rgba[i + 3]])
    }

    /// dBZ at a pixel. Transparent (alpha < 128) and out-of-tile pixels are 0.
    pub fn dbz_at(&self, x: i64, y: i64) -> f64 {
        match self.pixel(x, y) {
            Some([_, _, _, a]) if a < 128 => 0.0,
            Some([r, g, b, _]) => rgb_to_dbz(r, g, b),
            None => 0.0,
        }
    }
}

/// Samples intensity from decoded radar tiles of one frame.
#[derive(Debug, Clone, Default)]
pub struct RadarPixelSampler {
    pub zoom: u8,
    tiles: HashMap<TileCoord, RadarTile>,
}

impl RadarPixelSampler {
    pub fn new(zoom: u8) -> Self {
        RadarPixelSampler {
            zoom,
            tiles: HashMap::new(),
        }
    }

    pub fn insert_tile(&mut self, coord: TileCoord, tile: RadarTile) {
        self.tiles.insert(coord, tile);
    }

    pub fn has_tile(&self, coord: &TileCoord) -> bool {
        self.tiles.contains_key(coord)
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Distinct tiles needed to sample every position.
    pub fn tiles_needed(positions: impl IntoIterator<Item = Position>, zoom: u8) -> Vec<TileCoord> {
        let mut needed: Vec<TileCoord> = Vec::new();
        for p in positions {
            let t = tile_for(p, zoom);
            if !needed.contains(&t) {
                needed.push(t);
            }
        }
        needed
    }
}

impl IntensityEstimator for RadarPixelSampler {
    fn estimate(&self, position: Position) -> f64 {
        let coord = tile_for(position, self.zoom);
        match self.tiles.get(&coord) {
            Some(tile) => {
                let (px, py) = pixel_in_tile(position, coord);
                tile.dbz_at(px, py)
            }
            None => 0.0,
        }
    }

    fn name(&self) -> &'static str {
        "radar"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const BKK: Position = Position::new(13.6811, 100.7475);

    fn solid_tile(rgba: [u8; 4]) -> RadarTile {
        let px = (TILE_SIZE * TILE_SIZE) as usize;
        RadarTile::new(TILE_SIZE, TILE_SIZE, rgba.repeat(px)).unwrap()
    }

    #[test]
    fn test_tile_for_origin() {
        let t = tile_for(Position::new(0.0, 0.0), 1);
        assert_eq!((t.x, t.y), (1, 1));
        let t = tile_for(Position::new(0.0, -180.0), 0);
        assert_eq!((t.x, t.y), (0, 0));
    }

    #[test]
    fn test_pixel_inside_own_tile() {
        for zoom in [5, 9, 12] {
            let tile = tile_for(BKK, zoom);
            let (px, py) = pixel_in_tile(BKK, tile);
            assert!((0..TILE_SIZE as i64).contains(&px));
            assert!((0..TILE_SIZE as i64).contains(&py));
        }
    }

    #[test]
    fn test_rgb_to_dbz_ramp() {
        assert_eq!(rgb_to_dbz(0, 0, 0), 0.0);
        assert_eq!(rgb_to_dbz(5, 9, 3), 0.0);
        // light blue
        assert!((rgb_to_dbz(0, 100, 255) - 15.0).abs() < 1e-9);
        // green
        assert!((rgb_to_dbz(0, 255, 0) - 35.0).abs() < 1e-9);
        // yellow
        assert!((rgb_to_dbz(255, 255, 0) - (35.0 + 255.0 / 155.0 * 5.0)).abs() < 1e-9);
        assert!((rgb_to_dbz(255, 255, 90) - (35.0 + 165.0 / 155.0 * 5.0)).abs() < 1e-9);
        // orange
        assert!((rgb_to_dbz(255, 150, 0) - 42.5).abs() < 1e-9);
        // red
        assert!((rgb_to_dbz(255, 0, 0) - 55.0).abs() < 1e-9);
        // magenta
        assert!((rgb_to_dbz(255, 0, 255) - 65.0).abs() < 1e-9);
        // grey falls back to brightness
        assert!((rgb_to_dbz(128, 128, 128) - (20.0 + 128.0 / 255.0 * 20.0)).abs() < 1e-9);
    }

    #[test]
    fn test_tile_rejects_bad_buffer() {
        assert!(RadarTile::new(2, 2, vec![0; 15]).is_none());
        assert!(RadarTile::new(2, 2, vec![0; 16]).is_some());
    }

    #[test]
    fn test_transparent_pixel_is_zero() {
        let tile = solid_tile([255, 0, 0, 100]);
        assert_eq!(tile.dbz_at(10, 10), 0.0);
        assert_eq!(tile.dbz_at(-1, 10), 0.0);
        assert_eq!(tile.dbz_at(10, 256), 0.0);
    }

    #[test]
    fn test_sampler() {
        let mut sampler = RadarPixelSampler::new(DEFAULT_ZOOM);
        assert_eq!(sampler.estimate(BKK), 0.0);

        let coord = tile_for(BKK, DEFAULT_ZOOM);
        sampler.insert_tile(coord, solid_tile([255, 0, 0, 255]));
        assert!(sampler.has_tile(&coord));
        assert!((sampler.estimate(BKK) - 55.0).abs() < 1e-9);
        assert_eq!(sampler.name(), "radar");
    }

    #[test]
    fn test_tiles_needed_dedup() {
        let nearby = Position::new(BKK.lat + 0.001, BKK.lon + 0.001);
        let far = Position::new(-33.9, 151.2);
        let needed = RadarPixelSampler::tiles_needed([BKK, nearby, far], DEFAULT_ZOOM);
        assert_eq!(needed.len(), 2);
    }

    #[test]
    fn test_select_frame() {
        let frames = vec![
            RadarFrame { path: "/a".into(), time: 1000 },
            RadarFrame { path: "/b".into(), time: 1600 },
            RadarFrame { path: "/c".into(), time: 2200 },
        ];
        let (f, diff) = select_frame(&frames, 1700.0).unwrap();
        assert_eq!(f.path, "/b");
        assert!((diff - 100.0 / 60.0).abs() < 1e-9);

        assert!(select_frame(&frames, 2200.0 + 16.0 * 60.0).is_none());
        assert_eq!(latest_frame(&frames).unwrap().path, "/c");
        assert!(latest_frame(&[]).is_none());
    }

    #[test]
    fn test_freshness() {
        assert_eq!(Freshness::from_offset(None), Freshness::NoData);
        assert_eq!(Freshness::from_offset(Some(5.0)), Freshness::Current);
        assert_eq!(Freshness::from_offset(Some(7.0)), Freshness::Recent);
        assert_eq!(Freshness::from_offset(Some(15.0)), Freshness::Historical);
        assert_eq!(Freshness::from_offset(Some(15.5)), Freshness::Stale);
    }
}
