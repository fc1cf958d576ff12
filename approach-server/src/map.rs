//! Map output: classified flights as markers plus weather-zone overlays.
//!
//! [`MapRenderer`] is the seam; [`GeoJsonRenderer`] writes a GeoJSON
//! FeatureCollection that any slippy-map frontend can draw.

use serde::Serialize;
use serde_json::{json, Value};

use approach_core::classify::ConfidenceQuality;
use approach_core::estimate::{WeatherZone, ZoneShape};
use approach_core::{EchoCategory, FlightClassification, Position};

// ---------------------------------------------------------------------------
// Map primitives
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub position: Position,
    pub label: String,
    pub color: &'static str,
    pub category: EchoCategory,
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MapOverlay {
    Rect {
        name: String,
        south: f64,
        north: f64,
        west: f64,
        east: f64,
        color: &'static str,
    },
    Circle {
        name: String,
        center: Position,
        radius_km: f64,
        color: &'static str,
    },
    /// Flight-to-airport line.
    Line {
        from: Position,
        to: Position,
        color: &'static str,
        opacity: f64,
    },
}

/// Draws markers and overlays into some output format.
pub trait MapRenderer: Send + Sync {
    fn render(&self, markers: &[MapMarker], overlays: &[MapOverlay]) -> String;

    /// File extension for written maps.
    fn extension(&self) -> &'static str;
}

pub fn category_color(category: EchoCategory) -> &'static str {
    match category {
        EchoCategory::Clear => "blue",
        EchoCategory::Green => "green",
        EchoCategory::Yellow => "yellow",
        EchoCategory::Orange => "orange",
        EchoCategory::Red => "red",
        EchoCategory::Magenta => "magenta",
    }
}

fn quality_opacity(quality: ConfidenceQuality) -> f64 {
    match quality {
        ConfidenceQuality::High => 1.0,
        ConfidenceQuality::Medium => 0.7,
        ConfidenceQuality::Low => 0.4,
    }
}

/// One marker per classified flight.
pub fn flight_markers(classifications: &[FlightClassification]) -> Vec<MapMarker> {
    classifications
        .iter()
        .map(|c| MapMarker {
            position: c.position,
            label: format!(
                "{} - {} - {:.0}dBZ - {}",
                c.callsign(),
                c.wind_category,
                c.weather.intensity_dbz,
                c.compliance
            ),
            color: category_color(c.weather.category),
            category: c.weather.category,
            opacity: quality_opacity(c.confidence.quality),
        })
        .collect()
}

/// Lines from each flight to the reference point: red when avoiding with
/// usable confidence, orange in weather, blue otherwise.
pub fn approach_lines(
    classifications: &[FlightClassification],
    reference: Position,
) -> Vec<MapOverlay> {
    classifications
        .iter()
        .map(|c| {
            let color = if c.is_avoiding() && c.confidence.quality != ConfidenceQuality::Low {
                "red"
            } else if c.weather.in_weather {
                "orange"
            } else {
                "blue"
            };
            MapOverlay::Line {
                from: c.position,
                to: reference,
                color,
                opacity: quality_opacity(c.confidence.quality) * 0.6,
            }
        })
        .collect()
}

/// Zone overlays coloured by the category of their peak intensity.
pub fn zone_overlays(zones: &[WeatherZone]) -> Vec<MapOverlay> {
    zones
        .iter()
        .map(|z| {
            let color = category_color(approach_core::echo::classify(z.intensity_dbz).category);
            match &z.shape {
                ZoneShape::Rect {
                    south,
                    north,
                    west,
                    east,
                } => MapOverlay::Rect {
                    name: z.name.clone(),
                    south: *south,
                    north: *north,
                    west: *west,
                    east: *east,
                    color,
                },
                ZoneShape::Circle {
                    center, radius_km, ..
                } => MapOverlay::Circle {
                    name: z.name.clone(),
                    center: *center,
                    radius_km: *radius_km,
                    color,
                },
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// GeoJSON
// ---------------------------------------------------------------------------

/// GeoJSON FeatureCollection writer. Circles become Point features with a
/// `radius_km` property.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoJsonRenderer;

impl GeoJsonRenderer {
    pub fn to_value(&self, markers: &[MapMarker], overlays: &[MapOverlay]) -> Value {
        let mut features: Vec<Value> = overlays.iter().map(overlay_feature).collect();
        features.extend(markers.iter().map(marker_feature));
        json!({
            "type": "FeatureCollection",
            "features": features,
        })
    }
}

impl MapRenderer for GeoJsonRenderer {
    fn render(&self, markers: &[MapMarker], overlays: &[MapOverlay]) -> String {
        self.to_value(markers, overlays).to_string()
    }

    fn extension(&self) -> &'static str {
        "geojson"
    }
}

/// GeoJSON positions are `[lon, lat]`.
fn coord(p: Position) -> Value {
    json!([p.lon, p.lat])
}

fn marker_feature(m: &MapMarker) -> Value {
    json!({
        "type": "Feature",
        "geometry": { "type": "Point", "coordinates": coord(m.position) },
        "properties": {
            "kind": "flight",
            "label": m.label,
            "color": m.color,
            "category": m.category,
            "opacity": m.opacity,
        },
    })
}

fn overlay_feature(o: &MapOverlay) -> Value {
    match o {
        MapOverlay::Rect {
            name,
            south,
            north,
            west,
            east,
            color,
        } => json!({
            "type": "Feature",
            "geometry": {
                "type": "Polygon",
                "coordinates": [[
                    [west, south], [east, south], [east, north], [west, north], [west, south]
                ]],
            },
            "properties": { "kind": "zone", "name": name, "color": color },
        }),
        MapOverlay::Circle {
            name,
            center,
            radius_km,
            color,
        } => json!({
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": coord(*center) },
            "properties": { "kind": "zone", "name": name, "color": color, "radius_km": radius_km },
        }),
        MapOverlay::Line {
            from,
            to,
            color,
            opacity,
        } => json!({
            "type": "Feature",
            "geometry": { "type": "LineString", "coordinates": [coord(*from), coord(*to)] },
            "properties": { "kind": "approach", "color": color, "opacity": opacity },
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
