//! Per-cycle reports and the writers that persist them.
//!
//! A [`CycleReport`] is the full record of one monitoring cycle. Writers
//! implement [`ReportWriter`]; the monitor hands every report to each of
//! them in turn and logs (but survives) individual failures.

use std::fmt::Write as _;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use approach_core::estimate::WeatherZone;
use approach_core::radar::{Freshness, RadarFrame};
use approach_core::{
    AirportProfile, AvoidanceStats, CycleOutcome, Position, WeatherSource, WindObservation,
};

use crate::map::{approach_lines, flight_markers, zone_overlays, GeoJsonRenderer, MapRenderer};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Sql(#[from] rusqlite::Error),
}

/// Everything produced by one cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub id: String,
    /// Unix seconds at the start of the cycle.
    pub timestamp: f64,
    pub airport: String,
    pub reference: Position,
    pub wind: WindObservation,
    pub weather_source: WeatherSource,
    pub frame: Option<RadarFrame>,
    pub freshness: Freshness,
    pub outcome: CycleOutcome,
    pub stats: AvoidanceStats,
}

impl CycleReport {
    pub fn new(
        profile: &AirportProfile,
        timestamp: f64,
        wind: WindObservation,
        weather_source: WeatherSource,
        frame: Option<RadarFrame>,
        outcome: CycleOutcome,
    ) -> Self {
        let freshness =
            Freshness::from_offset(frame.as_ref().map(|f| f.age_minutes(timestamp).abs()));
        let stats = AvoidanceStats::from_cycle(&outcome.classifications);
        CycleReport {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp,
            airport: profile.code.clone(),
            reference: profile.reference,
            wind,
            weather_source,
            frame,
            freshness,
            outcome,
            stats,
        }
    }

    /// Used in file names.
    pub fn stamp(&self) -> String {
        format!("{}_{}", self.timestamp as i64, &self.id[..8.min(self.id.len())])
    }

    pub fn arrivals(&self) -> usize {
        self.outcome.classifications.len()
    }
}

/// Sink for cycle reports.
pub trait ReportWriter: Send {
    fn write(&mut self, report: &CycleReport) -> Result<(), ReportError>;

    /// Shown in logs when a write fails.
    fn name(&self) -> &'static str;
}

/// Human-readable summary of one cycle.
pub fn summary_text(report: &CycleReport) -> String {
    let mut out = String::new();
    let o = &report.outcome;
    let wind = &report.wind;

    let _ = writeln!(out, "Arrival weather report - {}", report.airport);
    let _ = writeln!(out, "Cycle:   {}", report.id);
    let _ = writeln!(out, "Time:    {:.0} (unix)", report.timestamp);
    let direction = if wind.variable {
        "VRB".to_string()
    } else {
        format!("{:03.0}", wind.direction_deg)
    };
    let _ = write!(out, "Wind:    {direction}/{} kt", wind.speed_kt);
    if let Some(g) = wind.gust_kt {
        let _ = write!(out, " gusting {g} kt");
    }
    if wind.fallback {
        let _ = write!(out, " (fallback)");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "METAR:   {}", wind.raw);
    let _ = writeln!(
        out,
        "Weather: {} ({}), radar {}",
        report.weather_source.as_str(),
        o.estimator,
        report.freshness.as_str()
    );
    let _ = writeln!(
        out,
        "Flights: {} seen, {} arriving, {} malformed, {} above ceiling, {} not arriving",
        o.seen,
        o.classifications.len(),
        o.malformed,
        o.above_ceiling,
        o.not_arriving
    );

    let _ = writeln!(out, "\nBy wind category:");
    for row in report.stats.rows() {
        let _ = writeln!(
            out,
            "  {:<10} {:>3} flights, {:>3} avoiding ({:.1}%), {:>3} in weather ({:.1}%)",
            row.category.as_str(),
            row.total,
            row.avoiding,
            row.avoiding_pct,
            row.in_weather,
            row.in_weather_pct
        );
    }

    if !report.stats.by_compliance.is_empty() {
        let _ = writeln!(out, "\nCompliance:");
        for (label, n) in &report.stats.by_compliance {
            let _ = writeln!(out, "  {:<40} {n}", label.as_str());
        }
    }

    let avoiding: Vec<_> = o.classifications.iter().filter(|c| c.is_avoiding()).collect();
    if !avoiding.is_empty() {
        let _ = writeln!(out, "\nAvoiding:");
        for c in avoiding {
            let reason = c.avoidance.reason.as_deref().unwrap_or(c.observed_decision.as_str());
            let _ = writeln!(
                out,
                "  {:<8} {:>5.1} km {:>6.0} ft  {}  {}",
                c.callsign(),
                c.distance_km,
                c.altitude_ft,
                c.weather.category,
                reason
            );
        }
    }
    out
}

// ---------------------------------------------------------------------------
// File writer
// ---------------------------------------------------------------------------

/// Writes `cycle_<stamp>.json`, `summary_<stamp>.txt`, a map file, and
/// refreshes `latest.json` in one directory.
pub struct JsonReportWriter {
    dir: PathBuf,
    zones: Vec<WeatherZone>,
    renderer: Box<dyn MapRenderer>,
}

impl JsonReportWriter {
    pub fn new(dir: impl Into<PathBuf>, zones: Vec<WeatherZone>) -> Self {
        Self::with_renderer(dir, zones, Box::new(GeoJsonRenderer))
    }

    pub fn with_renderer(
        dir: impl Into<PathBuf>,
        zones: Vec<WeatherZone>,
        renderer: Box<dyn MapRenderer>,
    ) -> Self {
        JsonReportWriter {
            dir: dir.into(),
            zones,
            renderer,
        }
    }

    fn render_map(&self, report: &CycleReport) -> String {
        let classifications = &report.outcome.classifications;
        let mut overlays = zone_overlays(&self.zones);
        overlays.extend(approach_lines(classifications, report.reference));
        self.renderer.render(&flight_markers(classifications), &overlays)
    }
}

impl ReportWriter for JsonReportWriter {
    fn write(&mut self, report: &CycleReport) -> Result<(), ReportError> {
        std::fs::create_dir_all(&self.dir)?;
        let stamp = report.stamp();
        let json = serde_json::to_string_pretty(report)?;

        std::fs::write(self.dir.join(format!("cycle_{stamp}.json")), &json)?;
        std::fs::write(self.dir.join("latest.json"), &json)?;
        std::fs::write(self.dir.join(format!("summary_{stamp}.txt")), summary_text(report))?;
        std::fs::write(
            self.dir.join(format!("map_{stamp}.{}", self.renderer.extension())),
            self.render_map(report),
        )?;

        tracing::debug!(dir = %self.dir.display(), %stamp, "cycle report written");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approach_core::estimate::FixedZoneEstimator;
    use approach_core::{AircraftState, Classifier};

    /// A report with one arrival inside the North approach zone (45 dBZ) and
    /// one clear of weather near the field.
    pub(crate) fn sample_report() -> CycleReport {
        let profile = AirportProfile::suvarnabhumi();
        let mut in_cell = AircraftState::new("885123", Some("THA661"));
        in_cell.position = Some(Position::new(14.0, 100.75));
        in_cell.baro_altitude_m = Some(900.0);
        in_cell.vertical_rate_mps = Some(-3.0);
        in_cell.track_deg = Some(180.0);
        in_cell.ground_speed_mps = Some(90.0);

        let mut clear = AircraftState::new("8851aa", Some("AIQ3021"));
        clear.position = Some(Position::new(13.45, 100.95));
        clear.baro_altitude_m = Some(600.0);
        clear.vertical_rate_mps = Some(-2.0);

        let classifier = Classifier::new(profile.clone(), Default::default());
        let estimator = FixedZoneEstimator::new(profile.zones.clone());
        let wind = WindObservation::fallback(1_700_000_000.0);
        let outcome = classifier.classify_cycle(&[in_cell, clear], &wind, &estimator, None);
        CycleReport::new(&profile, 1_700_000_000.0, wind, WeatherSource::Simulated, None, outcome)
    }

    #[test]
    fn test_report_fields() {
        let r = sample_report();
        assert_eq!(r.airport, "BKK");
        assert_eq!(r.arrivals(), 2);
        assert_eq!(r.freshness, Freshness::NoData);
        assert_eq!(r.stats.flights, 2);
        assert_eq!(r.id.len(), 36);
        assert!(r.stamp().starts_with("1700000000_"));
    }

    #[test]
    fn test_freshness_from_frame() {
        let profile = AirportProfile::suvarnabhumi();
        let frame = RadarFrame {
            path: "/v2/radar/1699999700".into(),
            time: 1_699_999_700,
        };
        let r = CycleReport::new(
            &profile,
            1_700_000_000.0,
            WindObservation::fallback(0.0),
            WeatherSource::Radar,
            Some(frame),
            CycleOutcome::default(),
        );
        assert_eq!(r.freshness, Freshness::Current);
    }

    #[test]
    fn test_summary_text() {
        let text = summary_text(&sample_report());
        assert!(text.contains("Arrival weather report - BKK"));
        assert!(text.contains("Wind:    230/10 kt (fallback)"));
        assert!(text.contains("2 seen, 2 arriving"));
        assert!(text.contains("HEADWIND"));
        assert!(text.contains("Compliance:"));
    }

    #[test]
    fn test_json_writer_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("reports");
        let report = sample_report();
        let mut writer = JsonReportWriter::new(&out, AirportProfile::suvarnabhumi().zones);
        writer.write(&report).unwrap();

        let stamp = report.stamp();
        assert!(out.join(format!("cycle_{stamp}.json")).exists());
        assert!(out.join(format!("summary_{stamp}.txt")).exists());
        assert!(out.join(format!("map_{stamp}.geojson")).exists());

        let latest = std::fs::read_to_string(out.join("latest.json")).unwrap();
        let latest: serde_json::Value = serde_json::from_str(&latest).unwrap();
        assert_eq!(latest["id"], report.id.as_str());
        assert_eq!(latest["outcome"]["classifications"].as_array().unwrap().len(), 2);

        let map = std::fs::read_to_string(out.join(format!("map_{stamp}.geojson"))).unwrap();
        let map: serde_json::Value = serde_json::from_str(&map).unwrap();
        // 4 zones + 2 approach lines + 2 markers
        assert_eq!(map["features"].as_array().unwrap().len(), 8);
    }
}
