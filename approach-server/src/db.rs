//! SQLite history: WAL mode, one row per cycle and one per classified flight.
//!
//! Schema: cycles, classifications. Classifications reference their cycle by
//! the report id, so a whole cycle can be read back for the history API.

use rusqlite::{params, Connection, Result as SqlResult};
use serde::Serialize;
use std::path::Path;

use crate::report::{CycleReport, ReportError, ReportWriter};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cycles (
    id TEXT PRIMARY KEY,
    timestamp REAL NOT NULL,
    airport TEXT NOT NULL,
    wind_direction_deg REAL,
    wind_speed_kt INTEGER,
    wind_gust_kt INTEGER,
    wind_fallback INTEGER DEFAULT 0,
    metar TEXT,
    weather_source TEXT NOT NULL,
    estimator TEXT NOT NULL,
    frame_time INTEGER,
    freshness TEXT NOT NULL,
    seen INTEGER DEFAULT 0,
    arrivals INTEGER DEFAULT 0,
    malformed INTEGER DEFAULT 0,
    above_ceiling INTEGER DEFAULT 0,
    not_arriving INTEGER DEFAULT 0,
    avoiding INTEGER DEFAULT 0
);

CREATE TABLE IF NOT EXISTS classifications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    cycle_id TEXT NOT NULL REFERENCES cycles(id),
    icao24 TEXT NOT NULL,
    callsign TEXT,
    lat REAL NOT NULL,
    lon REAL NOT NULL,
    altitude_ft REAL NOT NULL,
    distance_km REAL NOT NULL,
    bearing_deg REAL NOT NULL,
    heading_deviation_deg REAL,
    headwind_mps REAL,
    crosswind_mps REAL,
    wind_category TEXT NOT NULL,
    intensity_dbz REAL NOT NULL,
    echo_category TEXT NOT NULL,
    recommended_action TEXT NOT NULL,
    observed_decision TEXT NOT NULL,
    compliance TEXT NOT NULL,
    avoiding INTEGER DEFAULT 0,
    in_weather INTEGER DEFAULT 0,
    avoidance_reason TEXT,
    confidence INTEGER,
    timestamp REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cycles_timestamp ON cycles(timestamp);
CREATE INDEX IF NOT EXISTS idx_classifications_cycle ON classifications(cycle_id);
CREATE INDEX IF NOT EXISTS idx_classifications_icao ON classifications(icao24);
"#;

/// SQLite database for cycle history.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create a database at the given path.
    pub fn open(path: &str) -> SqlResult<Self> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            // Ensure parent directory exists
            if let Some(parent) = Path::new(path).parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            Connection::open(path)?
        };

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Database { conn })
    }

    /// Open in-memory database (for testing).
    pub fn open_memory() -> SqlResult<Self> {
        Self::open(":memory:")
    }

    /// Store a cycle and all of its classifications in one transaction.
    pub fn record_cycle(&mut self, report: &CycleReport) -> SqlResult<()> {
        let o = &report.outcome;
        let avoiding = o.classifications.iter().filter(|c| c.is_avoiding()).count();

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO cycles
             (id, timestamp, airport, wind_direction_deg, wind_speed_kt, wind_gust_kt, wind_fallback,
              metar, weather_source, estimator, frame_time, freshness,
              seen, arrivals, malformed, above_ceiling, not_arriving, avoiding)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            params![
                report.id,
                report.timestamp,
                report.airport,
                report.wind.direction_deg,
                report.wind.speed_kt,
                report.wind.gust_kt,
                report.wind.fallback as i32,
                report.wind.raw,
                report.weather_source.as_str(),
                o.estimator,
                report.frame.as_ref().map(|f| f.time),
                report.freshness.as_str(),
                o.seen as i64,
                o.classifications.len() as i64,
                o.malformed as i64,
                o.above_ceiling as i64,
                o.not_arriving as i64,
                avoiding as i64,
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO classifications
                 (cycle_id, icao24, callsign, lat, lon, altitude_ft, distance_km, bearing_deg,
                  heading_deviation_deg, headwind_mps, crosswind_mps, wind_category, intensity_dbz,
                  echo_category, recommended_action, observed_decision, compliance, avoiding,
                  in_weather, avoidance_reason, confidence, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
                         ?18, ?19, ?20, ?21, ?22)",
            )?;
            for c in &o.classifications {
                stmt.execute(params![
                    report.id,
                    c.state.icao24,
                    c.callsign(),
                    c.position.lat,
                    c.position.lon,
                    c.altitude_ft,
                    c.distance_km,
                    c.bearing_deg,
                    c.heading_deviation_deg,
                    c.wind.headwind,
                    c.wind.crosswind,
                    c.wind_category.as_str(),
                    c.weather.intensity_dbz,
                    c.weather.category.as_str(),
                    c.recommended_action.as_str(),
                    c.observed_decision.as_str(),
                    c.compliance.as_str(),
                    c.is_avoiding() as i32,
                    c.weather.in_weather as i32,
                    c.avoidance.reason,
                    c.confidence.score,
                    report.timestamp,
                ])?;
            }
        }
        tx.commit()
    }

    /// Most recent cycles first.
    pub fn recent_cycles(&self, limit: i64) -> SqlResult<Vec<CycleRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp, airport, wind_direction_deg, wind_speed_kt, wind_fallback,
                    weather_source, estimator, freshness, seen, arrivals, avoiding
             FROM cycles ORDER BY timestamp DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |r| {
            Ok(CycleRow {
                id: r.get(0)?,
                timestamp: r.get(1)?,
                airport: r.get(2)?,
                wind_direction_deg: r.get(3)?,
                wind_speed_kt: r.get(4)?,
                wind_fallback: r.get::<_, Option<i32>>(5)?.unwrap_or(0) != 0,
                weather_source: r.get(6)?,
                estimator: r.get(7)?,
                freshness: r.get(8)?,
                seen: r.get(9)?,
                arrivals: r.get(10)?,
                avoiding: r.get(11)?,
            })
        })?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Classifications of one cycle, nearest first.
    pub fn classifications_for(&self, cycle_id: &str) -> SqlResult<Vec<ClassificationRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT icao24, callsign, lat, lon, altitude_ft, distance_km, wind_category,
                    intensity_dbz, echo_category, observed_decision, compliance, avoiding,
                    avoidance_reason, confidence
             FROM classifications WHERE cycle_id = ?1 ORDER BY distance_km ASC",
        )?;
        let rows = stmt.query_map(params![cycle_id], |r| {
            Ok(ClassificationRow {
                icao24: r.get(0)?,
                callsign: r.get(1)?,
                lat: r.get(2)?,
                lon: r.get(3)?,
                altitude_ft: r.get(4)?,
                distance_km: r.get(5)?,
                wind_category: r.get(6)?,
                intensity_dbz: r.get(7)?,
                echo_category: r.get(8)?,
                observed_decision: r.get(9)?,
                compliance: r.get(10)?,
                avoiding: r.get::<_, i32>(11)? != 0,
                avoidance_reason: r.get(12)?,
                confidence: r.get(13)?,
            })
        })?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Classification counts per compliance label across all cycles.
    pub fn compliance_totals(&self) -> SqlResult<Vec<LabelCount>> {
        let mut stmt = self.conn.prepare(
            "SELECT compliance, COUNT(*) FROM classifications
             GROUP BY compliance ORDER BY COUNT(*) DESC, compliance ASC",
        )?;
        let rows = stmt.query_map([], |r| {
            Ok(LabelCount {
                label: r.get(0)?,
                count: r.get(1)?,
            })
        })?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Totals per wind category across all cycles.
    pub fn wind_category_totals(&self) -> SqlResult<Vec<WindCategoryTotal>> {
        let mut stmt = self.conn.prepare(
            "SELECT wind_category, COUNT(*), SUM(avoiding), SUM(in_weather)
             FROM classifications GROUP BY wind_category ORDER BY wind_category ASC",
        )?;
        let rows = stmt.query_map([], |r| {
            Ok(WindCategoryTotal {
                category: r.get(0)?,
                total: r.get(1)?,
                avoiding: r.get::<_, Option<i64>>(2)?.unwrap_or(0),
                in_weather: r.get::<_, Option<i64>>(3)?.unwrap_or(0),
            })
        })?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    pub fn count_cycles(&self) -> i64 {
        self.conn
            .query_row("SELECT COUNT(*) FROM cycles", [], |r| r.get(0))
            .unwrap_or(0)
    }

    pub fn count_classifications(&self) -> i64 {
        self.conn
            .query_row("SELECT COUNT(*) FROM classifications", [], |r| r.get(0))
            .unwrap_or(0)
    }

    pub fn stats(&self) -> DbStats {
        DbStats {
            cycles: self.count_cycles(),
            classifications: self.count_classifications(),
            avoiding: self
                .conn
                .query_row(
                    "SELECT COUNT(*) FROM classifications WHERE avoiding = 1",
                    [],
                    |r| r.get(0),
                )
                .unwrap_or(0),
        }
    }
}

impl ReportWriter for Database {
    fn write(&mut self, report: &CycleReport) -> Result<(), ReportError> {
        self.record_cycle(report)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}

#[derive(Debug, Serialize)]
pub struct CycleRow {
    pub id: String,
    pub timestamp: f64,
    pub airport: String,
    pub wind_direction_deg: Option<f64>,
    pub wind_speed_kt: Option<i64>,
    pub wind_fallback: bool,
    pub weather_source: String,
    pub estimator: String,
    pub freshness: String,
    pub seen: i64,
    pub arrivals: i64,
    pub avoiding: i64,
}

#[derive(Debug, Serialize)]
pub struct ClassificationRow {
    pub icao24: String,
    pub callsign: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub altitude_ft: f64,
    pub distance_km: f64,
    pub wind_category: String,
    pub intensity_dbz: f64,
    pub echo_category: String,
    pub observed_decision: String,
    pub compliance: String,
    pub avoiding: bool,
    pub avoidance_reason: Option<String>,
    pub confidence: Option<i64>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct WindCategoryTotal {
    pub category: String,
    pub total: i64,
    pub avoiding: i64,
    pub in_weather: i64,
}

#[derive(Debug, Serialize)]
pub struct DbStats {
    pub cycles: i64,
    pub classifications: i64,
    pub avoiding: i64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::sample_report;

    fn test_db() -> Database {
        Database::open_memory().unwrap()
    }

    #[test]
    fn test_open_memory() {
        let db = test_db();
        assert_eq!(db.count_cycles(), 0);
        assert_eq!(db.count_classifications(), 0);
    }

    #[test]
    fn test_record_cycle() {
        let mut db = test_db();
        let report = sample_report();
        db.record_cycle(&report).unwrap();

        assert_eq!(db.count_cycles(), 1);
        assert_eq!(db.count_classifications(), 2);

        let cycles = db.recent_cycles(10).unwrap();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].id, report.id);
        assert_eq!(cycles[0].arrivals, 2);
        assert_eq!(cycles[0].weather_source, "simulated");
        assert_eq!(cycles[0].freshness, "NO_DATA");
        assert!(cycles[0].wind_fallback);
        assert_eq!(cycles[0].wind_speed_kt, Some(10));
    }

    #[test]
    fn test_classifications_for_cycle() {
        let mut db = test_db();
        let report = sample_report();
        db.record_cycle(&report).unwrap();

        let rows = db.classifications_for(&report.id).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].distance_km <= rows[1].distance_km);
        let thai = rows.iter().find(|r| r.icao24 == "885123").unwrap();
        assert_eq!(thai.callsign.as_deref(), Some("THA661"));
        assert_eq!(thai.echo_category, "ORANGE");
        assert!(db.classifications_for("missing").unwrap().is_empty());
    }

    #[test]
    fn test_recent_cycles_order_and_limit() {
        let mut db = test_db();
        let mut older = sample_report();
        older.timestamp -= 600.0;
        let newer = sample_report();
        db.record_cycle(&older).unwrap();
        db.record_cycle(&newer).unwrap();

        let cycles = db.recent_cycles(10).unwrap();
        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[0].id, newer.id);
        assert_eq!(db.recent_cycles(1).unwrap().len(), 1);
    }

    #[test]
    fn test_totals() {
        let mut db = test_db();
        db.record_cycle(&sample_report()).unwrap();
        db.record_cycle(&sample_report()).unwrap();

        let total: i64 = db.compliance_totals().unwrap().iter().map(|l| l.count).sum();
        assert_eq!(total, 4);
        let by_wind = db.wind_category_totals().unwrap();
        assert_eq!(by_wind.iter().map(|w| w.total).sum::<i64>(), 4);
        assert_eq!(by_wind.iter().map(|w| w.in_weather).sum::<i64>(), 2);

        let stats = db.stats();
        assert_eq!(stats.cycles, 2);
        assert_eq!(stats.classifications, 4);
    }

    #[test]
    fn test_report_writer() {
        let mut db = test_db();
        let writer: &mut dyn ReportWriter = &mut db;
        writer.write(&sample_report()).unwrap();
        assert_eq!(writer.name(), "sqlite");
        assert_eq!(db.count_cycles(), 1);
    }
}
