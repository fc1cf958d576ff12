//! Polling monitor: one cycle = fetch wind, states, and frames, classify,
//! then hand the report to every writer.
//!
//! Feed failures are recovered locally with a warning so a cycle always
//! produces a report: no METAR means the fallback wind, no states means an
//! empty batch, no frames means the estimator runs without radar.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use approach_core::estimate::{AgeDecayedZoneEstimator, FixedZoneEstimator};
use approach_core::radar::{latest_frame, select_frame, RadarFrame, RadarPixelSampler};
use approach_core::{
    AvoidanceStats, Classifier, IntensityEstimator, Position, WeatherSource, WindObservation,
};
use approach_feeds::{
    load_sampler, unix_now, AircraftFeed, FeedError, FrameFeed, MetarClient, OpenSkyClient,
    RainViewerClient, TileSource, WindFeed,
};

use crate::report::{CycleReport, ReportWriter};

/// The four upstream feeds.
#[derive(Clone)]
pub struct Feeds {
    pub aircraft: Arc<dyn AircraftFeed>,
    pub frames: Arc<dyn FrameFeed>,
    pub tiles: Arc<dyn TileSource>,
    pub wind: Arc<dyn WindFeed>,
}

impl Feeds {
    /// OpenSky, RainViewer, and aviationweather.gov.
    pub fn live(frame_hours: u32) -> Result<Self, FeedError> {
        let radar = Arc::new(RainViewerClient::new(frame_hours)?);
        Ok(Feeds {
            aircraft: Arc::new(OpenSkyClient::new()?),
            frames: radar.clone(),
            tiles: radar,
            wind: Arc::new(MetarClient::new()?),
        })
    }
}

/// Estimator chosen for one cycle.
enum CycleEstimator {
    Fixed(FixedZoneEstimator),
    Decayed(AgeDecayedZoneEstimator),
    Radar(RadarPixelSampler),
}

impl CycleEstimator {
    fn as_dyn(&self) -> &dyn IntensityEstimator {
        match self {
            CycleEstimator::Fixed(e) => e,
            CycleEstimator::Decayed(e) => e,
            CycleEstimator::Radar(e) => e,
        }
    }
}

pub struct Monitor {
    classifier: Classifier,
    source: WeatherSource,
    zoom: u8,
    feeds: Feeds,
    writers: Vec<Box<dyn ReportWriter>>,
    cumulative: AvoidanceStats,
}

impl Monitor {
    pub fn new(classifier: Classifier, source: WeatherSource, zoom: u8, feeds: Feeds) -> Self {
        Monitor {
            classifier,
            source,
            zoom,
            feeds,
            writers: Vec::new(),
            cumulative: AvoidanceStats::default(),
        }
    }

    pub fn add_writer(&mut self, writer: Box<dyn ReportWriter>) {
        self.writers.push(writer);
    }

    /// Stats merged over every cycle run so far.
    pub fn cumulative(&self) -> &AvoidanceStats {
        &self.cumulative
    }

    /// Run one cycle and write its report. Never fails; see module docs.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let now = unix_now() as f64;
        let source = self.source;
        let feeds = self.feeds.clone();
        let profile = self.classifier.profile.clone();

        let wind = match feeds.wind.fetch_wind(&profile.metar_station).await {
            Ok(w) => w,
            Err(e) => {
                warn!(
                    station = %profile.metar_station,
                    "METAR unavailable, using fallback wind: {e}"
                );
                WindObservation::fallback(now)
            }
        };

        let states = match feeds.aircraft.fetch_states(&profile.bbox).await {
            Ok(s) => s,
            Err(e) => {
                warn!("aircraft feed failed, treating cycle as empty: {e}");
                Vec::new()
            }
        };

        let frames: Vec<RadarFrame> = if source == WeatherSource::Simulated {
            Vec::new()
        } else {
            match feeds.frames.fetch_frames().await {
                Ok(f) => f,
                Err(e) => {
                    warn!("radar frame feed failed, continuing without radar: {e}");
                    Vec::new()
                }
            }
        };
        // Estimation uses the frame nearest to now, if one is close enough.
        // Without one the report carries the newest frame so it reads STALE.
        let selected = select_frame(&frames, now).map(|(f, offset)| (f.clone(), offset));
        let weather_age = selected.as_ref().map(|(_, offset)| *offset);
        if selected.is_none() && !frames.is_empty() {
            warn!(
                frames = frames.len(),
                "no radar frame within range of now, weather treated as absent"
            );
        }

        let estimator = match source {
            WeatherSource::Simulated => {
                CycleEstimator::Fixed(FixedZoneEstimator::new(profile.zones.clone()))
            }
            WeatherSource::Decayed => CycleEstimator::Decayed(AgeDecayedZoneEstimator::new(
                profile.decayed_zones.clone(),
                weather_age,
            )),
            WeatherSource::Radar => {
                let sampler = match &selected {
                    Some((f, _)) => {
                        let positions: Vec<Position> =
                            states.iter().filter_map(|s| s.position).collect();
                        load_sampler(feeds.tiles.as_ref(), f, &positions, self.zoom).await
                    }
                    None => {
                        warn!("no usable radar frame, intensities default to 0");
                        RadarPixelSampler::new(self.zoom)
                    }
                };
                CycleEstimator::Radar(sampler)
            }
        };
        let frame = selected
            .map(|(f, _)| f)
            .or_else(|| latest_frame(&frames).cloned());

        let outcome = self
            .classifier
            .classify_cycle(&states, &wind, estimator.as_dyn(), weather_age);
        debug!(
            seen = outcome.seen,
            malformed = outcome.malformed,
            above_ceiling = outcome.above_ceiling,
            not_arriving = outcome.not_arriving,
            "cycle classified"
        );

        let report = CycleReport::new(&profile, now, wind, source, frame, outcome);
        self.cumulative.merge(&report.stats);

        for writer in &mut self.writers {
            if let Err(e) = writer.write(&report) {
                warn!(writer = writer.name(), "report write failed: {e}");
            }
        }

        info!(
            id = %report.id,
            arrivals = report.arrivals(),
            freshness = report.freshness.as_str(),
            wind_fallback = report.wind.fallback,
            "cycle complete"
        );
        report
    }

    /// Run cycles every `period` until `shutdown` resolves or `max_cycles`
    /// have completed. Shutdown is only observed between cycles. Returns the
    /// number of cycles run.
    pub async fn watch<S, F>(
        &mut self,
        period: Duration,
        max_cycles: Option<u32>,
        shutdown: S,
        mut on_cycle: F,
    ) -> u32
    where
        S: Future<Output = ()>,
        F: FnMut(&CycleReport, &AvoidanceStats),
    {
        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut completed = 0;

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("shutdown requested, stopping monitor");
                    break;
                }

                _ = ticker.tick() => {
                    let report = self.run_cycle().await;
                    on_cycle(&report, &self.cumulative);
                    completed += 1;
                    if max_cycles.is_some_and(|max| completed >= max) {
                        break;
                    }
                }
            }
        }
        completed
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use approach_core::radar::{Freshness, RadarTile, TileCoord, TILE_SIZE};
    use approach_core::{AircraftState, BoundingBox, EchoCategory};
    use approach_feeds::Result as FeedResult;

    use crate::report::ReportError;

    const BKK: Position = Position::new(13.6811, 100.7475);

    fn arrival(icao: &str, position: Position) -> AircraftState {
        let mut s = AircraftState::new(icao, Some("THA661"));
        s.position = Some(position);
        s.baro_altitude_m = Some(900.0);
        s.vertical_rate_mps = Some(-3.0);
        s.track_deg = Some(180.0);
        s
    }

    struct FakeAircraft(Option<Vec<AircraftState>>);

    #[async_trait]
    impl AircraftFeed for FakeAircraft {
        async fn fetch_states(&self, _bbox: &BoundingBox) -> FeedResult<Vec<AircraftState>> {
            self.0.clone().ok_or_else(|| FeedError::Status {
                url: "states".into(),
                status: 503,
            })
        }
    }

    struct FakeFrames(Vec<RadarFrame>);

    #[async_trait]
    impl FrameFeed for FakeFrames {
        async fn fetch_frames(&self) -> FeedResult<Vec<RadarFrame>> {
            Ok(self.0.clone())
        }
    }

    /// Solid red everywhere.
    struct RedTiles;

    #[async_trait]
    impl TileSource for RedTiles {
        async fn fetch_tile(
            &self,
            _frame: &RadarFrame,
            _tile: TileCoord,
        ) -> FeedResult<RadarTile> {
            let px = (TILE_SIZE * TILE_SIZE) as usize;
            RadarTile::new(TILE_SIZE, TILE_SIZE, [255, 0, 0, 255].repeat(px))
                .ok_or_else(|| FeedError::Decode("bad tile".into()))
        }
    }

    struct FakeWind(Option<&'static str>);

    #[async_trait]
    impl WindFeed for FakeWind {
        async fn fetch_wind(&self, station: &str) -> FeedResult<WindObservation> {
            let raw = self.0.ok_or_else(|| FeedError::NoReport(station.to_string()))?;
            WindObservation::parse(raw, None, 0.0).ok_or_else(|| FeedError::Decode(raw.to_string()))
        }
    }

    /// Counts writes; optionally fails every one.
    struct CountingWriter {
        writes: Arc<Mutex<u32>>,
        fail: bool,
    }

    impl ReportWriter for CountingWriter {
        fn write(&mut self, _report: &CycleReport) -> Result<(), ReportError> {
            *self.writes.lock().unwrap() += 1;
            if self.fail {
                return Err(ReportError::Io(std::io::Error::other("disk full")));
            }
            Ok(())
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    fn feeds(
        states: Option<Vec<AircraftState>>,
        frames: Vec<RadarFrame>,
        metar: Option<&'static str>,
    ) -> Feeds {
        Feeds {
            aircraft: Arc::new(FakeAircraft(states)),
            frames: Arc::new(FakeFrames(frames)),
            tiles: Arc::new(RedTiles),
            wind: Arc::new(FakeWind(metar)),
        }
    }

    fn north_approach() -> Position {
        // Inside the 45 dBZ North approach zone
        Position::new(14.0, 100.75)
    }

    #[tokio::test]
    async fn test_simulated_cycle() {
        let f = feeds(
            Some(vec![arrival("a", north_approach())]),
            vec![],
            Some("METAR VTBS 011200Z 19015KT 9999 FEW020 32/25 Q1006"),
        );
        let mut monitor = Monitor::new(Classifier::default(), WeatherSource::Simulated, 9, f);
        let report = monitor.run_cycle().await;

        assert!(!report.wind.fallback);
        assert_eq!(report.wind.speed_kt, 15);
        assert_eq!(report.arrivals(), 1);
        let c = &report.outcome.classifications[0];
        assert_eq!(c.weather.category, EchoCategory::Orange);
        assert_eq!(c.weather.source, "simulated");
        assert!(report.frame.is_none());
        assert_eq!(monitor.cumulative().flights, 1);
    }

    #[tokio::test]
    async fn test_feed_failures_recover() {
        let f = feeds(None, vec![], None);
        let mut monitor = Monitor::new(Classifier::default(), WeatherSource::Decayed, 9, f);
        let report = monitor.run_cycle().await;

        assert!(report.wind.fallback);
        assert_eq!(report.wind.direction_deg, 230.0);
        assert_eq!(report.outcome.seen, 0);
        assert_eq!(report.outcome.estimator, "decayed");
        assert_eq!(report.outcome.weather_age_minutes, None);
    }

    #[tokio::test]
    async fn test_radar_cycle_samples_tiles() {
        let now = unix_now();
        let frames = vec![RadarFrame {
            path: format!("/v2/radar/{now}"),
            time: now,
        }];
        let states = vec![arrival("a", Position::new(BKK.lat + 0.1, BKK.lon))];
        let f = feeds(Some(states), frames, None);
        let mut monitor = Monitor::new(Classifier::default(), WeatherSource::Radar, 9, f);
        let report = monitor.run_cycle().await;

        let c = &report.outcome.classifications[0];
        assert_eq!(c.weather.intensity_dbz, 55.0);
        assert_eq!(c.weather.source, "radar");
        assert!(report.frame.is_some());
        assert!(report.outcome.weather_age_minutes.unwrap() < 1.0);
    }

    #[tokio::test]
    async fn test_radar_without_frames_degrades() {
        let states = vec![arrival("a", north_approach())];
        let f = feeds(Some(states), vec![], None);
        let mut monitor = Monitor::new(Classifier::default(), WeatherSource::Radar, 9, f);
        let report = monitor.run_cycle().await;

        let c = &report.outcome.classifications[0];
        assert_eq!(c.weather.intensity_dbz, 0.0);
        assert_eq!(c.confidence.score, 60);
    }

    #[tokio::test]
    async fn test_stale_frame_gives_no_weather() {
        let old = unix_now() - 30 * 60;
        let frames = vec![RadarFrame {
            path: format!("/v2/radar/{old}"),
            time: old,
        }];
        // Centre of the Moderate Rain cell
        let states = vec![arrival("a", Position::new(14.1, 100.8))];
        let f = feeds(Some(states), frames, None);
        let mut monitor = Monitor::new(Classifier::default(), WeatherSource::Decayed, 9, f);
        let report = monitor.run_cycle().await;

        let c = &report.outcome.classifications[0];
        assert_eq!(c.weather.intensity_dbz, 0.0);
        assert_eq!(report.outcome.weather_age_minutes, None);
        assert_eq!(report.freshness, Freshness::Stale);
        assert_eq!(report.frame.as_ref().map(|f| f.time), Some(old));
    }

    #[tokio::test]
    async fn test_decayed_uses_nearest_frame() {
        let now = unix_now();
        let frames = vec![
            RadarFrame {
                path: "/v2/radar/old".into(),
                time: now - 40 * 60,
            },
            RadarFrame {
                path: "/v2/radar/recent".into(),
                time: now - 10 * 60,
            },
        ];
        let states = vec![arrival("a", Position::new(14.1, 100.8))];
        let f = feeds(Some(states), frames, None);
        let mut monitor = Monitor::new(Classifier::default(), WeatherSource::Decayed, 9, f);
        let report = monitor.run_cycle().await;

        let age = report.outcome.weather_age_minutes.unwrap();
        assert!((age - 10.0).abs() < 0.5);
        let c = &report.outcome.classifications[0];
        // 35 dBZ peak at half strength
        assert!((c.weather.intensity_dbz - 17.5).abs() < 0.5);
        assert_eq!(report.frame.unwrap().path, "/v2/radar/recent");
    }

    #[tokio::test]
    async fn test_stale_frame_skips_radar_tiles() {
        let old = unix_now() - 30 * 60;
        let frames = vec![RadarFrame {
            path: format!("/v2/radar/{old}"),
            time: old,
        }];
        let states = vec![arrival("a", Position::new(BKK.lat + 0.1, BKK.lon))];
        let f = feeds(Some(states), frames, None);
        let mut monitor = Monitor::new(Classifier::default(), WeatherSource::Radar, 9, f);
        let report = monitor.run_cycle().await;

        assert_eq!(report.outcome.classifications[0].weather.intensity_dbz, 0.0);
        assert_eq!(report.outcome.weather_age_minutes, None);
    }

    #[tokio::test]
    async fn test_writer_failure_does_not_stop_cycle() {
        let writes = Arc::new(Mutex::new(0));
        let mut monitor = Monitor::new(
            Classifier::default(),
            WeatherSource::Simulated,
            9,
            feeds(Some(vec![]), vec![], None),
        );
        monitor.add_writer(Box::new(CountingWriter {
            writes: writes.clone(),
            fail: true,
        }));
        monitor.add_writer(Box::new(CountingWriter {
            writes: writes.clone(),
            fail: false,
        }));
        monitor.run_cycle().await;
        assert_eq!(*writes.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_watch_stops_after_max_cycles() {
        let mut monitor = Monitor::new(
            Classifier::default(),
            WeatherSource::Simulated,
            9,
            feeds(Some(vec![arrival("a", north_approach())]), vec![], None),
        );
        let mut seen = Vec::new();
        let n = monitor
            .watch(Duration::from_millis(1), Some(3), std::future::pending(), |r, total| {
                seen.push((r.arrivals(), total.cycles));
            })
            .await;
        assert_eq!(n, 3);
        assert_eq!(seen, vec![(1, 1), (1, 2), (1, 3)]);
        assert_eq!(monitor.cumulative().flights, 3);
    }

    #[tokio::test]
    async fn test_watch_stops_on_shutdown() {
        let mut monitor = Monitor::new(
            Classifier::default(),
            WeatherSource::Simulated,
            9,
            feeds(Some(vec![]), vec![], None),
        );
        let n = monitor
            .watch(Duration::from_secs(3600), None, async {}, |_, _| {})
            .await;
        assert_eq!(n, 0);
    }
}
