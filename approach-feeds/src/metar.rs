//! aviationweather.gov METAR client.
//!
//! `GET /api/data/metar?ids=VTBS&format=json&taf=false` returns an array of
//! report objects; only `rawOb` and `reportTime` of the first are used.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use approach_core::WindObservation;

use crate::error::{get_text, FeedError, Result};
use crate::{unix_now, WindFeed};

pub const DEFAULT_URL: &str = "https://aviationweather.gov/api/data/metar";
const TIMEOUT: Duration = Duration::from_secs(10);

/// One METAR report as returned by the JSON API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MetarReport {
    #[serde(rename = "rawOb")]
    pub raw: String,
    #[serde(rename = "reportTime", default)]
    pub report_time: Option<String>,
}

/// First report in a METAR JSON body, if any.
pub fn parse_reports(body: &str) -> Result<Option<MetarReport>> {
    // An unknown station comes back as an empty body rather than `[]`
    if body.trim().is_empty() {
        return Ok(None);
    }
    let reports: Vec<MetarReport> = serde_json::from_str(body)?;
    Ok(reports.into_iter().next())
}

/// Turn a report into a wind observation; unparseable wind is an error so the
/// caller can log it before falling back.
pub fn observation_from_report(report: MetarReport, timestamp: f64) -> Result<WindObservation> {
    WindObservation::parse(&report.raw, report.report_time.clone(), timestamp)
        .ok_or_else(|| FeedError::Decode(format!("no wind group in METAR: {}", report.raw)))
}

#[derive(Clone)]
pub struct MetarClient {
    url: String,
    client: reqwest::Client,
}

impl MetarClient {
    pub fn new() -> Result<Self> {
        Self::with_url(DEFAULT_URL)
    }

    pub fn with_url(url: &str) -> Result<Self> {
        Ok(MetarClient {
            url: url.to_string(),
            client: reqwest::Client::builder().timeout(TIMEOUT).build()?,
        })
    }
}

#[async_trait]
impl WindFeed for MetarClient {
    async fn fetch_wind(&self, station: &str) -> Result<WindObservation> {
        let query = [
            ("ids", station.to_string()),
            ("format", "json".to_string()),
            ("taf", "false".to_string()),
        ];
        let body = get_text(&self.client, &self.url, &query).await?;
        let report = parse_reports(&body)?.ok_or_else(|| FeedError::NoReport(station.to_string()))?;
        tracing::debug!(station, raw = %report.raw, "metar fetched");
        observation_from_report(report, unix_now() as f64)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
