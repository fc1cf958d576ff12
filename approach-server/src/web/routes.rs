//! API route handlers.
//!
//! Live endpoints answer 503 until the first cycle completes. History opens
//! its own DB connection per request.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::db::Database;
use crate::map::{approach_lines, flight_markers, zone_overlays, GeoJsonRenderer};
use crate::web::AppState;

const DEFAULT_HISTORY_LIMIT: i64 = 20;
const MAX_HISTORY_LIMIT: i64 = 500;

#[derive(Deserialize)]
pub struct HistoryParams {
    limit: Option<i64>,
    /// Return the classifications of one cycle instead of the cycle list.
    cycle: Option<String>,
}

fn no_cycle_yet() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({"error": "No cycle has completed yet"})),
    )
        .into_response()
}

/// GET /api/classifications: arrivals of the latest cycle, nearest first.
pub async fn api_classifications(State(state): State<Arc<AppState>>) -> Response {
    let Some(report) = state.latest() else {
        return no_cycle_yet();
    };
    Json(json!({
        "id": report.id,
        "timestamp": report.timestamp,
        "airport": report.airport,
        "count": report.arrivals(),
        "classifications": report.outcome.classifications,
    }))
    .into_response()
}

/// GET /api/map: GeoJSON of zones, approach lines, and flight markers.
pub async fn api_map(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut overlays = zone_overlays(&state.zones);
    let markers = match state.latest() {
        Some(report) => {
            let classifications = &report.outcome.classifications;
            overlays.extend(approach_lines(classifications, report.reference));
            flight_markers(classifications)
        }
        None => Vec::new(),
    };
    Json(GeoJsonRenderer.to_value(&markers, &overlays))
}

/// GET /api/stats: latest-cycle and cumulative avoidance stats.
pub async fn api_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cumulative = state.cumulative();
    let latest = state.latest().map(|r| {
        json!({
            "id": r.id,
            "by_wind": r.stats.rows(),
            "by_compliance": r.stats.by_compliance,
        })
    });
    Json(json!({
        "latest": latest,
        "cumulative": {
            "cycles": cumulative.cycles,
            "flights": cumulative.flights,
            "by_wind": cumulative.rows(),
            "by_compliance": cumulative.by_compliance,
        },
    }))
}

/// GET /api/wind: wind observation used by the latest cycle.
pub async fn api_wind(State(state): State<Arc<AppState>>) -> Response {
    match state.latest() {
        Some(report) => Json(json!(report.wind)).into_response(),
        None => no_cycle_yet(),
    }
}

/// GET /api/history: recent cycles, or one cycle's rows with `?cycle=<id>`.
pub async fn api_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> Response {
    let db = match Database::open(&state.db_path) {
        Ok(db) => db,
        Err(e) => {
            tracing::warn!(path = %state.db_path, "history database unavailable: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "History database unavailable"})),
            )
                .into_response();
        }
    };

    let result = match &params.cycle {
        Some(id) => db.classifications_for(id).map(|rows| json!(rows)),
        None => {
            let limit = params
                .limit
                .unwrap_or(DEFAULT_HISTORY_LIMIT)
                .clamp(1, MAX_HISTORY_LIMIT);
            db.recent_cycles(limit).map(|rows| {
                json!({
                    "stats": db.stats(),
                    "cycles": rows,
                })
            })
        }
    };

    match result {
        Ok(body) => Json(body).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": e.to_string()})),
        )
            .into_response(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
