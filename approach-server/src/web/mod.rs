//! Web server: axum JSON API over the monitor's latest cycle.
//!
//! The monitor publishes each report into shared state; handlers read the
//! latest snapshot. History handlers open their own DB connection per request.

use std::future::Future;
use std::sync::{Arc, RwLock};

use axum::Router;
use http::header::{HeaderValue, CACHE_CONTROL};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use approach_core::estimate::WeatherZone;
use approach_core::AvoidanceStats;

use crate::report::CycleReport;

pub mod routes;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

pub struct AppState {
    pub db_path: String,
    /// Drawn on every map response.
    pub zones: Vec<WeatherZone>,
    pub latest: RwLock<Option<CycleReport>>,
    pub cumulative: RwLock<AvoidanceStats>,
}

impl AppState {
    pub fn new(db_path: String, zones: Vec<WeatherZone>) -> Self {
        AppState {
            db_path,
            zones,
            latest: RwLock::new(None),
            cumulative: RwLock::new(AvoidanceStats::default()),
        }
    }

    /// Replace the latest report and cumulative stats. Last write wins.
    pub fn publish(&self, report: &CycleReport, cumulative: &AvoidanceStats) {
        *self.latest.write().unwrap_or_else(|e| e.into_inner()) = Some(report.clone());
        *self.cumulative.write().unwrap_or_else(|e| e.into_inner()) = cumulative.clone();
    }

    pub fn latest(&self) -> Option<CycleReport> {
        self.latest.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn cumulative(&self) -> AvoidanceStats {
        self.cumulative.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let no_store =
        SetResponseHeaderLayer::overriding(CACHE_CONTROL, HeaderValue::from_static("no-store"));

    Router::new()
        .route(
            "/api/classifications",
            axum::routing::get(routes::api_classifications),
        )
        .route("/api/map", axum::routing::get(routes::api_map))
        .route("/api/stats", axum::routing::get(routes::api_stats))
        .route("/api/wind", axum::routing::get(routes::api_wind))
        .route("/api/history", axum::routing::get(routes::api_history))
        .with_state(state)
        .layer(no_store)
        .layer(cors)
}

/// Serve the API until `shutdown` resolves.
pub async fn serve<F>(
    state: Arc<AppState>,
    host: &str,
    port: u16,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("approach dashboard listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
