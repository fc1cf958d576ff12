//! approach: arrival weather-avoidance monitor for Bangkok Suvarnabhumi.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use approach_core::config::{self, Config};
use approach_core::estimate::{AgeDecayedZoneEstimator, FixedZoneEstimator, WeatherZone};
use approach_core::{
    AirportProfile, ApproachError, AvoidanceStats, Classifier, CycleOutcome, WeatherSource,
    WindObservation,
};
use approach_feeds::FeedError;

mod db;
mod map;
mod monitor;
mod report;
mod web;

use monitor::{Feeds, Monitor};
use report::{CycleReport, JsonReportWriter};

#[derive(Parser)]
#[command(name = "approach", version, about = "Arrival weather-avoidance monitor")]
struct Cli {
    /// Config file (defaults to ~/.approach-wx/config.yaml)
    #[arg(long, global = true, env = "APPROACH_WX_CONFIG")]
    config: Option<PathBuf>,

    /// Weather source override: simulated, decayed, or radar
    #[arg(long, global = true)]
    source: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single monitoring cycle and print the arrivals
    Once,

    /// Run cycles on a fixed interval until Ctrl-C
    Watch {
        /// Seconds between cycles (defaults to the config value)
        #[arg(long)]
        interval: Option<u64>,

        /// Stop after this many cycles
        #[arg(long)]
        cycles: Option<u32>,
    },

    /// Run the monitor loop and serve the JSON API
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,

        /// Seconds between cycles (defaults to the config value)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Classify a saved OpenSky states response offline
    Classify {
        /// Path to a `/api/states/all` JSON body
        file: PathBuf,

        /// Raw METAR text; the fallback wind is used when absent or unparseable
        #[arg(long)]
        metar: Option<String>,

        /// Radar frame age in minutes for the decayed estimator
        #[arg(long)]
        age: Option<f64>,

        /// Print the full outcome as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show recent cycles from the history database
    History {
        #[arg(long, default_value = "20")]
        limit: i64,

        /// SQLite database path (defaults to the config value)
        #[arg(long)]
        db_path: Option<String>,
    },

    /// Show or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the default configuration
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ApproachError),
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database error: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Usage(String),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.clone().unwrap_or_else(config::config_file);

    if let Commands::Config { action } = &cli.command {
        return cmd_config(action, &config_path);
    }

    let mut config = config::load_config_from(&config_path)?;
    if let Some(s) = &cli.source {
        config.weather.source = WeatherSource::parse(s)
            .ok_or_else(|| CliError::Usage(format!("unknown weather source: {s}")))?;
    }
    let profile = config.profile()?;

    match cli.command {
        Commands::Once => cmd_once(&config, &profile).await,
        Commands::Watch { interval, cycles } => {
            let secs = interval.unwrap_or(config.monitor.interval_secs);
            cmd_watch(&config, &profile, secs, cycles).await
        }
        Commands::Serve {
            host,
            port,
            interval,
        } => {
            let host = host.unwrap_or_else(|| config.dashboard.host.clone());
            let port = port.unwrap_or(config.dashboard.port);
            let secs = interval.unwrap_or(config.monitor.interval_secs);
            cmd_serve(&config, &profile, &host, port, secs).await
        }
        Commands::Classify {
            file,
            metar,
            age,
            json,
        } => cmd_classify(&config, &profile, &file, metar.as_deref(), age, json),
        Commands::History { limit, db_path } => {
            let path = db_path.unwrap_or_else(|| config.monitor.database.clone());
            cmd_history(&path, limit)
        }
        Commands::Config { .. } => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Monitor commands
// ---------------------------------------------------------------------------

/// Zones drawn on maps for the configured source.
fn map_zones(config: &Config, profile: &AirportProfile) -> Vec<WeatherZone> {
    match config.weather.source {
        WeatherSource::Simulated => profile.zones.clone(),
        WeatherSource::Decayed => profile.decayed_zones.clone(),
        WeatherSource::Radar => Vec::new(),
    }
}

fn build_monitor(config: &Config, profile: &AirportProfile) -> Result<Monitor, CliError> {
    let feeds = Feeds::live(config.weather.frame_hours)?;
    let classifier = Classifier::new(profile.clone(), config.arrival);
    let mut monitor = Monitor::new(classifier, config.weather.source, config.weather.zoom, feeds);

    monitor.add_writer(Box::new(JsonReportWriter::new(
        &config.monitor.output_dir,
        map_zones(config, profile),
    )));
    match db::Database::open(&config.monitor.database) {
        Ok(db) => monitor.add_writer(Box::new(db)),
        Err(e) => warn!(path = %config.monitor.database, "history disabled: {e}"),
    }

    info!(
        airport = %profile.code,
        source = config.weather.source.as_str(),
        "monitor ready"
    );
    Ok(monitor)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("cannot listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}

async fn cmd_once(config: &Config, profile: &AirportProfile) -> Result<(), CliError> {
    let mut monitor = build_monitor(config, profile)?;
    let report = monitor.run_cycle().await;
    print_report(&report);
    println!("Reports: {}", config.monitor.output_dir);
    Ok(())
}

async fn cmd_watch(
    config: &Config,
    profile: &AirportProfile,
    interval_secs: u64,
    cycles: Option<u32>,
) -> Result<(), CliError> {
    let mut monitor = build_monitor(config, profile)?;
    info!(interval_secs, "watching; Ctrl-C to stop");

    let n = monitor
        .watch(
            Duration::from_secs(interval_secs.max(1)),
            cycles,
            shutdown_signal(),
            |report, cumulative| {
                print_report(report);
                print_stats("Cumulative", cumulative);
            },
        )
        .await;
    info!(cycles = n, "monitor stopped");
    Ok(())
}

async fn cmd_serve(
    config: &Config,
    profile: &AirportProfile,
    host: &str,
    port: u16,
    interval_secs: u64,
) -> Result<(), CliError> {
    let state = Arc::new(web::AppState::new(
        config.monitor.database.clone(),
        map_zones(config, profile),
    ));

    let mut monitor = build_monitor(config, profile)?;
    let publish = state.clone();
    let period = Duration::from_secs(interval_secs.max(1));
    let monitor_task = tokio::spawn(async move {
        monitor
            .watch(period, None, shutdown_signal(), move |report, cumulative| {
                publish.publish(report, cumulative)
            })
            .await
    });

    web::serve(state, host, port, shutdown_signal()).await?;
    match monitor_task.await {
        Ok(n) => info!(cycles = n, "monitor stopped"),
        Err(e) => warn!("monitor task ended abnormally: {e}"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Offline classification
// ---------------------------------------------------------------------------

fn cmd_classify(
    config: &Config,
    profile: &AirportProfile,
    file: &Path,
    metar: Option<&str>,
    age: Option<f64>,
    json: bool,
) -> Result<(), CliError> {
    let body = std::fs::read_to_string(file)?;
    let states = approach_feeds::opensky::parse_states(&body)?;
    let now = approach_feeds::unix_now() as f64;
    let wind = match metar {
        Some(raw) => WindObservation::parse_or_fallback(raw, None, now),
        None => WindObservation::fallback(now),
    };

    let classifier = Classifier::new(profile.clone(), config.arrival);
    let outcome = match config.weather.source {
        WeatherSource::Simulated => {
            let estimator = FixedZoneEstimator::new(profile.zones.clone());
            classifier.classify_cycle(&states, &wind, &estimator, None)
        }
        WeatherSource::Decayed => {
            let estimator = AgeDecayedZoneEstimator::new(profile.decayed_zones.clone(), age);
            classifier.classify_cycle(&states, &wind, &estimator, age)
        }
        WeatherSource::Radar => {
            return Err(CliError::Usage(
                "radar sampling needs live tiles; use `once` or --source simulated|decayed".into(),
            ))
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    print_outcome(&outcome);
    println!(
        "Wind: {:03.0}/{} kt{}",
        wind.direction_deg,
        wind.speed_kt,
        if wind.fallback { " (fallback)" } else { "" }
    );
    print_stats("Summary", &AvoidanceStats::from_cycle(&outcome.classifications));
    Ok(())
}

// ---------------------------------------------------------------------------
// History + config
// ---------------------------------------------------------------------------

fn cmd_history(db_path: &str, limit: i64) -> Result<(), CliError> {
    let database = db::Database::open(db_path)?;
    let cycles = database.recent_cycles(limit)?;
    let stats = database.stats();

    println!();
    println!("Database: {db_path}");
    println!(
        "  Cycles: {}  Classifications: {}  Avoiding: {}",
        stats.cycles, stats.classifications, stats.avoiding
    );
    println!();

    if cycles.is_empty() {
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Cycle", "Time", "Wind", "Source", "Radar", "Seen", "Arrivals", "Avoiding",
    ]);
    for c in &cycles {
        let wind = match (c.wind_direction_deg, c.wind_speed_kt) {
            (Some(d), Some(s)) => format!("{d:03.0}/{s}{}", if c.wind_fallback { "*" } else { "" }),
            _ => "-".into(),
        };
        table.add_row(vec![
            Cell::new(&c.id[..8.min(c.id.len())]),
            Cell::new(format!("{:.0}", c.timestamp)),
            Cell::new(wind),
            Cell::new(&c.weather_source),
            Cell::new(&c.freshness),
            Cell::new(c.seen),
            Cell::new(c.arrivals),
            Cell::new(c.avoiding),
        ]);
    }
    println!("{table}");

    let by_wind = database.wind_category_totals()?;
    if !by_wind.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Wind", "Flights", "Avoiding", "In weather"]);
        for w in &by_wind {
            table.add_row(vec![
                Cell::new(&w.category),
                Cell::new(w.total),
                Cell::new(w.avoiding),
                Cell::new(w.in_weather),
            ]);
        }
        println!("{table}");
    }

    let totals = database.compliance_totals()?;
    if !totals.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Compliance", "Flights"]);
        for t in &totals {
            table.add_row(vec![Cell::new(&t.label), Cell::new(t.count)]);
        }
        println!("{table}");
    }
    Ok(())
}

fn cmd_config(action: &ConfigAction, path: &Path) -> Result<(), CliError> {
    match action {
        ConfigAction::Show => {
            let config = config::load_config_from(path)?;
            println!("# {}", path.display());
            print!("{}", config::serialize_config(&config));
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                return Err(CliError::Usage(format!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                )));
            }
            config::save_config_to(&Config::default(), path)?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_report(report: &CycleReport) {
    println!();
    println!(
        "Cycle {} - {} - wind {:03.0}/{} kt{} - weather {} ({})",
        &report.id[..8.min(report.id.len())],
        report.airport,
        report.wind.direction_deg,
        report.wind.speed_kt,
        if report.wind.fallback { " (fallback)" } else { "" },
        report.weather_source.as_str(),
        report.freshness.as_str(),
    );
    print_outcome(&report.outcome);
}

fn print_outcome(outcome: &CycleOutcome) {
    println!(
        "Flights: {} seen, {} arriving, {} malformed, {} above ceiling, {} not arriving",
        outcome.seen,
        outcome.classifications.len(),
        outcome.malformed,
        outcome.above_ceiling,
        outcome.not_arriving
    );
    if outcome.classifications.is_empty() {
        return;
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Callsign", "Dist (km)", "Alt (ft)", "Wind", "Echo", "dBZ", "Action", "Decision",
        "Compliance", "Conf",
    ]);
    for c in &outcome.classifications {
        table.add_row(vec![
            Cell::new(c.callsign()),
            Cell::new(format!("{:.1}", c.distance_km)),
            Cell::new(format!("{:.0}", c.altitude_ft)),
            Cell::new(c.wind_condition.as_str()),
            Cell::new(c.weather.category.as_str()),
            Cell::new(format!("{:.0}", c.weather.intensity_dbz)),
            Cell::new(c.recommended_action.as_str()),
            Cell::new(c.observed_decision.as_str()),
            Cell::new(c.compliance.as_str()),
            Cell::new(format!("{} {}", c.confidence.score, c.confidence.quality.as_str())),
        ]);
    }
    println!("{table}");
}

fn print_stats(title: &str, stats: &AvoidanceStats) {
    let mut table = Table::new();
    table.set_header(vec![title, "Flights", "Avoiding", "Avoid %", "In weather", "Wx %"]);
    for row in stats.rows() {
        table.add_row(vec![
            Cell::new(row.category.as_str()),
            Cell::new(row.total),
            Cell::new(row.avoiding),
            Cell::new(format!("{:.1}", row.avoiding_pct)),
            Cell::new(row.in_weather),
            Cell::new(format!("{:.1}", row.in_weather_pct)),
        ]);
    }
    println!("{table}");
}
