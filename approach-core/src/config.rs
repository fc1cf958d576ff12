//! Configuration file management for approach-wx.
//!
//! Reads/writes `~/.approach-wx/config.yaml` with the airport profile, feed
//! bounding box, weather strategy, arrival thresholds, monitor settings, and
//! dashboard address. Defaults describe Bangkok Suvarnabhumi.

use std::path::{Path, PathBuf};

use crate::arrival::ArrivalCriteria;
use crate::classify::AirportProfile;
use crate::estimate::{builtin_zone_sets, WeatherSource};
use crate::radar::DEFAULT_ZOOM;
use crate::types::{ApproachError, BoundingBox, Position, Result};

/// Full configuration structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub airport: AirportConfig,
    pub bbox: BoundingBox,
    pub weather: WeatherConfig,
    pub arrival: ArrivalCriteria,
    pub monitor: MonitorConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AirportConfig {
    pub code: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub metar_station: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherConfig {
    pub source: WeatherSource,
    pub zoom: u8,
    /// How far back the frame feed looks.
    pub frame_hours: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub interval_secs: u64,
    pub output_dir: String,
    pub database: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub host: String,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        let profile = AirportProfile::suvarnabhumi();
        Config {
            airport: AirportConfig {
                code: profile.code,
                name: profile.name,
                lat: profile.reference.lat,
                lon: profile.reference.lon,
                metar_station: profile.metar_station,
            },
            bbox: profile.bbox,
            weather: WeatherConfig {
                source: WeatherSource::Simulated,
                zoom: DEFAULT_ZOOM,
                frame_hours: 2,
            },
            arrival: ArrivalCriteria::default(),
            monitor: MonitorConfig {
                interval_secs: 600,
                output_dir: "reports".into(),
                database: "data/approach.db".into(),
            },
            dashboard: DashboardConfig {
                host: "127.0.0.1".into(),
                port: 8080,
            },
        }
    }
}

impl Config {
    /// Build the immutable airport profile, validating coordinates and box.
    pub fn profile(&self) -> Result<AirportProfile> {
        let reference = Position::checked(self.airport.lat, self.airport.lon)?;
        let bbox = BoundingBox::new(
            self.bbox.min_lat,
            self.bbox.max_lat,
            self.bbox.min_lon,
            self.bbox.max_lon,
        )?;
        let (zones, decayed_zones) = builtin_zone_sets(&self.airport.metar_station, reference);
        Ok(AirportProfile {
            code: self.airport.code.clone(),
            name: self.airport.name.clone(),
            reference,
            metar_station: self.airport.metar_station.clone(),
            bbox,
            zones,
            decayed_zones,
        })
    }
}

/// Get the config directory path (`~/.approach-wx/`).
pub fn config_dir() -> PathBuf {
    dirs_home().join(".approach-wx")
}

/// Get the config file path.
pub fn config_file() -> PathBuf {
    config_dir().join("config.yaml")
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Load config from `~/.approach-wx/config.yaml`.
///
/// Returns the default config if the file doesn't exist or can't be read.
pub fn load_config() -> Config {
    load_config_from(&config_file()).unwrap_or_default()
}

/// Load config from an explicit path. A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let text = std::fs::read_to_string(path)?;
    parse_config(&text)
}

/// Save config to `path`, creating parent directories.
pub fn save_config_to(config: &Config, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, serialize_config(config))?;
    Ok(())
}

/// Save config to `~/.approach-wx/config.yaml`.
pub fn save_config(config: &Config) -> Result<PathBuf> {
    let path = config_file();
    save_config_to(config, &path)?;
    Ok(path)
}

/// Parse simple YAML-like config text. Unknown keys are ignored; a bad
/// value for a known key is an error.
pub fn parse_config(text: &str) -> Result<Config> {
    let mut config = Config::default();
    let mut current_section: Option<String> = None;

    for line in text.lines() {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }

        let is_indented = line.starts_with("  ") || line.starts_with('\t');

        let Some((key, val)) = stripped.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let val = val.trim();

        if !is_indented {
            current_section = val.is_empty().then(|| key.to_string());
            continue;
        }
        let Some(section) = current_section.as_deref() else {
            continue;
        };

        match (section, key) {
            ("airport", "code") => set_string(&mut config.airport.code, val),
            ("airport", "name") => set_string(&mut config.airport.name, val),
            ("airport", "lat") => config.airport.lat = parse_number(section, key, val)?,
            ("airport", "lon") => config.airport.lon = parse_number(section, key, val)?,
            ("airport", "metar_station") => set_string(&mut config.airport.metar_station, val),

            ("bbox", "min_lat") => config.bbox.min_lat = parse_number(section, key, val)?,
            ("bbox", "max_lat") => config.bbox.max_lat = parse_number(section, key, val)?,
            ("bbox", "min_lon") => config.bbox.min_lon = parse_number(section, key, val)?,
            ("bbox", "max_lon") => config.bbox.max_lon = parse_number(section, key, val)?,

            ("weather", "source") => {
                let raw = parse_string_value(val).unwrap_or_default();
                config.weather.source = WeatherSource::parse(&raw).ok_or_else(|| {
                    ApproachError::Config(format!("unknown weather source: {raw}"))
                })?;
            }
            ("weather", "zoom") => config.weather.zoom = parse_number(section, key, val)?,
            ("weather", "frame_hours") => {
                config.weather.frame_hours = parse_number(section, key, val)?
            }

            ("arrival", "ceiling_m") => config.arrival.ceiling_m = parse_number(section, key, val)?,
            ("arrival", "radius_km") => config.arrival.radius_km = parse_number(section, key, val)?,
            ("arrival", "descent_rate_mps") => {
                config.arrival.descent_rate_mps = parse_number(section, key, val)?
            }
            ("arrival", "final_ceiling_m") => {
                config.arrival.final_ceiling_m = parse_number(section, key, val)?
            }
            ("arrival", "final_radius_km") => {
                config.arrival.final_radius_km = parse_number(section, key, val)?
            }

            ("monitor", "interval_secs") => {
                config.monitor.interval_secs = parse_number(section, key, val)?
            }
            ("monitor", "output_dir") => set_string(&mut config.monitor.output_dir, val),
            ("monitor", "database") => set_string(&mut config.monitor.database, val),

            ("dashboard", "host") => set_string(&mut config.dashboard.host, val),
            ("dashboard", "port") => config.dashboard.port = parse_number(section, key, val)?,

            _ => {}
        }
    }

    Ok(config)
}

fn set_string(target: &mut String, val: &str) {
    if let Some(v) = parse_string_value(val) {
        *target = v;
    }
}

fn parse_string_value(val: &str) -> Option<String> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    // Strip quotes
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        return Some(val[1..val.len() - 1].to_string());
    }
    Some(val.to_string())
}

fn parse_number<T: std::str::FromStr>(section: &str, key: &str, val: &str) -> Result<T> {
    val.parse()
        .map_err(|_| ApproachError::Config(format!("{section}.{key}: invalid value {val:?}")))
}

/// Serialize config to YAML-like text.
pub fn serialize_config(config: &Config) -> String {
    let mut lines = vec!["# approach-wx configuration".to_string(), String::new()];

    lines.push("airport:".into());
    lines.push(format!("  code: \"{}\"", config.airport.code));
    lines.push(format!("  name: \"{}\"", config.airport.name));
    lines.push(format!("  lat: {}", config.airport.lat));
    lines.push(format!("  lon: {}", config.airport.lon));
    lines.push(format!("  metar_station: \"{}\"", config.airport.metar_station));
    lines.push(String::new());

    lines.push("bbox:".into());
    lines.push(format!("  min_lat: {}", config.bbox.min_lat));
    lines.push(format!("  max_lat: {}", config.bbox.max_lat));
    lines.push(format!("  min_lon: {}", config.bbox.min_lon));
    lines.push(format!("  max_lon: {}", config.bbox.max_lon));
    lines.push(String::new());

    lines.push("# source: simulated | radar | decayed".into());
    lines.push("weather:".into());
    lines.push(format!("  source: {}", config.weather.source.as_str()));
    lines.push(format!("  zoom: {}", config.weather.zoom));
    lines.push(format!("  frame_hours: {}", config.weather.frame_hours));
    lines.push(String::new());

    lines.push("arrival:".into());
    lines.push(format!("  ceiling_m: {}", config.arrival.ceiling_m));
    lines.push(format!("  radius_km: {}", config.arrival.radius_km));
    lines.push(format!("  descent_rate_mps: {}", config.arrival.descent_rate_mps));
    lines.push(format!("  final_ceiling_m: {}", config.arrival.final_ceiling_m));
    lines.push(format!("  final_radius_km: {}", config.arrival.final_radius_km));
    lines.push(String::new());

    lines.push("monitor:".into());
    lines.push(format!("  interval_secs: {}", config.monitor.interval_secs));
    lines.push(format!("  output_dir: \"{}\"", config.monitor.output_dir));
    lines.push(format!("  database: \"{}\"", config.monitor.database));
    lines.push(String::new());

    lines.push("dashboard:".into());
    lines.push(format!("  host: \"{}\"", config.dashboard.host));
    lines.push(format!("  port: {}", config.dashboard.port));

    lines.join("\n") + "\n"
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
