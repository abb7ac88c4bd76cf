//! Configuration management for dispatchctl.
//!
//! Loads settings from a TOML file or uses defaults. Every workflow knob
//! that used to differ between forked variants of the dispatch flow lives
//! here instead of in the flow itself.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Config file name inside the per-user config directory
pub const CONFIG_FILE: &str = "dispatchctl/config.toml";

/// How the shortest-path endpoint names its query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RouteParamStyle {
    /// `start_latitude`, `start_longitude`, `end_latitude`, `end_longitude`
    #[default]
    StartEnd,
    /// `ambulance_latitude`, `ambulance_longitude`, `event_latitude`, `event_longitude`
    AmbulanceEvent,
}

impl RouteParamStyle {
    /// Parameter names as (start_lat, start_lon, end_lat, end_lon).
    pub fn names(self) -> [&'static str; 4] {
        match self {
            Self::StartEnd => [
                "start_latitude",
                "start_longitude",
                "end_latitude",
                "end_longitude",
            ],
            Self::AmbulanceEvent => [
                "ambulance_latitude",
                "ambulance_longitude",
                "event_latitude",
                "event_longitude",
            ],
        }
    }
}

/// Remote service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the dispatch service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Query parameter naming for `/get_shortest_path`
    #[serde(default)]
    pub route_params: RouteParamStyle,
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
            route_params: RouteParamStyle::default(),
        }
    }
}

/// Movement animation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationConfig {
    /// Delay between two waypoint updates in milliseconds
    #[serde(default = "default_tick_delay")]
    pub tick_delay_ms: u64,
}

fn default_tick_delay() -> u64 {
    1_000
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            tick_delay_ms: default_tick_delay(),
        }
    }
}

/// Map presentation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    /// Zoom level when centring on the incident
    #[serde(default = "default_zoom")]
    pub zoom: u8,

    /// Marker icon edge length in pixels
    #[serde(default = "default_icon_size")]
    pub icon_size: u32,

    /// Circle colour for zones without a known tier
    #[serde(default = "default_zone_color")]
    pub default_zone_color: String,
}

fn default_zoom() -> u8 {
    14
}

fn default_icon_size() -> u32 {
    18
}

fn default_zone_color() -> String {
    "red".to_string()
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            zoom: default_zoom(),
            icon_size: default_icon_size(),
            default_zone_color: default_zone_color(),
        }
    }
}

/// Route validation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Max distance in metres between a path end and the requested endpoint
    #[serde(default = "default_endpoint_tolerance")]
    pub endpoint_tolerance_m: f64,
}

fn default_endpoint_tolerance() -> f64 {
    500.0 // road graph snaps to the nearest node
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            endpoint_tolerance_m: default_endpoint_tolerance(),
        }
    }
}

/// Full dispatchctl configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub animation: AnimationConfig,

    #[serde(default)]
    pub map: MapConfig,

    #[serde(default)]
    pub routing: RoutingConfig,
}

impl Config {
    /// Default per-user config path, if a config dir exists
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(CONFIG_FILE))
    }

    /// Load config from `path`, then the per-user file, or return defaults
    pub fn load(path: Option<&Path>) -> Self {
        let candidate = path.map(Path::to_path_buf).or_else(Self::default_path);
        match candidate {
            Some(p) => Self::load_from_path(&p).unwrap_or_else(|e| {
                warn!("Config not loaded, using defaults: {:#}", e);
                Config::default()
            }),
            None => Config::default(),
        }
    }

    /// Load config from specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    pub fn tick_delay(&self) -> Duration {
        Duration::from_millis(self.animation.tick_delay_ms)
    }
}
