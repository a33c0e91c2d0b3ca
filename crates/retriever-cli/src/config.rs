//! Run configuration – reads `retriever.toml`.
//!
//! ```toml
//! metrics_path = "runs.txt"
//!
//! [mission]
//! max_grasp_attempts = 5
//!
//! [mission.thresholds]
//! pickup_distance = 0.35
//!
//! [arena]
//! realtime = true
//!
//! [telemetry]
//! format = "json"
//! ```
//!
//! Every section is optional; anything left out keeps its default.

use std::fs;
use std::path::{Path, PathBuf};

use retriever_hal::ArenaConfig;
use retriever_runtime::{LogFormat, MissionConfig, TelemetryConfig};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "retriever.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Append-only log of mission run times.
    #[serde(default = "default_metrics_path")]
    pub metrics_path: PathBuf,

    #[serde(default)]
    pub mission: MissionConfig,

    /// Layout of the simulated arena the mission runs in.
    #[serde(default)]
    pub arena: ArenaConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_metrics_path() -> PathBuf {
    PathBuf::from("runs.txt")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            metrics_path: default_metrics_path(),
            mission: MissionConfig::default(),
            arena: ArenaConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

/// Load the config from `path` and apply environment overrides.
pub fn load(path: &Path) -> Result<Config, String> {
    let mut cfg = load_from(path)?;
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Load the config from `path`, falling back to defaults when the file does
/// not exist.
pub(crate) fn load_from(path: &Path) -> Result<Config, String> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))
}

/// Render `cfg` as TOML, e.g. to bootstrap a config file.
pub fn to_toml(cfg: &Config) -> Result<String, String> {
    toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))
}

/// Apply environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `RETRIEVER_METRICS_PATH` | `metrics_path` |
/// | `RETRIEVER_LOG_FORMAT` | `telemetry.format` (`compact` or `json`) |
/// | `OTEL_EXPORTER_OTLP_ENDPOINT` | `telemetry.otlp_endpoint` |
/// | `RETRIEVER_REALTIME` | `arena.realtime` (`1`/`true` or `0`/`false`) |
///
/// Unparseable values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("RETRIEVER_METRICS_PATH") {
        cfg.metrics_path = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("RETRIEVER_LOG_FORMAT")
        && let Ok(format) = v.parse::<LogFormat>()
    {
        cfg.telemetry.format = format;
    }
    if let Ok(v) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        && !v.trim().is_empty()
    {
        cfg.telemetry.otlp_endpoint = Some(v);
    }
    if let Ok(v) = std::env::var("RETRIEVER_REALTIME") {
        match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" => cfg.arena.realtime = true,
            "0" | "false" => cfg.arena.realtime = false,
            _ => {}
        }
    }
}
