use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use crate::registry::Machine;

const DEFAULT_CONFIG_PATH: &str = "/config/floormon.yaml";

/// Idle threshold used when no valid override is supplied.
pub const DEFAULT_IDLE_THRESHOLD_MINUTES: u64 = 10;

/// Top-level configuration for the floormon agent.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "AppConfig::default_plant")]
    pub plant: String,
    #[serde(default)]
    pub sample_intervals: SampleIntervals,
    #[serde(default)]
    pub alerts: AlertRules,
    /// Optional machine list; falls back to the built-in floor layout.
    #[serde(default)]
    pub machines: Option<Vec<Machine>>,
    #[serde(default)]
    pub http: HttpConfig,
}

impl AppConfig {
    fn default_plant() -> String {
        "plant-1".into()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            plant: Self::default_plant(),
            sample_intervals: SampleIntervals::default(),
            alerts: AlertRules::default(),
            machines: None,
            http: HttpConfig::default(),
        }
    }
}

/// Loop schedule configuration (with friendly duration parsing).
#[derive(Debug, Clone, Deserialize)]
pub struct SampleIntervals {
    /// Counter simulator loop (stand-in for the telemetry feed).
    #[serde(
        default = "SampleIntervals::default_simulator",
        with = "humantime_serde"
    )]
    pub simulator: Duration,
    /// Stagnation detector loop. Deliberately faster than the simulator so
    /// idle-duration reporting stays responsive.
    #[serde(default = "SampleIntervals::default_detector", with = "humantime_serde")]
    pub detector: Duration,
}

impl SampleIntervals {
    const fn default_simulator() -> Duration {
        Duration::from_secs(12)
    }

    const fn default_detector() -> Duration {
        Duration::from_secs(3)
    }
}

impl Default for SampleIntervals {
    fn default() -> Self {
        Self {
            simulator: Self::default_simulator(),
            detector: Self::default_detector(),
        }
    }
}

/// Alerting rules for the stagnant-production detector.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertRules {
    #[serde(default = "AlertRules::default_idle_threshold_minutes")]
    pub idle_threshold_minutes: u64,
}

impl AlertRules {
    const fn default_idle_threshold_minutes() -> u64 {
        DEFAULT_IDLE_THRESHOLD_MINUTES
    }
}

impl Default for AlertRules {
    fn default() -> Self {
        Self {
            idle_threshold_minutes: Self::default_idle_threshold_minutes(),
        }
    }
}

/// HTTP listener configuration (bind address and frontend assets).
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "HttpConfig::default_bind")]
    pub bind: String,
    #[serde(default = "HttpConfig::default_static_dir")]
    pub static_dir: String,
}

impl HttpConfig {
    fn default_bind() -> String {
        "0.0.0.0:8282".to_string()
    }

    fn default_static_dir() -> String {
        "dashboard/dist".to_string()
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: Self::default_bind(),
            static_dir: Self::default_static_dir(),
        }
    }
}

/// Load configuration from a YAML file, falling back to defaults + env overrides.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let target_path = if let Some(path) = path {
        path.to_path_buf()
    } else if let Ok(env_path) = env::var("FLOORMON_CONFIG") {
        PathBuf::from(env_path)
    } else {
        PathBuf::from(DEFAULT_CONFIG_PATH)
    };

    let mut config = match try_parse_file(&target_path)? {
        Some(cfg) => {
            info!(path = %target_path.display(), "loaded configuration");
            cfg
        }
        None => {
            warn!(path = %target_path.display(), "config file not found; using built-in defaults");
            AppConfig::default()
        }
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

fn try_parse_file(path: &Path) -> Result<Option<AppConfig>> {
    match fs::read_to_string(path) {
        Ok(raw) => {
            let cfg = serde_yaml::from_str(&raw)
                .with_context(|| format!("failed to parse YAML config at {}", path.display()))?;
            Ok(Some(cfg))
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => {
            Err(err).with_context(|| format!("failed to read config file at {}", path.display()))
        }
    }
}

fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(plant) = env::var("FLOORMON_PLANT") {
        if !plant.is_empty() {
            config.plant = plant;
        }
    }

    if let Ok(raw) = env::var("FLOORMON_IDLE_MIN") {
        config.alerts.idle_threshold_minutes =
            resolve_idle_threshold(&raw, config.alerts.idle_threshold_minutes);
    }
}

/// Resolve an externally supplied idle threshold. Anything that is not a
/// finite positive number falls back to the configured default; valid values
/// are rounded to whole minutes.
pub fn resolve_idle_threshold(raw: &str, default: u64) -> u64 {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => value.round() as u64,
        _ => {
            warn!(raw, default, "invalid idle threshold override; using default");
            default
        }
    }
}
