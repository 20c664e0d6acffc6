//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SimError};
use crate::telemetry::walk::{CounterRange, WalkBounds};

/// Highest rounding precision accepted for any metric.
pub const MAX_PRECISION: u32 = 6;

/// Full simulator configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct SimConfig {
    pub simulator: SimulatorConfig,
    pub telemetry: TelemetryConfig,
    pub logging: LoggingConfig,
}

/// Store bootstrap knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Fixed RNG seed; `None` seeds from OS entropy.
    pub seed: Option<u64>,
    /// JSON file replacing the built-in baseline fixture.
    pub baseline_file: Option<PathBuf>,
    /// Path the configuration was loaded from.
    pub config_file: PathBuf,
}

/// Per-metric walk bounds for the telemetry synthesizers.
///
/// CPU and disk bounds are percentages. Memory and pool bounds are fractions of
/// the total capacity. Network bounds are in Mbps, converted into each
/// interface's bandwidth unit and capped by its link speed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TelemetryConfig {
    pub cpu: WalkBounds,
    pub memory: WalkBounds,
    pub disk: WalkBounds,
    pub network: WalkBounds,
    pub pool: WalkBounds,
    pub io: IoIncrementConfig,
}

/// Per-call increment ranges for cumulative disk IO counters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IoIncrementConfig {
    pub read_count: CounterRange,
    pub write_count: CounterRange,
    pub read_bytes: CounterRange,
    pub write_bytes: CounterRange,
    pub read_time: CounterRange,
    pub write_time: CounterRange,
    pub busy_time: CounterRange,
}

/// JSONL request log settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub jsonl_log: PathBuf,
    pub fallback_path: Option<PathBuf>,
    pub max_size_bytes: u64,
    pub max_rotated_files: u32,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            cpu: WalkBounds::new(3.0, 97.0, 10.0, 1),
            memory: WalkBounds::new(0.25, 0.90, 0.04, 1),
            disk: WalkBounds::new(5.0, 95.0, 1.5, 1),
            network: WalkBounds::new(0.0, 10_000.0, 50.0, 2),
            pool: WalkBounds::new(0.0, 0.95, 0.01, 2),
            io: IoIncrementConfig::default(),
        }
    }
}

impl Default for IoIncrementConfig {
    fn default() -> Self {
        Self {
            read_count: CounterRange::new(0.0, 250.0),
            write_count: CounterRange::new(0.0, 180.0),
            read_bytes: CounterRange::new(0.0, 8.0 * 1024.0 * 1024.0),
            write_bytes: CounterRange::new(0.0, 6.0 * 1024.0 * 1024.0),
            read_time: CounterRange::new(0.0, 60.0),
            write_time: CounterRange::new(0.0, 80.0),
            busy_time: CounterRange::new(0.0, 120.0),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!("[SCSIM-CONFIG] WARNING: HOME not set, falling back to /tmp for log paths");
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        let data = home_dir.join(".local").join("share").join("scsim");
        Self {
            enabled: false,
            jsonl_log: data.join("requests.jsonl"),
            fallback_path: None,
            max_size_bytes: 16 * 1024 * 1024,
            max_rotated_files: 3,
        }
    }
}

impl SimConfig {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        let home_dir = env::var_os("HOME").map_or_else(|| PathBuf::from("/tmp"), PathBuf::from);
        home_dir.join(".config").join("scsim").join("config.toml")
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| SimError::Io {
                path: path_buf.clone(),
                source,
            })?;
            Self::from_toml_str(&raw)?
        } else if is_explicit_path {
            return Err(SimError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.simulator.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a TOML document without touching the environment.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Deterministic hash of the effective config for logging.
    ///
    /// FNV-1a over canonical JSON so the value is stable across processes.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    fn apply_env_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("SCSIM_SEED") {
            self.simulator.seed = Some(parse_env_u64("SCSIM_SEED", &raw)?);
        }
        if let Some(raw) = lookup("SCSIM_BASELINE_FILE") {
            self.simulator.baseline_file = Some(PathBuf::from(raw));
        }

        if let Some(raw) = lookup("SCSIM_LOG_ENABLED") {
            self.logging.enabled = parse_env_bool("SCSIM_LOG_ENABLED", &raw)?;
        }
        if let Some(raw) = lookup("SCSIM_LOG_PATH") {
            self.logging.jsonl_log = PathBuf::from(raw);
        }

        for (prefix, bounds) in [
            ("SCSIM_CPU", &mut self.telemetry.cpu),
            ("SCSIM_MEMORY", &mut self.telemetry.memory),
            ("SCSIM_DISK", &mut self.telemetry.disk),
            ("SCSIM_NETWORK", &mut self.telemetry.network),
            ("SCSIM_POOL", &mut self.telemetry.pool),
        ] {
            apply_bounds_overrides(prefix, bounds, &lookup)?;
        }
        Ok(())
    }

    /// Check cross-field constraints; `load` calls this after env overrides.
    pub fn validate(&self) -> Result<()> {
        let t = &self.telemetry;
        for (name, bounds) in [
            ("cpu", &t.cpu),
            ("memory", &t.memory),
            ("disk", &t.disk),
            ("network", &t.network),
            ("pool", &t.pool),
        ] {
            validate_bounds(name, bounds)?;
        }

        for (name, lo, hi) in [("cpu", t.cpu.min, t.cpu.max), ("disk", t.disk.min, t.disk.max)] {
            if lo < 0.0 || hi > 100.0 {
                return Err(SimError::InvalidConfig {
                    details: format!("telemetry.{name} bounds must lie in [0, 100]"),
                });
            }
        }
        for (name, lo, hi) in [
            ("memory", t.memory.min, t.memory.max),
            ("pool", t.pool.min, t.pool.max),
        ] {
            if lo < 0.0 || hi > 1.0 {
                return Err(SimError::InvalidConfig {
                    details: format!("telemetry.{name} bounds are fractions and must lie in [0, 1]"),
                });
            }
        }
        if t.network.min < 0.0 {
            return Err(SimError::InvalidConfig {
                details: "telemetry.network.min must be >= 0".to_string(),
            });
        }

        for (name, range) in [
            ("read_count", &t.io.read_count),
            ("write_count", &t.io.write_count),
            ("read_bytes", &t.io.read_bytes),
            ("write_bytes", &t.io.write_bytes),
            ("read_time", &t.io.read_time),
            ("write_time", &t.io.write_time),
            ("busy_time", &t.io.busy_time),
        ] {
            if !(range.min_delta >= 0.0 && range.min_delta <= range.max_delta) {
                return Err(SimError::InvalidConfig {
                    details: format!(
                        "telemetry.io.{name} must satisfy 0 <= min_delta <= max_delta, got [{}, {}]",
                        range.min_delta, range.max_delta
                    ),
                });
            }
        }

        if self.logging.enabled && self.logging.max_size_bytes == 0 {
            return Err(SimError::InvalidConfig {
                details: "logging.max_size_bytes must be > 0".to_string(),
            });
        }

        Ok(())
    }
}

fn validate_bounds(name: &str, bounds: &WalkBounds) -> Result<()> {
    if !(bounds.min.is_finite() && bounds.max.is_finite() && bounds.max_step.is_finite()) {
        return Err(SimError::InvalidConfig {
            details: format!("telemetry.{name} bounds must be finite"),
        });
    }
    if bounds.min > bounds.max {
        return Err(SimError::InvalidConfig {
            details: format!(
                "telemetry.{name}.min ({}) must be <= max ({})",
                bounds.min, bounds.max
            ),
        });
    }
    if bounds.max_step < 0.0 {
        return Err(SimError::InvalidConfig {
            details: format!("telemetry.{name}.max_step must be >= 0"),
        });
    }
    if bounds.precision > MAX_PRECISION {
        return Err(SimError::InvalidConfig {
            details: format!(
                "telemetry.{name}.precision must be <= {MAX_PRECISION}, got {}",
                bounds.precision
            ),
        });
    }
    Ok(())
}

fn apply_bounds_overrides<F>(prefix: &str, bounds: &mut WalkBounds, lookup: &F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    for (suffix, slot) in [
        ("MIN", &mut bounds.min),
        ("MAX", &mut bounds.max),
        ("STEP", &mut bounds.max_step),
    ] {
        let name = format!("{prefix}_{suffix}");
        if let Some(raw) = lookup(&name) {
            *slot = parse_env_f64(&name, &raw)?;
        }
    }
    let name = format!("{prefix}_PRECISION");
    if let Some(raw) = lookup(&name) {
        bounds.precision = raw.parse::<u32>().map_err(|error| SimError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })?;
    }
    Ok(())
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env_f64(name: &str, raw: &str) -> Result<f64> {
    raw.parse::<f64>().map_err(|error| SimError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}

fn parse_env_u64(name: &str, raw: &str) -> Result<u64> {
    raw.parse::<u64>().map_err(|error| SimError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}

fn parse_env_bool(name: &str, raw: &str) -> Result<bool> {
    raw.parse::<bool>().map_err(|error| SimError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}
