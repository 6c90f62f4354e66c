use serde::{Deserialize, Serialize};
use tracing::error;

use crate::decision::TierThresholds;
use crate::dom::HeavinessWeights;

const HOUR_MS: i64 = 60 * 60 * 1000;

/// Every tunable constant of the engine. Developer-facing only.
///
/// `Default` carries the calibrated values; the native `from_env` overrides a
/// subset from `ADAPTIVE_RENDER_*` variables. Deserializes with defaults for
/// missing fields so a web host can hand over a partial JSON object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Durable storage key holding the `{tier, timestamp}` record.
    pub cache_key: String,
    /// Records older than this are treated as absent. Always finite.
    pub cache_ttl_ms: i64,
    pub synthetic: SyntheticConfig,
    /// Wall-clock window of the real frame-rate sampler.
    pub real_fps_window_ms: f64,
    /// Iterations of the square-root accumulation loop.
    pub cpu_iterations: u32,
    pub weights: HeavinessWeights,
    /// Upper bound on the summed DOM heaviness score.
    pub heaviness_cap: f64,
    pub thresholds: TierThresholds,
    pub hardware_defaults: HardwareDefaults,
    pub monitor: MonitorConfig,
}

/// Off-DOM canvas draw-rate test parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub duration_ms: f64,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub rects_per_frame: u32,
    pub rect_size: f64,
    /// Measured fps is clamped to this to ignore very fast displays.
    pub fps_ceiling: f64,
}

/// Values assumed when the host exposes no hardware hints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareDefaults {
    pub device_memory_gb: f64,
    pub logical_cores: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Length of one sampling window.
    pub window_ms: f64,
    /// A window below this fps counts as a low second.
    pub floor_fps: f64,
    /// Consecutive low windows that trigger one demotion.
    pub low_windows_to_demote: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_key: "__cvforge_gpu_tier_v5".to_string(),
            cache_ttl_ms: 24 * HOUR_MS,
            synthetic: SyntheticConfig::default(),
            real_fps_window_ms: 1000.0,
            cpu_iterations: 50_000,
            weights: HeavinessWeights::default(),
            heaviness_cap: 5000.0,
            thresholds: TierThresholds::default(),
            hardware_defaults: HardwareDefaults::default(),
            monitor: MonitorConfig::default(),
        }
    }
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            duration_ms: 250.0,
            canvas_width: 320,
            canvas_height: 180,
            rects_per_frame: 30,
            rect_size: 40.0,
            fps_ceiling: 60.0,
        }
    }
}

impl Default for HardwareDefaults {
    fn default() -> Self {
        Self {
            device_memory_gb: 4.0,
            logical_cores: 4,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            window_ms: 1000.0,
            floor_fps: 40.0,
            low_windows_to_demote: 3,
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl EngineConfig {
    /// Defaults overlaid with `ADAPTIVE_RENDER_*` environment variables.
    /// Reads `.env` if present.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let mut config = Self::default();
        if let Some(key) = optional_env::<String>("ADAPTIVE_RENDER_CACHE_KEY")? {
            config.cache_key = key;
        }
        if let Some(hours) = optional_env::<i64>("ADAPTIVE_RENDER_CACHE_TTL_HOURS")? {
            config.cache_ttl_ms = ttl_from_hours(hours)?;
        }
        if let Some(ms) = optional_env::<f64>("ADAPTIVE_RENDER_SYNTHETIC_MS")? {
            config.synthetic.duration_ms = ms;
        }
        if let Some(iterations) = optional_env::<u32>("ADAPTIVE_RENDER_CPU_ITERATIONS")? {
            config.cpu_iterations = iterations;
        }
        if let Some(fps) = optional_env::<f64>("ADAPTIVE_RENDER_MONITOR_FLOOR_FPS")? {
            config.monitor.floor_fps = fps;
        }
        if let Some(windows) = optional_env::<u32>("ADAPTIVE_RENDER_MONITOR_LOW_WINDOWS")? {
            config.monitor.low_windows_to_demote = windows;
        }
        config.validate()?;
        Ok(config)
    }
}

impl EngineConfig {
    /// Parses a partial JSON config supplied by the embedding page. Malformed
    /// input is logged and replaced with defaults; `validate` still runs at boot.
    pub fn from_json_or_default(json: &str) -> Self {
        match serde_json::from_str(json) {
            Ok(config) => config,
            Err(e) => {
                error!(error = %e, "Invalid adaptive-render config, using defaults");
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.cache_ttl_ms > 0,
            "cache TTL must be positive, got {}ms",
            self.cache_ttl_ms
        );
        anyhow::ensure!(
            self.synthetic.duration_ms > 0.0,
            "synthetic benchmark duration must be positive"
        );
        anyhow::ensure!(
            self.real_fps_window_ms > 0.0 && self.monitor.window_ms > 0.0,
            "sampling windows must be positive"
        );
        anyhow::ensure!(
            self.monitor.low_windows_to_demote > 0,
            "monitor needs at least one low window before demoting"
        );
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn ttl_from_hours(hours: i64) -> anyhow::Result<i64> {
    use anyhow::Context;

    hours
        .checked_mul(HOUR_MS)
        .with_context(|| format!("Cache TTL of {hours} hours is out of range"))
}

#[cfg(not(target_arch = "wasm32"))]
fn optional_env<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    use anyhow::Context;

    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("Environment variable '{key}' has an invalid value")),
        Err(_) => Ok(None),
    }
}
