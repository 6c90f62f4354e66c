//! Decision engine: a threshold ladder over the benchmark reading.
//!
//! The effective frame rate is the worse of the synthetic and real samples.
//! Each band requires fps at or above its floor and cpu time and heaviness
//! strictly below its ceilings; the first band met wins, otherwise `VeryLow`.
//! Hardware hints can only lower the result.

use serde::{Deserialize, Serialize};

use crate::benchmark::BenchmarkReading;
use crate::tier::CapabilityTier;

/// Requirements for one tier of the ladder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierBand {
    pub min_fps: f64,
    pub max_cpu_ms: f64,
    pub max_heaviness: f64,
}

impl TierBand {
    fn admits(&self, fps: f64, cpu_ms: f64, heaviness: f64) -> bool {
        fps >= self.min_fps && cpu_ms < self.max_cpu_ms && heaviness < self.max_heaviness
    }
}

/// Device-class ceilings derived from memory and core count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HardwareCeilings {
    /// At or below either limit the tier is at most `Low`.
    pub weak_memory_gb: f64,
    pub weak_cores: u32,
    /// Below either limit the tier is at most `Mid`.
    pub modest_memory_gb: f64,
    pub modest_cores: u32,
}

impl HardwareCeilings {
    pub fn ceiling(&self, memory_gb: f64, cores: u32) -> CapabilityTier {
        if memory_gb <= self.weak_memory_gb || cores <= self.weak_cores {
            CapabilityTier::Low
        } else if memory_gb < self.modest_memory_gb || cores < self.modest_cores {
            CapabilityTier::Mid
        } else {
            CapabilityTier::High
        }
    }
}

impl Default for HardwareCeilings {
    fn default() -> Self {
        Self {
            weak_memory_gb: 2.0,
            weak_cores: 2,
            modest_memory_gb: 4.0,
            modest_cores: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TierThresholds {
    pub high: TierBand,
    pub mid: TierBand,
    pub low: TierBand,
    pub hardware: HardwareCeilings,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            high: TierBand {
                min_fps: 55.0,
                max_cpu_ms: 25.0,
                max_heaviness: 600.0,
            },
            mid: TierBand {
                min_fps: 45.0,
                max_cpu_ms: 40.0,
                max_heaviness: 1200.0,
            },
            low: TierBand {
                min_fps: 30.0,
                max_cpu_ms: 70.0,
                max_heaviness: 2200.0,
            },
            hardware: HardwareCeilings::default(),
        }
    }
}

/// NaN reads as the worst value of its axis so the ladder stays total.
fn sanitize(value: f64, worst: f64) -> f64 {
    if value.is_nan() {
        worst
    } else {
        value
    }
}

/// Pure, deterministic, total: every reading maps to exactly one tier.
pub fn decide_tier(reading: &BenchmarkReading, thresholds: &TierThresholds) -> CapabilityTier {
    let fps = sanitize(reading.synthetic_fps, 0.0).min(sanitize(reading.real_fps, 0.0));
    let cpu_ms = sanitize(reading.cpu_ms, f64::INFINITY);
    let heaviness = sanitize(reading.heaviness, f64::INFINITY);

    let measured = [
        (CapabilityTier::High, &thresholds.high),
        (CapabilityTier::Mid, &thresholds.mid),
        (CapabilityTier::Low, &thresholds.low),
    ]
    .into_iter()
    .find(|(_, band)| band.admits(fps, cpu_ms, heaviness))
    .map_or(CapabilityTier::VeryLow, |(tier, _)| tier);

    let ceiling = thresholds.hardware.ceiling(
        sanitize(reading.hardware.device_memory_gb, 0.0),
        reading.hardware.logical_cores,
    );
    measured.cap(ceiling)
}
