//! Capability benchmarking: synthetic canvas fps, real fps, CPU loop timing
//! and hardware hints. The DOM heaviness score lives in `dom::scan` and is
//! merged in by the caller.
//!
//! `Probe` is the seam the orchestrator calls through, so a counting or
//! scripted probe can stand in for the real one.

pub mod canvas;
pub mod cpu;
pub mod frames;
pub mod hardware;

use std::rc::Rc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::FrameScheduler;
use crate::config::EngineConfig;
use crate::errors::BenchmarkError;

pub use canvas::{synthetic_fps, Canvas2d, CanvasFactory, MemoryCanvas, MemoryCanvasFactory};
pub use cpu::measure_cpu_ms;
pub use frames::{sample_real_fps, FrameCounter};
pub use hardware::{read_hints, HardwareHints, HardwareProbe, StaticHardware};

#[cfg(not(target_arch = "wasm32"))]
pub use hardware::SysinfoProbe;

// ────────────────────────────────────────────────────────────────────────────
// Readings
// ────────────────────────────────────────────────────────────────────────────

/// Output of the timing probes, before the DOM score is attached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbeReading {
    pub synthetic_fps: f64,
    pub real_fps: f64,
    pub cpu_ms: f64,
    pub hardware: HardwareHints,
}

/// Everything the decision engine looks at. Produced once per session
/// (unless the cache hits) and discarded after the decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReading {
    pub synthetic_fps: f64,
    pub real_fps: f64,
    pub cpu_ms: f64,
    pub heaviness: f64,
    pub hardware: HardwareHints,
}

impl BenchmarkReading {
    pub fn new(probe: ProbeReading, heaviness: f64) -> Self {
        Self {
            synthetic_fps: probe.synthetic_fps,
            real_fps: probe.real_fps,
            cpu_ms: probe.cpu_ms,
            heaviness,
            hardware: probe.hardware,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Probe trait
// ────────────────────────────────────────────────────────────────────────────

#[async_trait(?Send)]
pub trait Probe {
    /// Suspends while samples are collected.
    async fn measure(&self) -> Result<ProbeReading, BenchmarkError>;
}

#[async_trait(?Send)]
impl<T: Probe + ?Sized> Probe for Rc<T> {
    async fn measure(&self) -> Result<ProbeReading, BenchmarkError> {
        (**self).measure().await
    }
}

// ────────────────────────────────────────────────────────────────────────────
// EnvironmentProbe: the real measurement
// ────────────────────────────────────────────────────────────────────────────

pub struct EnvironmentProbe {
    frames: Rc<dyn FrameScheduler>,
    canvases: Box<dyn CanvasFactory>,
    hardware: Box<dyn HardwareProbe>,
    config: EngineConfig,
}

impl EnvironmentProbe {
    pub fn new(
        frames: Rc<dyn FrameScheduler>,
        canvases: Box<dyn CanvasFactory>,
        hardware: Box<dyn HardwareProbe>,
        config: EngineConfig,
    ) -> Self {
        Self {
            frames,
            canvases,
            hardware,
            config,
        }
    }
}

#[async_trait(?Send)]
impl Probe for EnvironmentProbe {
    async fn measure(&self) -> Result<ProbeReading, BenchmarkError> {
        let synthetic = &self.config.synthetic;
        let mut canvas = self
            .canvases
            .create_canvas(synthetic.canvas_width, synthetic.canvas_height)?;

        let cpu_ms = measure_cpu_ms(self.frames.as_ref(), self.config.cpu_iterations);

        // Both samplers ride the same frame callbacks, awaited jointly.
        let (synthetic_fps, real_fps) = tokio::join!(
            synthetic_fps(self.frames.as_ref(), canvas.as_mut(), synthetic),
            sample_real_fps(self.frames.as_ref(), self.config.real_fps_window_ms),
        );

        let hardware = read_hints(self.hardware.as_ref(), &self.config.hardware_defaults);

        debug!(
            synthetic_fps,
            real_fps,
            cpu_ms,
            device_memory_gb = hardware.device_memory_gb,
            logical_cores = hardware.logical_cores,
            "Benchmarks complete"
        );

        Ok(ProbeReading {
            synthetic_fps,
            real_fps,
            cpu_ms,
            hardware,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::clock::TokioFrameClock;

    fn probe(factory: MemoryCanvasFactory, hz: f64) -> EnvironmentProbe {
        EnvironmentProbe::new(
            Rc::new(TokioFrameClock::new(hz)),
            Box::new(factory),
            Box::new(StaticHardware::new(8.0, 8)),
            EngineConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_measure_on_healthy_display() {
        let factory = MemoryCanvasFactory::new();
        let reading = probe(factory.clone(), 60.0).measure().await.unwrap();

        assert!(reading.synthetic_fps >= 55.0, "{reading:?}");
        assert!((reading.real_fps - 60.0).abs() < 1.5, "{reading:?}");
        assert_eq!(reading.hardware.logical_cores, 8);
        assert_eq!(factory.canvases_created(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_measure_on_struggling_display() {
        let reading = probe(MemoryCanvasFactory::new(), 24.0)
            .measure()
            .await
            .unwrap();
        assert!(reading.synthetic_fps < 30.0, "{reading:?}");
        assert!(reading.real_fps < 30.0, "{reading:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_measure_completes_below_one_fps() {
        let probe = EnvironmentProbe::new(
            Rc::new(TokioFrameClock::with_period(Duration::from_millis(1500))),
            Box::new(MemoryCanvasFactory::new()),
            Box::new(StaticHardware::new(8.0, 8)),
            EngineConfig::default(),
        );
        let reading = tokio::time::timeout(Duration::from_secs(30), probe.measure())
            .await
            .expect("measurement must finish")
            .unwrap();
        assert_eq!(reading.synthetic_fps, 0.0);
        assert!(reading.real_fps < 1.0, "{reading:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_canvas_is_an_error() {
        let result = probe(MemoryCanvasFactory::unavailable(), 60.0).measure().await;
        assert!(matches!(result, Err(BenchmarkError::CanvasUnavailable)));
    }

    #[test]
    fn test_reading_merges_heaviness() {
        let reading = BenchmarkReading::new(
            ProbeReading {
                synthetic_fps: 60.0,
                real_fps: 58.0,
                cpu_ms: 10.0,
                hardware: HardwareHints::default(),
            },
            50.0,
        );
        assert_eq!(reading.heaviness, 50.0);
        assert_eq!(reading.real_fps, 58.0);
    }
}
