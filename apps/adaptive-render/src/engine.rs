//! Orchestration: cache lookup → benchmarks → decision → degradation, then the
//! fallback monitor.
//!
//! `AdaptiveRenderer` owns every piece of mutable engine state (current tier,
//! heavy-element list, applied inline values). `boot` is the top-level entry
//! point and never fails: any pipeline error resolves to the safe default tier.

use std::rc::Rc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::benchmark::{BenchmarkReading, FrameCounter, Probe};
use crate::cache::TierCache;
use crate::clock::{FrameScheduler, WallClock};
use crate::config::EngineConfig;
use crate::decision::decide_tier;
use crate::degrade::{ApplyReport, Degrader};
use crate::dom::{scan_document, Document, HeavyElement};
use crate::errors::EngineError;
use crate::monitor::FallbackMonitor;
use crate::page::PageSignals;
use crate::storage::KeyValueStore;
use crate::tier::CapabilityTier;

/// The browser-side collaborators the engine drives.
pub struct Host {
    pub document: Box<dyn Document>,
    pub frames: Rc<dyn FrameScheduler>,
    pub storage: Box<dyn KeyValueStore>,
    pub clock: Box<dyn WallClock>,
    pub page: Rc<dyn PageSignals>,
}

/// Where the booted tier came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TierSource {
    Cache,
    Benchmark,
    /// No usable canvas; assumed constrained without measuring.
    Constrained,
    /// The pipeline failed; safe default applied.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BootOutcome {
    pub tier: CapabilityTier,
    pub source: TierSource,
    pub reading: Option<BenchmarkReading>,
}

pub struct AdaptiveRenderer {
    config: EngineConfig,
    host: Host,
    probe: Box<dyn Probe>,
    degrader: Degrader,
    heavy: Vec<HeavyElement>,
    tier: Option<CapabilityTier>,
    outcome: Option<BootOutcome>,
}

impl AdaptiveRenderer {
    pub fn new(config: EngineConfig, host: Host, probe: Box<dyn Probe>) -> Self {
        Self {
            config,
            host,
            probe,
            degrader: Degrader::new(),
            heavy: Vec::new(),
            tier: None,
            outcome: None,
        }
    }

    /// Tier currently applied, `None` before the first application.
    pub fn current_tier(&self) -> Option<CapabilityTier> {
        self.tier
    }

    pub fn heavy_elements(&self) -> &[HeavyElement] {
        &self.heavy
    }

    pub fn document(&self) -> &dyn Document {
        self.host.document.as_ref()
    }

    /// Classifies the device and applies the tier. Runs the pipeline once;
    /// later calls return the first outcome.
    pub async fn boot(&mut self) -> BootOutcome {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }

        let outcome = match self.try_boot().await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Capability detection failed, applying safe default tier");
                let tier = CapabilityTier::SAFE_DEFAULT;
                self.apply(tier);
                BootOutcome {
                    tier,
                    source: TierSource::Fallback,
                    reading: None,
                }
            }
        };

        info!(
            tier = %outcome.tier,
            source = ?outcome.source,
            heavy_elements = self.heavy.len(),
            "Adaptive rendering ready"
        );
        self.outcome = Some(outcome.clone());
        outcome
    }

    async fn try_boot(&mut self) -> Result<BootOutcome, EngineError> {
        self.config.validate().map_err(EngineError::Internal)?;
        self.host.page.wait_ready().await;

        let scan = scan_document(
            self.host.document.as_mut(),
            &self.config.weights,
            self.config.heaviness_cap,
        );
        self.heavy = scan.elements;

        let cached = self.cache().get_cached_tier();
        if let Some(tier) = cached {
            info!(tier = %tier, "Using cached capability tier");
            self.apply(tier);
            return Ok(BootOutcome {
                tier,
                source: TierSource::Cache,
                reading: None,
            });
        }

        if !self.host.page.is_visible() {
            info!("Page hidden, deferring benchmarks until visible");
        }
        self.host.page.wait_until_visible().await;

        let probe = match self.probe.measure().await {
            Ok(probe) => probe,
            Err(e) if e.is_constrained_environment() => {
                warn!(error = %e, "Canvas benchmark unavailable, assuming constrained device");
                let tier = CapabilityTier::SAFE_DEFAULT;
                self.apply(tier);
                return Ok(BootOutcome {
                    tier,
                    source: TierSource::Constrained,
                    reading: None,
                });
            }
            Err(e) => return Err(e.into()),
        };

        let reading = BenchmarkReading::new(probe, scan.heaviness);
        let tier = decide_tier(&reading, &self.config.thresholds);
        info!(
            tier = %tier,
            synthetic_fps = reading.synthetic_fps,
            real_fps = reading.real_fps,
            cpu_ms = reading.cpu_ms,
            heaviness = reading.heaviness,
            "Capability tier decided"
        );

        self.cache().set_cached_tier(tier);
        self.apply(tier);
        Ok(BootOutcome {
            tier,
            source: TierSource::Benchmark,
            reading: Some(reading),
        })
    }

    /// Samples frame rate per window and demotes on sustained low fps until
    /// the floor tier. Boots first if needed. Windows sampled while the page
    /// is hidden are discarded. Returns the final tier.
    pub async fn run_fallback_loop(&mut self) -> CapabilityTier {
        let start = self.boot().await.tier;
        let mut monitor = FallbackMonitor::new(
            self.tier.unwrap_or(start),
            self.config.monitor.clone(),
        );
        let mut counter = FrameCounter::new(self.config.monitor.window_ms);
        let frames = Rc::clone(&self.host.frames);
        let page = Rc::clone(&self.host.page);

        info!(tier = %monitor.tier(), "Fallback monitor started");
        while !monitor.is_finished() {
            let timestamp = frames.next_frame().await;
            if !page.is_visible() {
                monitor.reset_streak();
                counter.reset();
                page.wait_until_visible().await;
                continue;
            }
            if let Some(fps) = counter.record(timestamp) {
                if let Some(next) = monitor.observe_window(fps) {
                    self.apply(next);
                }
            }
        }

        info!("Fallback monitor reached the floor tier, stopping");
        monitor.tier()
    }

    fn cache(&self) -> TierCache<'_> {
        TierCache::new(
            self.host.storage.as_ref(),
            self.host.clock.as_ref(),
            &self.config.cache_key,
            self.config.cache_ttl_ms,
        )
    }

    fn apply(&mut self, tier: CapabilityTier) -> ApplyReport {
        let report = self
            .degrader
            .apply_tier(self.host.document.as_mut(), tier, &self.heavy);
        self.tier = Some(tier);
        report
    }
}
