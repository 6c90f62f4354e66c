//! Adaptive fallback: one-directional demotion on sustained low frame rate.
//!
//! States are the four tiers. The only transition is a one-step demotion once
//! `low_windows_to_demote` consecutive windows fall below the floor; `VeryLow`
//! is terminal. There is no promotion within a session.

use tracing::{debug, warn};

use crate::config::MonitorConfig;
use crate::tier::CapabilityTier;

#[derive(Debug, Clone)]
pub struct FallbackMonitor {
    tier: CapabilityTier,
    low_streak: u32,
    config: MonitorConfig,
}

impl FallbackMonitor {
    pub fn new(tier: CapabilityTier, config: MonitorConfig) -> Self {
        Self {
            tier,
            low_streak: 0,
            config,
        }
    }

    pub fn tier(&self) -> CapabilityTier {
        self.tier
    }

    pub fn low_streak(&self) -> u32 {
        self.low_streak
    }

    /// Nothing left to demote; the driving loop can stop.
    pub fn is_finished(&self) -> bool {
        self.tier.is_floor()
    }

    /// Forgets the current run of low windows (page hidden).
    pub fn reset_streak(&mut self) {
        self.low_streak = 0;
    }

    /// Feeds one window's fps. Returns the new tier when this window
    /// triggered a demotion.
    pub fn observe_window(&mut self, fps: f64) -> Option<CapabilityTier> {
        if self.is_finished() {
            return None;
        }

        // NaN is not "at or above the floor".
        if fps >= self.config.floor_fps {
            self.low_streak = 0;
            return None;
        }

        self.low_streak += 1;
        debug!(fps, streak = self.low_streak, "Low frame-rate window");
        if self.low_streak < self.config.low_windows_to_demote {
            return None;
        }

        self.low_streak = 0;
        let next = self.tier.demoted()?;
        warn!(from = %self.tier, to = %next, fps, "Sustained low frame rate, demoting tier");
        self.tier = next;
        Some(next)
    }
}
