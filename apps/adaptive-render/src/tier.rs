//! Capability tiers: the ordinal classification everything else keys off.
//!
//! Ordering is most capable first: `High < Mid < Low < VeryLow` under `Ord`,
//! so "a worse tier" is always the greater value. `VeryLow` is the floor.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How much visual-effect cost the current device can sustain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CapabilityTier {
    High,
    Mid,
    Low,
    VeryLow,
}

impl CapabilityTier {
    /// All tiers, best first.
    pub const ALL: [CapabilityTier; 4] = [
        CapabilityTier::High,
        CapabilityTier::Mid,
        CapabilityTier::Low,
        CapabilityTier::VeryLow,
    ];

    /// Tier used whenever the pipeline cannot reach a measured decision.
    pub const SAFE_DEFAULT: CapabilityTier = CapabilityTier::Low;

    /// CSS class placed on the document root while this tier is active.
    pub const fn marker_class(self) -> &'static str {
        match self {
            Self::High => "gpu-high",
            Self::Mid => "gpu-mid",
            Self::Low => "gpu-low",
            Self::VeryLow => "gpu-verylow",
        }
    }

    /// One step down the ordering, or `None` at the floor.
    pub const fn demoted(self) -> Option<CapabilityTier> {
        match self {
            Self::High => Some(Self::Mid),
            Self::Mid => Some(Self::Low),
            Self::Low => Some(Self::VeryLow),
            Self::VeryLow => None,
        }
    }

    pub const fn is_floor(self) -> bool {
        matches!(self, Self::VeryLow)
    }

    /// Numeric severity, 0 for `High` up to 3 for `VeryLow`.
    pub const fn severity(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Mid => 1,
            Self::Low => 2,
            Self::VeryLow => 3,
        }
    }

    /// The less capable of two tiers.
    pub fn cap(self, ceiling: CapabilityTier) -> CapabilityTier {
        self.max(ceiling)
    }

    pub fn all_marker_classes() -> impl Iterator<Item = &'static str> {
        Self::ALL.iter().map(|tier| tier.marker_class())
    }
}

impl fmt::Display for CapabilityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::High => "High",
            Self::Mid => "Mid",
            Self::Low => "Low",
            Self::VeryLow => "VeryLow",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown capability tier: {0}")]
pub struct UnknownTier(pub String);

impl FromStr for CapabilityTier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "High" => Ok(Self::High),
            "Mid" => Ok(Self::Mid),
            "Low" => Ok(Self::Low),
            "VeryLow" => Ok(Self::VeryLow),
            other => Err(UnknownTier(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_best_first() {
        assert!(CapabilityTier::High < CapabilityTier::Mid);
        assert!(CapabilityTier::Mid < CapabilityTier::Low);
        assert!(CapabilityTier::Low < CapabilityTier::VeryLow);
    }

    #[test]
    fn test_demotion_chain_stops_at_floor() {
        let mut tier = CapabilityTier::High;
        let mut steps = 0;
        while let Some(next) = tier.demoted() {
            tier = next;
            steps += 1;
        }
        assert_eq!(tier, CapabilityTier::VeryLow);
        assert_eq!(steps, 3);
        assert!(tier.is_floor());
    }

    #[test]
    fn test_marker_classes_unique() {
        let classes: std::collections::HashSet<_> = CapabilityTier::all_marker_classes().collect();
        assert_eq!(classes.len(), 4);
    }

    #[test]
    fn test_cap_picks_worse_tier() {
        assert_eq!(
            CapabilityTier::High.cap(CapabilityTier::Mid),
            CapabilityTier::Mid
        );
        assert_eq!(
            CapabilityTier::VeryLow.cap(CapabilityTier::Mid),
            CapabilityTier::VeryLow
        );
    }

    #[test]
    fn test_serde_uses_tier_names() {
        let json = serde_json::to_string(&CapabilityTier::VeryLow).unwrap();
        assert_eq!(json, "\"VeryLow\"");
        let parsed: CapabilityTier = serde_json::from_str("\"Mid\"").unwrap();
        assert_eq!(parsed, CapabilityTier::Mid);
    }

    #[test]
    fn test_from_str_roundtrips_display() {
        for tier in CapabilityTier::ALL {
            assert_eq!(tier.to_string().parse::<CapabilityTier>(), Ok(tier));
        }
        assert!("gpu-high".parse::<CapabilityTier>().is_err());
    }
}
