//! Coarse hardware hints: approximate memory and logical core count.

use serde::{Deserialize, Serialize};

use crate::config::HardwareDefaults;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HardwareHints {
    pub device_memory_gb: f64,
    pub logical_cores: u32,
}

impl Default for HardwareHints {
    fn default() -> Self {
        let defaults = HardwareDefaults::default();
        Self {
            device_memory_gb: defaults.device_memory_gb,
            logical_cores: defaults.logical_cores,
        }
    }
}

/// Best-effort environment introspection. `None` means "not exposed".
pub trait HardwareProbe {
    fn device_memory_gb(&self) -> Option<f64>;
    fn logical_cores(&self) -> Option<u32>;
}

/// Fixed hints, for tests and hosts that know their device class.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticHardware {
    pub device_memory_gb: Option<f64>,
    pub logical_cores: Option<u32>,
}

impl StaticHardware {
    pub fn new(device_memory_gb: f64, logical_cores: u32) -> Self {
        Self {
            device_memory_gb: Some(device_memory_gb),
            logical_cores: Some(logical_cores),
        }
    }

    pub fn unknown() -> Self {
        Self::default()
    }
}

impl HardwareProbe for StaticHardware {
    fn device_memory_gb(&self) -> Option<f64> {
        self.device_memory_gb
    }

    fn logical_cores(&self) -> Option<u32> {
        self.logical_cores
    }
}

/// Fills gaps (and nonsense values) with the configured mid-range defaults.
pub fn read_hints(probe: &dyn HardwareProbe, defaults: &HardwareDefaults) -> HardwareHints {
    HardwareHints {
        device_memory_gb: probe
            .device_memory_gb()
            .filter(|gb| gb.is_finite() && *gb > 0.0)
            .unwrap_or(defaults.device_memory_gb),
        logical_cores: probe
            .logical_cores()
            .filter(|cores| *cores > 0)
            .unwrap_or(defaults.logical_cores),
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use native::SysinfoProbe;

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use sysinfo::System;

    use super::HardwareProbe;

    const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

    /// Reads total memory through `sysinfo` and cores through the standard
    /// library's parallelism query.
    pub struct SysinfoProbe {
        system: System,
    }

    impl SysinfoProbe {
        pub fn new() -> Self {
            let mut system = System::new();
            system.refresh_memory();
            Self { system }
        }
    }

    impl Default for SysinfoProbe {
        fn default() -> Self {
            Self::new()
        }
    }

    impl HardwareProbe for SysinfoProbe {
        fn device_memory_gb(&self) -> Option<f64> {
            match self.system.total_memory() {
                0 => None,
                bytes => Some(bytes as f64 / BYTES_PER_GB),
            }
        }

        fn logical_cores(&self) -> Option<u32> {
            std::thread::available_parallelism()
                .ok()
                .and_then(|n| u32::try_from(n.get()).ok())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_hints_use_defaults() {
        let hints = read_hints(&StaticHardware::unknown(), &HardwareDefaults::default());
        assert_eq!(hints, HardwareHints::default());
        assert_eq!(hints.device_memory_gb, 4.0);
        assert_eq!(hints.logical_cores, 4);
    }

    #[test]
    fn test_nonsense_hints_use_defaults() {
        let probe = StaticHardware {
            device_memory_gb: Some(f64::NAN),
            logical_cores: Some(0),
        };
        assert_eq!(
            read_hints(&probe, &HardwareDefaults::default()),
            HardwareHints::default()
        );
    }

    #[test]
    fn test_present_hints_pass_through() {
        let hints = read_hints(&StaticHardware::new(16.0, 12), &HardwareDefaults::default());
        assert_eq!(hints.device_memory_gb, 16.0);
        assert_eq!(hints.logical_cores, 12);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_sysinfo_probe_reports_something() {
        let probe = SysinfoProbe::new();
        if let Some(gb) = probe.device_memory_gb() {
            assert!(gb > 0.0);
        }
        assert!(probe.logical_cores().unwrap_or(1) >= 1);
    }
}
