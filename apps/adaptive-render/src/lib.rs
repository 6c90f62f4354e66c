//! Adaptive rendering: measures how much visual-effect cost the device can
//! sustain, classifies it into a capability tier and degrades expensive
//! effects (blur, shadows, transforms, animations) to match, demoting further
//! if the page keeps dropping frames.
//!
//! The browser is reached only through host traits (`Document`,
//! `FrameScheduler`, `KeyValueStore`, `PageSignals`, ...). Native
//! implementations back the tests and the `render-probe` binary; the `web`
//! feature binds them to `web-sys` on `wasm32`.

pub mod benchmark;
pub mod cache;
pub mod clock;
pub mod config;
pub mod css;
pub mod decision;
pub mod degrade;
pub mod dom;
pub mod engine;
pub mod errors;
pub mod monitor;
pub mod page;
pub mod storage;
pub mod tier;

#[cfg(all(target_arch = "wasm32", feature = "web"))]
pub mod web;

pub use benchmark::{BenchmarkReading, EnvironmentProbe, Probe, ProbeReading};
pub use cache::{CachedTierRecord, TierCache};
pub use config::EngineConfig;
pub use decision::{decide_tier, TierThresholds};
pub use degrade::{plan_mutations, ApplyReport, Degrader};
pub use dom::{scan_document, DomScan, HeavyElement};
pub use engine::{AdaptiveRenderer, BootOutcome, Host, TierSource};
pub use errors::EngineError;
pub use monitor::FallbackMonitor;
pub use tier::CapabilityTier;
