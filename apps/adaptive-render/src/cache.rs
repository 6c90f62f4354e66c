//! Durable tier cache: one storage key holding `{"tier": ..., "timestamp": ...}`.
//!
//! Storage is best-effort. Read failures, corrupt values and expired records
//! all read as a miss; write failures are logged and dropped.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::WallClock;
use crate::errors::StorageError;
use crate::storage::KeyValueStore;
use crate::tier::CapabilityTier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedTierRecord {
    pub tier: CapabilityTier,
    /// Epoch milliseconds at write time.
    pub timestamp: i64,
}

pub struct TierCache<'a> {
    store: &'a dyn KeyValueStore,
    clock: &'a dyn WallClock,
    key: &'a str,
    ttl_ms: i64,
}

impl<'a> TierCache<'a> {
    pub fn new(
        store: &'a dyn KeyValueStore,
        clock: &'a dyn WallClock,
        key: &'a str,
        ttl_ms: i64,
    ) -> Self {
        Self {
            store,
            clock,
            key,
            ttl_ms,
        }
    }

    /// The cached tier, if a fresh, well-formed record exists.
    pub fn get_cached_tier(&self) -> Option<CapabilityTier> {
        let raw = match self.store.get(self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                debug!(error = %e, "Tier cache unreadable, treating as miss");
                return None;
            }
        };

        let record: CachedTierRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                debug!(error = %e, "Discarding corrupt tier cache record");
                if let Err(e) = self.store.remove(self.key) {
                    debug!(error = %e, "Could not remove corrupt tier cache record");
                }
                return None;
            }
        };

        let age = self.clock.now_epoch_ms() - record.timestamp;
        // A record from the future (clock moved backwards) is not trusted.
        if !(0..=self.ttl_ms).contains(&age) {
            debug!(age_ms = age, "Tier cache record expired");
            return None;
        }
        Some(record.tier)
    }

    /// Overwrites the record with `tier` stamped now. Never fails.
    pub fn set_cached_tier(&self, tier: CapabilityTier) {
        let record = CachedTierRecord {
            tier,
            timestamp: self.clock.now_epoch_ms(),
        };
        let result = serde_json::to_string(&record)
            .map_err(StorageError::from)
            .and_then(|json| self.store.set(self.key, &json));
        if let Err(e) = result {
            warn!(tier = %tier, error = %e, "Failed to persist capability tier");
        }
    }
}
