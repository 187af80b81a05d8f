//! Engine counters
//!
//! Plain counters bumped from the cycle path. The engine is owned by a single
//! driver, so there is nothing to synchronize; callers read a copy through
//! [`PipelineEngine::stats`](crate::PipelineEngine::stats).

use serde::{Deserialize, Serialize};

/// Counter snapshot for one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngineStats {
    /// Cycles elapsed
    pub cycles: u64,
    /// External samples admitted at Fetch
    pub samples_admitted: u64,
    /// Samples rejected for naming an unknown channel
    pub samples_rejected: u64,
    /// Injections admitted at Fetch
    pub injections_admitted: u64,
    /// Valid events emitted at Writeback
    pub events_emitted: u64,
    /// Events dropped by a clear pulse or reset, at any stage
    pub events_flushed: u64,
    /// Emitted outputs pinned to `min` or `max`
    pub saturations: u64,
    /// Configuration writes presented
    pub config_writes: u64,
    /// Cycles with reset asserted
    pub resets: u64,
}

impl EngineStats {
    #[inline]
    pub(crate) fn bump(counter: &mut u64) {
        *counter = counter.saturating_add(1);
    }

    /// Fraction of emitted events that saturated.
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        reason = "ratio of counters, precision loss is irrelevant"
    )]
    pub fn saturation_ratio(&self) -> f64 {
        if self.events_emitted == 0 {
            return 0.0;
        }
        self.saturations as f64 / self.events_emitted as f64
    }
}
