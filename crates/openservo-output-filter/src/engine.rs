//! Pipeline engine state and inspection
//!
//! [`PipelineEngine`] owns the configuration memory, the request registers,
//! the channel-state arena and the four inter-stage latches. The clocked
//! behavior lives in [`executor`](crate::executor); this module covers
//! construction, the convenience drivers built on `tick`, and read-only
//! inspection.

use crate::config::ConfigStore;
use crate::error::Result;
use crate::requests::RequestRegisters;
use crate::stages::{BoundLatch, FetchLatch, ScaleLatch, Slot, SumLatch};
use crate::state::{ChannelSnapshot, ChannelState, ChannelStateBank, EngineSnapshot};
use crate::stats::EngineStats;
use crate::types::{ChannelConfig, ConfigWrite, CycleInput, EngineConfig, OutputEvent, Sample};

/// Five-stage output filter pipeline.
///
/// One call to [`tick`](PipelineEngine::tick) is one clock cycle. An event
/// admitted on cycle `n` is emitted by the call for cycle `n + 4`, the fifth
/// cycle counting the admission cycle.
///
/// # Example
///
/// ```
/// use openservo_output_filter::prelude::*;
///
/// let mut engine = PipelineEngine::new(4)?;
/// for write in [
///     ConfigWrite::new(ConfigAddress::Min, 0, -100),
///     ConfigWrite::new(ConfigAddress::Max, 0, 100),
///     ConfigWrite::new(ConfigAddress::Scale, 0, 50),
/// ] {
///     engine.write(write);
/// }
///
/// engine.push_sample(0, 10);
/// let emitted = engine.drain();
/// assert_eq!(emitted.len(), 1);
/// assert_eq!(emitted[0].output, 100);
/// # Ok::<(), FilterError>(())
/// ```
#[derive(Debug, Clone)]
pub struct PipelineEngine {
    pub(crate) channels: usize,
    pub(crate) config: ConfigStore,
    pub(crate) requests: RequestRegisters,
    pub(crate) state: ChannelStateBank,
    /// Fetch → Scale
    pub(crate) fetched: Slot<FetchLatch>,
    /// Scale → Cross-Sum
    pub(crate) scaled: Slot<ScaleLatch>,
    /// Cross-Sum → Bound-Integrate
    pub(crate) summed: Slot<SumLatch>,
    /// Bound-Integrate → Writeback
    pub(crate) bounded: Slot<BoundLatch>,
    pub(crate) cycle: u64,
    pub(crate) stats: EngineStats,
}

impl PipelineEngine {
    /// Create an engine with `channels` channels, all registers at their
    /// reset defaults.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::NoChannels`](crate::FilterError::NoChannels)
    /// if `channels` is zero.
    pub fn new(channels: usize) -> Result<Self> {
        Self::with_config(EngineConfig::with_channels(channels))
    }

    /// Create an engine from construction parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration does not validate.
    pub fn with_config(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config.channels))
    }

    fn build(channels: usize) -> Self {
        Self {
            channels,
            config: ConfigStore::new(channels),
            requests: RequestRegisters::new(channels),
            state: ChannelStateBank::new(channels),
            fetched: Slot::Empty,
            scaled: Slot::Empty,
            summed: Slot::Empty,
            bounded: Slot::Empty,
            cycle: 0,
            stats: EngineStats::default(),
        }
    }

    /// Number of channels (`N`).
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels
    }

    /// Cycles elapsed since construction.
    #[must_use]
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Counter snapshot.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Configuration registers of one channel.
    #[must_use]
    pub fn config(&self, channel: usize) -> Option<ChannelConfig> {
        self.config.read(channel)
    }

    /// Configuration memory.
    #[must_use]
    pub fn config_store(&self) -> &ConfigStore {
        &self.config
    }

    /// Persistent state of one channel.
    #[must_use]
    pub fn channel_state(&self, channel: usize) -> Option<ChannelState> {
        self.state.get(channel)
    }

    /// Request registers as they stand between cycles.
    #[must_use]
    pub fn requests(&self) -> &RequestRegisters {
        &self.requests
    }

    /// Channels with a pending injection, low to high.
    #[must_use]
    pub fn pending_injections(&self) -> Vec<usize> {
        self.requests.pending_injections().collect()
    }

    /// Number of stage latches holding a live event.
    #[must_use]
    pub fn occupancy(&self) -> usize {
        [
            self.fetched.is_live(),
            self.scaled.is_live(),
            self.summed.is_live(),
            self.bounded.is_live(),
        ]
        .into_iter()
        .filter(|&live| live)
        .count()
    }

    /// Whether nothing is in flight and nothing is waiting to enter.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.occupancy() == 0
            && self.requests.lowest_pending_inject().is_none()
            && !self.requests.any_clear()
    }

    /// Snapshot of every channel plus pipeline occupancy.
    #[must_use]
    pub fn snapshot(&self) -> EngineSnapshot {
        let channels = self
            .config
            .iter()
            .zip(self.state.iter())
            .map(|((channel, config), state)| ChannelSnapshot {
                channel,
                config: *config,
                state: *state,
                inject_pending: self.requests.is_inject_pending(channel),
            })
            .collect();

        EngineSnapshot {
            cycle: self.cycle,
            occupancy: self.occupancy(),
            channels,
            stats: self.stats,
        }
    }

    /// One cycle presenting a sample.
    pub fn push_sample(&mut self, channel: usize, delta: i32) -> OutputEvent {
        self.tick(CycleInput::sample(Sample::new(channel, delta)))
    }

    /// One cycle with nothing presented.
    pub fn idle(&mut self) -> OutputEvent {
        self.tick(CycleInput::idle())
    }

    /// One cycle presenting a configuration write.
    pub fn write(&mut self, write: ConfigWrite) -> OutputEvent {
        self.tick(CycleInput::write(write))
    }

    /// One cycle with reset asserted.
    ///
    /// The clear pulses raised by reset act on the following cycle; follow
    /// with [`drain`](Self::drain) or [`idle`](Self::idle) before relying
    /// on re-initialized state.
    pub fn reset(&mut self) -> OutputEvent {
        self.tick(CycleInput::reset())
    }

    /// Present `writes` one per cycle, returning the valid events emitted
    /// meanwhile.
    pub fn apply_writes(&mut self, writes: impl IntoIterator<Item = ConfigWrite>) -> Vec<OutputEvent> {
        writes
            .into_iter()
            .filter_map(|write| self.write(write).into_valid())
            .collect()
    }

    /// Run a sequence of cycles, returning the valid events emitted.
    pub fn run(&mut self, inputs: impl IntoIterator<Item = CycleInput>) -> Vec<OutputEvent> {
        inputs
            .into_iter()
            .filter_map(|input| self.tick(input).into_valid())
            .collect()
    }

    /// Idle until the engine is idle, returning the valid events emitted.
    ///
    /// Pending injections and clear pulses are serviced along the way. An
    /// injection cannot re-arm itself, so this terminates after at most
    /// `N + PIPELINE_DEPTH` cycles.
    pub fn drain(&mut self) -> Vec<OutputEvent> {
        let mut emitted = Vec::new();
        while !self.is_idle() {
            if let Some(event) = self.idle().into_valid() {
                emitted.push(event);
            }
        }
        emitted
    }
}

impl Default for PipelineEngine {
    fn default() -> Self {
        Self::build(EngineConfig::default().channels)
    }
}
