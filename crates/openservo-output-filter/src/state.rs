//! Per-channel persistent state and engine snapshots
//!
//! Channel state lives in an arena indexed by channel number. The pipeline
//! mutates it at exactly two points: Cross-Sum commits the scaled delta and
//! Writeback commits the output. Nothing else writes it except a clear.

use serde::{Deserialize, Serialize};

use crate::stats::EngineStats;
use crate::types::ChannelConfig;

/// Persistent state of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChannelState {
    /// Most recently committed scaled delta (post multiply and shift)
    pub last_scaled_delta: i64,
    /// Most recently committed, clamped output
    pub last_output: i32,
}

/// Arena of [`ChannelState`] for all channels.
#[derive(Debug, Clone)]
pub struct ChannelStateBank {
    entries: Vec<ChannelState>,
}

impl ChannelStateBank {
    /// Create a bank of `channels` zeroed entries.
    #[must_use]
    pub fn new(channels: usize) -> Self {
        Self {
            entries: vec![ChannelState::default(); channels],
        }
    }

    /// Number of channels held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bank holds no channels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// State of one channel.
    #[must_use]
    pub fn get(&self, channel: usize) -> Option<ChannelState> {
        self.entries.get(channel).copied()
    }

    /// Committed scaled delta of `channel`, zero for unknown channels.
    #[must_use]
    pub fn last_scaled_delta(&self, channel: usize) -> i64 {
        self.entries
            .get(channel)
            .map_or(0, |state| state.last_scaled_delta)
    }

    /// Committed output of `channel`, zero for unknown channels.
    #[must_use]
    pub fn last_output(&self, channel: usize) -> i32 {
        self.entries.get(channel).map_or(0, |state| state.last_output)
    }

    /// Cross-Sum commit point.
    pub fn commit_scaled_delta(&mut self, channel: usize, scaled: i64) {
        if let Some(state) = self.entries.get_mut(channel) {
            state.last_scaled_delta = scaled;
        }
    }

    /// Writeback commit point.
    pub fn commit_output(&mut self, channel: usize, output: i32) {
        if let Some(state) = self.entries.get_mut(channel) {
            state.last_output = output;
        }
    }

    /// Iterate over all channel states in index order.
    pub fn iter(&self) -> impl Iterator<Item = &ChannelState> {
        self.entries.iter()
    }
}

/// Configuration and state of one channel at a cycle boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    /// Channel index
    pub channel: usize,
    /// Configuration registers
    pub config: ChannelConfig,
    /// Persistent state
    pub state: ChannelState,
    /// Whether an injection is pending
    pub inject_pending: bool,
}

/// Engine snapshot for debugging and analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    /// Cycles elapsed since construction
    pub cycle: u64,
    /// Number of pipeline stages holding a live event
    pub occupancy: usize,
    /// Per-channel view
    pub channels: Vec<ChannelSnapshot>,
    /// Counters at the time of the snapshot
    pub stats: EngineStats,
}

impl EngineSnapshot {
    /// Whether no event is in flight.
    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.occupancy == 0
    }

    /// Snapshot of one channel.
    #[must_use]
    pub fn channel(&self, channel: usize) -> Option<&ChannelSnapshot> {
        self.channels.get(channel)
    }
}
