//! Per-channel configuration memory
//!
//! The store is written one field at a time by the configuration bus and read
//! in full by the pipeline. Writes are unconditional overwrites; values are
//! truncated to the register width exactly as a hardware register would keep
//! only its low bits.

use tracing::{debug, warn};

use crate::types::{ChannelConfig, ConfigAddress};

/// Configuration memory for all channels.
///
/// # Example
///
/// ```
/// use openservo_output_filter::{ConfigAddress, ConfigStore};
///
/// let mut store = ConfigStore::new(4);
/// store.write(2, ConfigAddress::Scale, 16);
/// assert_eq!(store.read(2).map(|c| c.scale), Some(16));
/// assert!(store.read(4).is_none());
/// ```
#[derive(Debug, Clone)]
pub struct ConfigStore {
    channels: Vec<ChannelConfig>,
}

impl ConfigStore {
    /// Create a store with `channels` default-initialized entries.
    #[must_use]
    pub fn new(channels: usize) -> Self {
        Self {
            channels: vec![ChannelConfig::default(); channels],
        }
    }

    /// Number of channels held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Whether the store holds no channels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Overwrite one field of one channel.
    ///
    /// Request addresses do not live in this memory and are ignored here; the
    /// engine routes them to the request registers. Writes to unknown
    /// channels are dropped.
    pub fn write(&mut self, channel: usize, address: ConfigAddress, value: i64) {
        let Some(config) = self.channels.get_mut(channel) else {
            warn!(channel, ?address, "config write to unknown channel dropped");
            return;
        };

        match address {
            ConfigAddress::Min => config.min = low_i32(value),
            ConfigAddress::Max => config.max = low_i32(value),
            ConfigAddress::Init => config.init = low_i32(value),
            ConfigAddress::Scale => config.scale = low_i32(value),
            ConfigAddress::Shift => config.shift = low_u8(value),
            ConfigAddress::AddChannel => config.add_channel = low_u32(value),
            ConfigAddress::ClearRequest | ConfigAddress::InjectRequest => return,
        }

        debug!(channel, ?address, value, "config register written");
    }

    /// Snapshot of one channel's configuration.
    #[must_use]
    pub fn read(&self, channel: usize) -> Option<ChannelConfig> {
        self.channels.get(channel).copied()
    }

    /// Channels whose `min > max`.
    ///
    /// The engine accepts such bounds; this is a diagnostic for callers that
    /// want to reject them before they reach the datapath.
    #[must_use]
    pub fn inverted_bounds(&self) -> Vec<usize> {
        self.channels
            .iter()
            .enumerate()
            .filter(|(_, config)| config.has_inverted_bounds())
            .map(|(channel, _)| channel)
            .collect()
    }

    /// Iterate over `(channel, config)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &ChannelConfig)> {
        self.channels.iter().enumerate()
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "register write keeps the low bits"
)]
fn low_i32(value: i64) -> i32 {
    value as i32
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "register write keeps the low bits"
)]
fn low_u32(value: i64) -> u32 {
    value as u32
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "register write keeps the low bits"
)]
fn low_u8(value: i64) -> u8 {
    value as u8
}
