//! Core types for the output filter pipeline
//!
//! This module provides the event, configuration and bus-word types shared
//! by the stores and the pipeline engine.

use serde::{Deserialize, Serialize};

use crate::error::FilterError;

/// Default number of channels for [`EngineConfig::default`].
pub const DEFAULT_CHANNELS: usize = 8;

/// Per-channel configuration snapshot.
///
/// Every field is a plain register. Nothing here is validated: in
/// particular `min <= max` is the writer's responsibility.
///
/// # Example
///
/// ```
/// use openservo_output_filter::ChannelConfig;
///
/// let config = ChannelConfig::default();
/// assert_eq!(config.scale, 0);
/// assert_eq!(config.add_source(8), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Multiplier applied to every incoming delta
    pub scale: i32,
    /// Arithmetic right shift applied after the multiply
    pub shift: u8,
    /// Cross-channel reference; any value `>= N` means "none"
    pub add_channel: u32,
    /// Lower output bound
    pub min: i32,
    /// Upper output bound
    pub max: i32,
    /// Output value after clear and for injections
    pub init: i32,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            scale: 0,
            shift: 0,
            add_channel: u32::MAX,
            min: 0,
            max: 0,
            init: 0,
        }
    }
}

impl ChannelConfig {
    /// Resolve the cross-channel reference against the channel count.
    ///
    /// Returns `None` for the sentinel (any value `>= channels`).
    #[must_use]
    pub fn add_source(&self, channels: usize) -> Option<usize> {
        usize::try_from(self.add_channel)
            .ok()
            .filter(|&source| source < channels)
    }

    /// Whether the configured bounds are inverted (`min > max`).
    #[must_use]
    pub fn has_inverted_bounds(&self) -> bool {
        self.min > self.max
    }
}

/// Register address on the configuration-write bus.
///
/// Raw encoding (see [`ConfigAddress::from_raw`]) gives every request type
/// its own address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ConfigAddress {
    /// Lower output bound
    Min = 0,
    /// Upper output bound
    Max = 1,
    /// Initial / injected output
    Init = 2,
    /// Delta multiplier
    Scale = 3,
    /// Right shift after multiply
    Shift = 4,
    /// Cross-channel reference
    AddChannel = 5,
    /// One-shot clear pulse (non-zero value requests)
    ClearRequest = 6,
    /// Sticky injection request (non-zero sets, zero cancels)
    InjectRequest = 7,
}

impl ConfigAddress {
    /// All addresses in raw-code order.
    pub const ALL: [ConfigAddress; 8] = [
        ConfigAddress::Min,
        ConfigAddress::Max,
        ConfigAddress::Init,
        ConfigAddress::Scale,
        ConfigAddress::Shift,
        ConfigAddress::AddChannel,
        ConfigAddress::ClearRequest,
        ConfigAddress::InjectRequest,
    ];

    /// Decode a raw bus address.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::UnknownAddress`] for codes above 7.
    pub fn from_raw(raw: u8) -> Result<Self, FilterError> {
        Self::ALL
            .iter()
            .copied()
            .find(|address| address.code() == raw)
            .ok_or(FilterError::UnknownAddress(raw))
    }

    /// Raw bus code for this address.
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether this address targets a request register rather than the
    /// configuration memory.
    #[must_use]
    pub fn is_request(self) -> bool {
        matches!(
            self,
            ConfigAddress::ClearRequest | ConfigAddress::InjectRequest
        )
    }
}

impl TryFrom<u8> for ConfigAddress {
    type Error = FilterError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Self::from_raw(raw)
    }
}

/// One word on the configuration-write bus.
///
/// Values are carried wide and truncated to the register width when applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigWrite {
    /// Target register
    pub address: ConfigAddress,
    /// Target channel
    pub channel: usize,
    /// Raw value
    pub value: i64,
}

impl ConfigWrite {
    /// Build a configuration write.
    #[must_use]
    pub fn new(address: ConfigAddress, channel: usize, value: i64) -> Self {
        Self {
            address,
            channel,
            value,
        }
    }

    /// Decode a raw `(address, channel, value)` bus triple.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::UnknownAddress`] if `address` is not a known
    /// register code.
    ///
    /// # Example
    ///
    /// ```
    /// use openservo_output_filter::{ConfigAddress, ConfigWrite};
    ///
    /// let write = ConfigWrite::from_raw(3, 1, -7)?;
    /// assert_eq!(write.address, ConfigAddress::Scale);
    /// assert_eq!(write.channel, 1);
    /// # Ok::<(), openservo_output_filter::FilterError>(())
    /// ```
    pub fn from_raw(address: u8, channel: u32, value: i64) -> Result<Self, FilterError> {
        let address = ConfigAddress::from_raw(address)?;
        // Saturate; an unrepresentable index is out of range for any engine.
        let channel = usize::try_from(channel).unwrap_or(usize::MAX);
        Ok(Self::new(address, channel, value))
    }

    /// Request a one-cycle clear of `channel`.
    #[must_use]
    pub fn clear(channel: usize) -> Self {
        Self::new(ConfigAddress::ClearRequest, channel, 1)
    }

    /// Request an injection on `channel`.
    #[must_use]
    pub fn inject(channel: usize) -> Self {
        Self::new(ConfigAddress::InjectRequest, channel, 1)
    }

    /// Cancel a pending injection on `channel`.
    #[must_use]
    pub fn cancel_inject(channel: usize) -> Self {
        Self::new(ConfigAddress::InjectRequest, channel, 0)
    }
}

/// External input event from the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Target channel
    pub channel: usize,
    /// Correction value
    pub delta: i32,
}

impl Sample {
    /// Build a sample.
    #[must_use]
    pub fn new(channel: usize, delta: i32) -> Self {
        Self { channel, delta }
    }
}

/// Output port value for one cycle.
///
/// `valid` is false for empty slots and for events dropped by a clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutputEvent {
    /// Channel of the retired event
    pub channel: usize,
    /// Clamped (or injected) output value
    pub output: i32,
    /// Whether the port carries a real event this cycle
    pub valid: bool,
}

impl OutputEvent {
    /// Empty port value.
    #[must_use]
    pub fn invalid() -> Self {
        Self::default()
    }

    /// Return `Some(self)` if the event is valid.
    #[must_use]
    pub fn into_valid(self) -> Option<Self> {
        self.valid.then_some(self)
    }
}

/// Everything presented to the engine on one clock cycle.
///
/// # Example
///
/// ```
/// use openservo_output_filter::{CycleInput, Sample};
///
/// let input = CycleInput::sample(Sample::new(0, 5));
/// assert!(input.sample.is_some());
/// assert!(!input.reset);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CycleInput {
    /// Optional input sample
    #[serde(default)]
    pub sample: Option<Sample>,
    /// Optional configuration write
    #[serde(default)]
    pub write: Option<ConfigWrite>,
    /// Synchronous reset level
    #[serde(default)]
    pub reset: bool,
}

impl CycleInput {
    /// Cycle with nothing presented.
    #[must_use]
    pub fn idle() -> Self {
        Self::default()
    }

    /// Cycle presenting a single sample.
    #[must_use]
    pub fn sample(sample: Sample) -> Self {
        Self {
            sample: Some(sample),
            ..Self::default()
        }
    }

    /// Cycle presenting a single configuration write.
    #[must_use]
    pub fn write(write: ConfigWrite) -> Self {
        Self {
            write: Some(write),
            ..Self::default()
        }
    }

    /// Cycle with reset asserted.
    #[must_use]
    pub fn reset() -> Self {
        Self {
            reset: true,
            ..Self::default()
        }
    }
}

/// Engine construction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of channels (`N`)
    pub channels: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            channels: DEFAULT_CHANNELS,
        }
    }
}

impl EngineConfig {
    /// Configuration with `channels` channels.
    #[must_use]
    pub fn with_channels(channels: usize) -> Self {
        Self { channels }
    }

    /// Check construction parameters.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::NoChannels`] if `channels` is zero.
    pub fn validate(&self) -> Result<(), FilterError> {
        if self.channels == 0 {
            return Err(FilterError::NoChannels);
        }
        Ok(())
    }
}
