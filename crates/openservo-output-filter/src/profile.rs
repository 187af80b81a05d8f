//! Channel profiles
//!
//! A [`FilterProfile`] is the offline form of a configuration: one entry per
//! channel, any subset of fields. Profiles load from YAML or JSON and reach
//! an engine only through the configuration-write bus, one word per cycle,
//! the same path a host would use.
//!
//! ```yaml
//! channels:
//!   - channel: 0
//!     scale: 50
//!     min: -100
//!     max: 100
//!   - channel: 1
//!     add_channel: 0
//!     init: 12
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::engine::PipelineEngine;
use crate::error::{ProfileError, Result};
use crate::types::{ConfigAddress, ConfigWrite, OutputEvent};

/// Settings for one channel. Absent fields keep their current register value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelProfile {
    /// Channel index
    pub channel: usize,
    /// Delta multiplier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<i32>,
    /// Right shift after multiply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shift: Option<u8>,
    /// Cross-channel reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_channel: Option<u32>,
    /// Lower output bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i32>,
    /// Upper output bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i32>,
    /// Initial / injected output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<i32>,
}

impl ChannelProfile {
    /// Configuration writes for the fields present, in bus order.
    pub fn writes(&self) -> impl Iterator<Item = ConfigWrite> + '_ {
        [
            (ConfigAddress::Min, self.min.map(i64::from)),
            (ConfigAddress::Max, self.max.map(i64::from)),
            (ConfigAddress::Init, self.init.map(i64::from)),
            (ConfigAddress::Scale, self.scale.map(i64::from)),
            (ConfigAddress::Shift, self.shift.map(i64::from)),
            (ConfigAddress::AddChannel, self.add_channel.map(i64::from)),
        ]
        .into_iter()
        .filter_map(move |(address, value)| {
            value.map(|value| ConfigWrite::new(address, self.channel, value))
        })
    }

    /// Whether both bounds are given and inverted.
    #[must_use]
    pub fn has_inverted_bounds(&self) -> bool {
        matches!((self.min, self.max), (Some(min), Some(max)) if min > max)
    }
}

/// Per-channel configuration profile.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterProfile {
    /// Channel entries
    #[serde(default)]
    pub channels: Vec<ChannelProfile>,
}

impl FilterProfile {
    /// Parse a YAML profile.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::Parse`] if the text is not a valid profile.
    pub fn from_yaml(text: &str) -> std::result::Result<Self, ProfileError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Parse a JSON profile.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::Parse`] if the text is not a valid profile.
    pub fn from_json(text: &str) -> std::result::Result<Self, ProfileError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::Parse`] if serialization fails.
    pub fn to_yaml(&self) -> std::result::Result<String, ProfileError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Check the profile against an engine with `channels` channels.
    ///
    /// Inverted bounds are accepted (the datapath tolerates them) and only
    /// logged; see [`inverted_bounds`](Self::inverted_bounds).
    ///
    /// # Errors
    ///
    /// - [`ProfileError::ChannelOutOfRange`] if an entry names a channel
    ///   `>= channels`
    /// - [`ProfileError::DuplicateChannel`] if a channel appears twice
    pub fn validate(&self, channels: usize) -> std::result::Result<(), ProfileError> {
        let mut seen = HashSet::with_capacity(self.channels.len());
        for entry in &self.channels {
            if entry.channel >= channels {
                return Err(ProfileError::ChannelOutOfRange {
                    channel: entry.channel,
                    channels,
                });
            }
            if !seen.insert(entry.channel) {
                return Err(ProfileError::DuplicateChannel(entry.channel));
            }
        }

        for channel in self.inverted_bounds() {
            warn!(channel, "profile bounds are inverted (min > max)");
        }
        Ok(())
    }

    /// Channels whose entry gives `min > max`.
    #[must_use]
    pub fn inverted_bounds(&self) -> Vec<usize> {
        self.channels
            .iter()
            .filter(|entry| entry.has_inverted_bounds())
            .map(|entry| entry.channel)
            .collect()
    }

    /// The configuration-write sequence for this profile.
    ///
    /// Field writes for every entry come first, then one clear request per
    /// configured channel so the new `init` is loaded into the accumulator.
    #[must_use]
    pub fn to_writes(&self) -> Vec<ConfigWrite> {
        self.channels
            .iter()
            .flat_map(ChannelProfile::writes)
            .chain(self.channels.iter().map(|entry| ConfigWrite::clear(entry.channel)))
            .collect()
    }
}

impl PipelineEngine {
    /// Validate `profile` and present its writes one per cycle, then drain.
    ///
    /// Returns the valid events emitted while the profile was applied
    /// (events already in flight when it started).
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::Profile`](crate::FilterError::Profile) if the
    /// profile does not validate against this engine; nothing is written in
    /// that case.
    pub fn apply_profile(&mut self, profile: &FilterProfile) -> Result<Vec<OutputEvent>> {
        profile.validate(self.channel_count())?;

        let writes = profile.to_writes();
        let mut emitted = self.apply_writes(writes.iter().copied());
        emitted.extend(self.drain());

        info!(
            channels = profile.channels.len(),
            writes = writes.len(),
            cycle = self.cycle(),
            "profile applied"
        );
        Ok(emitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FilterError;

    const PROFILE_YAML: &str = "
channels:
  - channel: 0
    scale: 50
    min: -100
    max: 100
  - channel: 2
    add_channel: 0
    init: 12
    min: -50
    max: 50
";

    #[test]
    fn test_parse_yaml() -> std::result::Result<(), ProfileError> {
        let profile = FilterProfile::from_yaml(PROFILE_YAML)?;
        assert_eq!(profile.channels.len(), 2);
        assert_eq!(profile.channels.first().and_then(|c| c.scale), Some(50));
        assert_eq!(profile.channels.get(1).and_then(|c| c.add_channel), Some(0));
        assert_eq!(profile.channels.get(1).and_then(|c| c.shift), None);
        Ok(())
    }

    #[test]
    fn test_parse_json() -> std::result::Result<(), ProfileError> {
        let profile =
            FilterProfile::from_json(r#"{"channels":[{"channel":1,"shift":3,"init":-4}]}"#)?;
        assert_eq!(profile.channels.first().and_then(|c| c.shift), Some(3));
        assert_eq!(profile.channels.first().and_then(|c| c.init), Some(-4));
        Ok(())
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result = FilterProfile::from_yaml("channels:\n  - channel: 0\n    gain: 3\n");
        assert!(matches!(result, Err(ProfileError::Parse { format: "yaml", .. })));
    }

    #[test]
    fn test_yaml_round_trip() -> std::result::Result<(), ProfileError> {
        let profile = FilterProfile::from_yaml(PROFILE_YAML)?;
        let text = profile.to_yaml()?;
        assert_eq!(FilterProfile::from_yaml(&text)?, profile);
        Ok(())
    }

    #[test]
    fn test_validate_rejects_out_of_range_and_duplicates() {
        let profile = FilterProfile {
            channels: vec![ChannelProfile {
                channel: 4,
                ..ChannelProfile::default()
            }],
        };
        assert_eq!(
            profile.validate(4),
            Err(ProfileError::ChannelOutOfRange {
                channel: 4,
                channels: 4
            })
        );

        let profile = FilterProfile {
            channels: vec![ChannelProfile::default(), ChannelProfile::default()],
        };
        assert_eq!(profile.validate(4), Err(ProfileError::DuplicateChannel(0)));
    }

    #[test]
    fn test_inverted_bounds_accepted() {
        let profile = FilterProfile {
            channels: vec![ChannelProfile {
                channel: 1,
                min: Some(5),
                max: Some(-5),
                ..ChannelProfile::default()
            }],
        };
        assert_eq!(profile.validate(2), Ok(()));
        assert_eq!(profile.inverted_bounds(), vec![1]);
    }

    #[test]
    fn test_to_writes_order() -> std::result::Result<(), ProfileError> {
        let profile = FilterProfile::from_yaml(PROFILE_YAML)?;
        let writes = profile.to_writes();
        assert_eq!(writes.len(), 3 + 4 + 2);
        assert_eq!(writes.first(), Some(&ConfigWrite::new(ConfigAddress::Min, 0, -100)));
        assert_eq!(writes.get(7), Some(&ConfigWrite::clear(0)));
        assert_eq!(writes.get(8), Some(&ConfigWrite::clear(2)));
        Ok(())
    }

    #[test]
    fn test_apply_profile_loads_config_and_init() -> std::result::Result<(), FilterError> {
        let mut engine = PipelineEngine::new(4)?;
        let profile = FilterProfile::from_yaml(PROFILE_YAML)?;
        let emitted = engine.apply_profile(&profile)?;
        assert!(emitted.is_empty());

        let config = engine.config(2).unwrap_or_default();
        assert_eq!(config.add_channel, 0);
        assert_eq!(config.init, 12);
        assert_eq!(engine.channel_state(2).map(|s| s.last_output), Some(12));
        assert!(engine.is_idle());
        Ok(())
    }

    #[test]
    fn test_apply_invalid_profile_writes_nothing() -> std::result::Result<(), FilterError> {
        let mut engine = PipelineEngine::new(2)?;
        let profile = FilterProfile::from_yaml(PROFILE_YAML)?;
        let result = engine.apply_profile(&profile);
        assert!(matches!(result, Err(FilterError::Profile(_))));
        assert_eq!(engine.cycle(), 0);
        Ok(())
    }
}
