//! Error types for the output filter
//!
//! The cycle path itself never fails: overflow saturates in the clamp and
//! clear collisions drop the event. Errors only surface at the edges, when a
//! raw configuration word is decoded or a profile is loaded.

use thiserror::Error;

/// Errors raised while decoding configuration words or building an engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// Raw configuration address does not map to any register
    #[error("Unknown configuration address {0}")]
    UnknownAddress(u8),

    /// Channel index is outside the engine's channel range
    #[error("Channel {channel} is out of range (engine has {channels} channels)")]
    ChannelOutOfRange {
        /// Offending channel index
        channel: usize,
        /// Number of channels the engine was built with
        channels: usize,
    },

    /// An engine needs at least one channel
    #[error("Engine must have at least one channel")]
    NoChannels,

    /// Profile could not be loaded or validated
    #[error(transparent)]
    Profile(#[from] ProfileError),
}

/// Errors raised while loading or validating a [`FilterProfile`](crate::profile::FilterProfile).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProfileError {
    /// The same channel appears more than once
    #[error("Channel {0} is configured more than once")]
    DuplicateChannel(usize),

    /// A profile entry names a channel the engine does not have
    #[error("Profile channel {channel} is out of range (engine has {channels} channels)")]
    ChannelOutOfRange {
        /// Offending channel index
        channel: usize,
        /// Number of channels available
        channels: usize,
    },

    /// Profile text failed to parse
    #[error("Failed to parse {format} profile: {reason}")]
    Parse {
        /// Source format ("yaml" or "json")
        format: &'static str,
        /// Parser message
        reason: String,
    },
}

impl From<serde_yaml::Error> for ProfileError {
    fn from(err: serde_yaml::Error) -> Self {
        ProfileError::Parse {
            format: "yaml",
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ProfileError {
    fn from(err: serde_json::Error) -> Self {
        ProfileError::Parse {
            format: "json",
            reason: err.to_string(),
        }
    }
}

/// A specialized `Result` type for output filter operations.
pub type Result<T> = std::result::Result<T, FilterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            FilterError::UnknownAddress(9).to_string(),
            "Unknown configuration address 9"
        );
        assert_eq!(
            FilterError::NoChannels.to_string(),
            "Engine must have at least one channel"
        );
    }

    #[test]
    fn test_profile_error_is_transparent() {
        let err: FilterError = ProfileError::DuplicateChannel(3).into();
        assert_eq!(err.to_string(), "Channel 3 is configured more than once");
    }

    #[test]
    fn test_yaml_error_conversion() {
        let parsed = serde_yaml::from_str::<Vec<u32>>("not: [a list").map_err(ProfileError::from);
        assert!(matches!(
            parsed,
            Err(ProfileError::Parse { format: "yaml", .. })
        ));
    }
}
