//! Multi-Channel Output Filter Pipeline for OpenServo
//!
//! This crate models the signal-conditioning stage that sits between a servo
//! control loop and its actuators. Per-channel correction values ("deltas")
//! are scaled, optionally cross-coupled with another channel, integrated onto
//! the previous output and clamped, producing bounded set-points for DACs and
//! synthesizers.
//!
//! # Overview
//!
//! - **ConfigStore**: per-channel scale, shift, cross-channel reference,
//!   bounds and initial value
//! - **RequestRegisters**: one-shot clear pulses and sticky inject requests
//! - **ChannelStateBank**: last scaled delta and last output per channel
//! - **PipelineEngine**: the clocked five-stage datapath
//! - **FilterProfile**: YAML/JSON channel profiles applied over the
//!   configuration bus
//!
//! # Architecture
//!
//! ```text
//! (channel, delta) ──► Fetch ──► Scale ──► Cross-Sum ──► Bound-Integrate ──► Writeback ──► (channel, output)
//!        inject ──────┘  │          │           │                                │
//!                    ConfigStore  last_scaled_delta[add_channel]   last_output[channel]
//!                    clear/inject   (read)      (commit)   (read)               (commit)
//! ```
//!
//! The engine is cycle accurate: one [`PipelineEngine::tick`] per clock, one
//! event admitted per cycle, fixed latency of [`PIPELINE_DEPTH`] stages, no
//! stalls and no interlocks. Read/write hazards on channel state behave
//! exactly as the hardware datapath does.
//!
//! # Example
//!
//! ```
//! use openservo_output_filter::prelude::*;
//!
//! let mut engine = PipelineEngine::new(8)?;
//! let profile = FilterProfile::from_yaml(
//!     "channels:\n  - {channel: 0, scale: 2, min: -1000, max: 1000}\n",
//! )?;
//! engine.apply_profile(&profile)?;
//!
//! engine.push_sample(0, 5);
//! let emitted = engine.drain();
//! assert_eq!(emitted.first().map(|e| e.output), Some(10));
//! # Ok::<(), FilterError>(())
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod prelude;
pub mod profile;
pub mod requests;
pub mod stages;
pub mod state;
pub mod stats;
pub mod types;

pub use config::ConfigStore;
pub use engine::PipelineEngine;
pub use error::{FilterError, ProfileError, Result};
pub use profile::{ChannelProfile, FilterProfile};
pub use requests::RequestRegisters;
pub use state::{ChannelSnapshot, ChannelState, ChannelStateBank, EngineSnapshot};
pub use stats::EngineStats;
pub use types::{
    ChannelConfig, ConfigAddress, ConfigWrite, CycleInput, DEFAULT_CHANNELS, EngineConfig,
    OutputEvent, Sample,
};

/// Number of pipeline stages, and so the admission-to-emission latency in
/// cycles (counting the admission cycle).
pub const PIPELINE_DEPTH: usize = 5;
