//! Prelude for openservo-output-filter
//!
//! This module provides convenient re-exports of commonly used types.
//!
//! # Example
//!
//! ```
//! use openservo_output_filter::prelude::*;
//!
//! let engine = PipelineEngine::new(4)?;
//! assert!(engine.is_idle());
//! # Ok::<(), FilterError>(())
//! ```

pub use crate::PIPELINE_DEPTH;
pub use crate::engine::PipelineEngine;
pub use crate::error::{FilterError, ProfileError};
pub use crate::profile::{ChannelProfile, FilterProfile};
pub use crate::state::{ChannelState, EngineSnapshot};
pub use crate::stats::EngineStats;
pub use crate::types::{
    ChannelConfig, ConfigAddress, ConfigWrite, CycleInput, EngineConfig, OutputEvent, Sample,
};
