//! Command implementations for servoctl CLI

pub mod check;
pub mod run;

use std::path::{Path, PathBuf};

use clap::Args;
use openservo_output_filter::{DEFAULT_CHANNELS, FilterProfile};

use crate::error::CliError;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Channel profile (YAML, or JSON with a .json extension)
    #[arg(short, long)]
    pub profile: PathBuf,

    /// Cycle trace (YAML list, or JSON lines)
    #[arg(short, long)]
    pub trace: PathBuf,

    /// Number of channels in the engine
    #[arg(short, long, default_value_t = DEFAULT_CHANNELS, env = "SERVOCTL_CHANNELS")]
    pub channels: usize,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Channel profile (YAML, or JSON with a .json extension)
    #[arg(short, long)]
    pub profile: PathBuf,

    /// Number of channels in the engine
    #[arg(short, long, default_value_t = DEFAULT_CHANNELS, env = "SERVOCTL_CHANNELS")]
    pub channels: usize,
}

/// Load a profile file, choosing the parser by extension.
pub fn load_profile(path: &Path) -> Result<FilterProfile, CliError> {
    let text = std::fs::read_to_string(path)?;
    let parsed = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => FilterProfile::from_json(&text),
        _ => FilterProfile::from_yaml(&text),
    };
    parsed.map_err(|e| CliError::profile(path, &e))
}
