//! `servoctl check`: validate a profile without running it

use anyhow::Result;
use openservo_output_filter::FilterProfile;
use serde::Serialize;

use crate::commands::{CheckArgs, load_profile};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub entries: usize,
    pub writes: usize,
    pub channels: usize,
    pub inverted_bounds: Vec<usize>,
}

impl CheckReport {
    pub fn new(profile: &FilterProfile, channels: usize) -> Self {
        Self {
            entries: profile.channels.len(),
            writes: profile.to_writes().len(),
            channels,
            inverted_bounds: profile.inverted_bounds(),
        }
    }
}

pub fn execute(args: &CheckArgs, json: bool) -> Result<()> {
    let profile = load_profile(&args.profile)?;
    profile
        .validate(args.channels)
        .map_err(|e| CliError::profile(&args.profile, &e))?;

    output::print_check_report(&CheckReport::new(&profile, args.channels), json)
}
