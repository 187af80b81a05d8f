//! Cycle traces
//!
//! A trace is a list of [`TraceStep`]s, either as JSON lines (one object per
//! line, blank lines skipped) or as a YAML sequence. Each step expands into
//! `repeat` identical cycles.
//!
//! ```yaml
//! - sample: { channel: 0, delta: 10 }
//! - write: { address: inject_request, channel: 1, value: 1 }
//! - repeat: 6
//! ```

use std::path::Path;

use openservo_output_filter::{ConfigWrite, CycleInput, Sample};
use serde::{Deserialize, Serialize};

use crate::error::CliError;

fn default_repeat() -> u32 {
    1
}

/// One trace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TraceStep {
    #[serde(default)]
    pub sample: Option<Sample>,
    #[serde(default)]
    pub write: Option<ConfigWrite>,
    #[serde(default)]
    pub reset: bool,
    /// Number of cycles this step occupies
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

impl TraceStep {
    fn input(&self) -> CycleInput {
        CycleInput {
            sample: self.sample,
            write: self.write,
            reset: self.reset,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceFormat {
    JsonLines,
    Yaml,
}

impl TraceFormat {
    /// `.yaml`/`.yml` files are YAML, anything else is JSON lines.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => TraceFormat::Yaml,
            _ => TraceFormat::JsonLines,
        }
    }
}

/// Parsed trace, ready to replay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    steps: Vec<TraceStep>,
}

impl Trace {
    pub fn parse(text: &str, format: TraceFormat) -> Result<Self, CliError> {
        let steps = match format {
            TraceFormat::JsonLines => parse_json_lines(text)?,
            TraceFormat::Yaml => serde_yaml::from_str::<Vec<TraceStep>>(text).map_err(|e| {
                CliError::TraceInvalid {
                    line: e.location().map_or(0, |loc| loc.line()),
                    reason: e.to_string(),
                }
            })?,
        };

        if let Some(index) = steps.iter().position(|step| step.repeat == 0) {
            return Err(CliError::TraceInvalid {
                line: index + 1,
                reason: "repeat must be at least 1".to_string(),
            });
        }
        Ok(Self { steps })
    }

    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, TraceFormat::from_path(path))
    }

    pub fn steps(&self) -> &[TraceStep] {
        &self.steps
    }

    /// Total cycles after expanding `repeat`.
    pub fn cycle_count(&self) -> u64 {
        self.steps.iter().map(|step| u64::from(step.repeat)).sum()
    }

    pub fn inputs(&self) -> impl Iterator<Item = CycleInput> + '_ {
        self.steps.iter().flat_map(|step| {
            let repeat = usize::try_from(step.repeat).unwrap_or(usize::MAX);
            std::iter::repeat_n(step.input(), repeat)
        })
    }
}

fn parse_json_lines(text: &str) -> Result<Vec<TraceStep>, CliError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str::<TraceStep>(line).map_err(|e| CliError::TraceInvalid {
                line: index + 1,
                reason: e.to_string(),
            })
        })
        .collect()
}
