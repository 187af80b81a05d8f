//! `servoctl run`: replay a trace through a configured engine

use anyhow::Result;
use openservo_output_filter::{
    EngineConfig, EngineStats, FilterProfile, OutputEvent, PipelineEngine,
};
use serde::Serialize;
use tracing::info;

use crate::commands::{RunArgs, load_profile};
use crate::error::CliError;
use crate::output;
use crate::trace::Trace;

/// A valid output event tagged with its trace cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmittedEvent {
    pub cycle: u64,
    pub channel: usize,
    pub output: i32,
}

impl EmittedEvent {
    fn new(cycle: u64, event: OutputEvent) -> Self {
        Self {
            cycle,
            channel: event.channel,
            output: event.output,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub events: Vec<EmittedEvent>,
    /// Cycles taken by the trace itself
    pub trace_cycles: u64,
    /// Idle cycles needed afterwards to empty the pipeline
    pub drain_cycles: u64,
    pub stats: EngineStats,
}

/// Apply `profile`, replay `trace`, then idle until nothing is in flight.
///
/// Cycle numbers count from the first trace step; the cycles spent applying
/// the profile are not included.
pub fn replay(profile: &FilterProfile, trace: &Trace, channels: usize) -> Result<RunReport, CliError> {
    let mut engine = PipelineEngine::with_config(EngineConfig::with_channels(channels))?;
    engine.apply_profile(profile)?;

    let mut events = Vec::new();
    let mut cycle = 0u64;
    for input in trace.inputs() {
        if let Some(event) = engine.tick(input).into_valid() {
            events.push(EmittedEvent::new(cycle, event));
        }
        cycle += 1;
    }

    let trace_cycles = cycle;
    while !engine.is_idle() {
        if let Some(event) = engine.idle().into_valid() {
            events.push(EmittedEvent::new(cycle, event));
        }
        cycle += 1;
    }

    info!(
        events = events.len(),
        trace_cycles,
        drain_cycles = cycle - trace_cycles,
        "trace replayed"
    );

    Ok(RunReport {
        events,
        trace_cycles,
        drain_cycles: cycle - trace_cycles,
        stats: engine.stats(),
    })
}

pub fn execute(args: &RunArgs, json: bool) -> Result<()> {
    let profile = load_profile(&args.profile)?;
    profile
        .validate(args.channels)
        .map_err(|e| CliError::profile(&args.profile, &e))?;
    let trace = Trace::load(&args.trace)?;

    let report = replay(&profile, &trace, args.channels)?;
    output::print_run_report(&report, json)
}
