//! Output formatting for CLI responses

use anyhow::{Error, Result};
use colored::*;
use serde_json::json;

use crate::commands::check::CheckReport;
use crate::commands::run::RunReport;
use crate::error::CliError;

/// Print error in JSON format
pub fn print_error_json(error: &Error) {
    let error_json = json!({
        "success": false,
        "error": {
            "message": error.to_string(),
            "type": error_type_name(error)
        }
    });
    match serde_json::to_string_pretty(&error_json) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("Failed to format error as JSON: {}", e),
    }
}

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);

    let mut source = error.source();
    while let Some(err) = source {
        eprintln!("  {} {}", "Caused by:".yellow(), err);
        source = err.source();
    }
}

fn error_type_name(error: &Error) -> &'static str {
    match error.downcast_ref::<CliError>() {
        Some(CliError::ProfileInvalid { .. }) => "profile_invalid",
        Some(CliError::TraceInvalid { .. }) => "trace_invalid",
        Some(CliError::Engine(_)) => "engine",
        Some(CliError::IoError(_)) => "io",
        Some(CliError::JsonError(_)) => "json",
        None => "other",
    }
}

/// Print replay results: one JSON object per event, or a table.
pub fn print_run_report(report: &RunReport, json: bool) -> Result<()> {
    if json {
        for event in &report.events {
            println!("{}", serde_json::to_string(event).map_err(CliError::from)?);
        }
        return Ok(());
    }

    if report.events.is_empty() {
        println!("{}", "No output events".yellow());
    } else {
        println!("{}", format!("{:>8}  {:>7}  {:>11}", "cycle", "channel", "output").bold());
        for event in &report.events {
            println!("{:>8}  {:>7}  {:>11}", event.cycle, event.channel, event.output);
        }
    }

    println!(
        "{} events over {} cycles ({} trace + {} drain), {} saturated, {} flushed",
        report.events.len(),
        report.trace_cycles + report.drain_cycles,
        report.trace_cycles,
        report.drain_cycles,
        report.stats.saturations,
        report.stats.events_flushed,
    );
    if report.stats.samples_rejected > 0 {
        println!(
            "{} {} samples rejected (channel out of range)",
            "⚠".yellow(),
            report.stats.samples_rejected
        );
    }
    Ok(())
}

/// Print profile check results
pub fn print_check_report(report: &CheckReport, json: bool) -> Result<()> {
    if json {
        let output = json!({
            "success": true,
            "profile": report,
        });
        println!("{}", serde_json::to_string_pretty(&output).map_err(CliError::from)?);
        return Ok(());
    }

    println!(
        "{} Profile valid: {} channel entries, {} configuration writes ({} channels)",
        "✓".green(),
        report.entries,
        report.writes,
        report.channels,
    );
    for channel in &report.inverted_bounds {
        println!(
            "  {} channel {} has inverted bounds (min > max)",
            "⚠".yellow(),
            channel
        );
    }
    Ok(())
}
