//! servoctl - OpenServo output filter trace replay
//!
//! Loads a channel profile and a cycle trace, runs them through the
//! five-stage output filter pipeline, and prints the emitted events.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod commands;
mod error;
mod output;
mod trace;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{CheckArgs, RunArgs};
use crate::error::CliError;

#[derive(Parser)]
#[command(name = "servoctl")]
#[command(about = "OpenServo output filter CLI - replay cycle traces through the filter pipeline")]
#[command(version)]
#[command(long_about = "
servoctl drives the OpenServo output filter pipeline from files.
A profile configures each channel's scale, shift, bounds, initial value and
cross-channel reference; a trace lists what is presented on each clock cycle.
Use --json for machine-readable output suitable for scripting.
")]
struct Cli {
    /// Output format (human-readable or JSON)
    #[arg(long, global = true, help = "Output in JSON format for machine parsing")]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a trace and print every emitted output event
    Run(RunArgs),

    /// Validate a profile without running it
    Check(CheckArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("servoctl={log_level},openservo_output_filter={log_level}").into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match execute_command(&cli) {
        Ok(()) => Ok(()),
        Err(e) => {
            if cli.json {
                output::print_error_json(&e);
            } else {
                output::print_error_human(&e);
            }

            let exit_code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            std::process::exit(exit_code);
        }
    }
}

fn execute_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Run(args) => commands::run::execute(args, cli.json),
        Commands::Check(args) => commands::check::execute(args, cli.json),
    }
}
