//! `extboot` demo entry point.
//!
//! # Responsibility
//! - Parse flags, optionally start file logging, and refresh the demo container
//!   with the bootstrap log that logging hands back.
//! - Print the bootstrap report as JSON on stdout.
//!
//! # Invariants
//! - Exit code is 1 on any bootstrap or logging failure, with the full cause
//!   chain on stderr.

mod cli;
mod demo;

use clap::Parser;
use cli::Cli;
use extboot_core::{BootstrapError, BootstrapLog, BootstrapReport};
use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log = match cli.log_dir.as_deref() {
        Some(log_dir) => match extboot_core::init_logging(&cli.log_level, log_dir) {
            Ok(status) => {
                eprintln!("logging: {status}");
                status.bootstrap_log()
            }
            Err(err) => {
                eprintln!("error: {err}");
                return ExitCode::from(1);
            }
        },
        None => BootstrapLog::facade(),
    };

    match run(&cli, log) {
        Ok(report) => match render(&report, cli.pretty) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("error: failed to serialize report: {err}");
                ExitCode::from(1)
            }
        },
        Err(err) => {
            print_chain(&err);
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli, log: BootstrapLog) -> Result<BootstrapReport, BootstrapError> {
    let mut properties = demo::default_properties();
    properties.extend(cli.properties.iter().cloned());

    let mut container = demo::build_container(properties, log)?;
    container.refresh()
}

fn render(report: &BootstrapReport, pretty: bool) -> serde_json::Result<String> {
    if pretty {
        serde_json::to_string_pretty(report)
    } else {
        serde_json::to_string(report)
    }
}

/// Display of a wrapped failure already nests its causes.
fn print_chain(err: &BootstrapError) {
    eprintln!("error: {err}");
    if err.source().is_some() {
        eprintln!("root cause: {}", err.root_cause());
    }
}
