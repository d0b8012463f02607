//! setup2toml: convert Python packaging metadata to `pyproject.toml`.
//!
//! A setup script is read statically into `setup.cfg`, `setup.cfg` is
//! normalized and converted, and the resulting `pyproject.toml` is validated
//! and written in canonical form. This crate provides the CLI entry point
//! and the library behind each step.

#![deny(clippy::print_stdout, clippy::print_stderr)]

use std::ffi::OsString;
use std::process::ExitCode;

use anstream::eprintln;
use clap::Parser;
use owo_colors::OwoColorize;

use crate::cli::Cli;
use crate::commands::ExitStatus;
use crate::printer::Printer;

pub mod cfg;
pub mod cli;
pub mod commands;
pub mod diagnostics;
mod logging;
pub mod pipeline;
pub mod printer;
pub mod pyproject;
pub mod setup_py;

/// Entry point for the setup2toml CLI.
///
/// Parses CLI arguments, installs the log subscriber and dispatches to the
/// command handler.
pub fn main<I, T>(args: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => err.exit(),
    };

    logging::setup_logging(cli.global.verbose, cli.global.quiet);
    let printer = Printer::new(cli.global.quiet);

    match commands::dispatch(cli, printer) {
        Ok(code) => code.into(),
        Err(err) => {
            let mut causes = err.chain();
            if let Some(first) = causes.next() {
                printer.error(&first.to_string());
            }
            for cause in causes {
                eprintln!(
                    "  {}: {}",
                    "Caused by".red().bold(),
                    cause.to_string().trim()
                );
            }
            ExitStatus::Error.into()
        }
    }
}
