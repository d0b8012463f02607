//! Command dispatch for setup2toml.
//!
//! Each subcommand lives in its own module and returns an [`ExitStatus`].
//! Library errors become `anyhow` errors here and are printed by `main`.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;

use crate::cli::{Cli, Commands, ConvertArgs};
use crate::pipeline::StepReport;
use crate::printer::Printer;

mod cfg_to_toml;
mod convert;
mod format_cfg;
mod format_toml;
mod setup_to_cfg;

/// Exit status for setup2toml commands.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExitStatus {
    /// The command succeeded.
    Success,

    /// Validation errors remain, or `--check` found differences.
    Failure,

    /// The input could not be read, parsed or converted.
    Error,
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Success => Self::from(0),
            ExitStatus::Failure => Self::from(1),
            ExitStatus::Error => Self::from(2),
        }
    }
}

/// Dispatch a parsed CLI command to the appropriate handler.
pub fn dispatch(cli: Cli, printer: Printer) -> Result<ExitStatus> {
    let list_threshold = cli.global.list_threshold;
    let command = match (cli.command, cli.path) {
        (Some(command), _) => command,
        (None, Some(path)) => Commands::Convert(ConvertArgs {
            path,
            fix: cli.fix,
        }),
        (None, None) => anyhow::bail!("a path to convert is required"),
    };
    tracing::debug!("Running `{}`", command.name());

    match command {
        Commands::Convert(args) => convert::execute(&args, list_threshold, printer),
        Commands::SetupToCfg(args) => setup_to_cfg::execute(&args, list_threshold, printer),
        Commands::FormatCfg(args) => format_cfg::execute(&args, printer),
        Commands::CfgToToml(args) => cfg_to_toml::execute(&args, printer),
        Commands::FormatToml(args) => format_toml::execute(&args, printer),
    }
}

/// Print the findings of a step and what it did to its file.
fn print_step(printer: Printer, report: &StepReport, check: bool) {
    printer.diagnostics(&report.diagnostics);
    let path = report.path.display();
    let message = match (report.changed, check) {
        (true, true) => format!("Would reformat {path}"),
        (true, false) => format!("Wrote {path}"),
        (false, _) => format!("{path} is unchanged"),
    };
    printer.info(&format!("{}: {message}", report.step));
}

/// `name` in the directory of `path`.
fn sibling(path: &Path, name: &str) -> std::path::PathBuf {
    path.parent().unwrap_or_else(|| Path::new("")).join(name)
}
