//! `setup2toml convert`: run every step from the given file to `pyproject.toml`.

use anyhow::{Context, Result};

use crate::cli::ConvertArgs;
use crate::commands::{ExitStatus, print_step};
use crate::pipeline::{self, Options};
use crate::printer::Printer;

/// Execute `setup2toml convert`.
pub(crate) fn execute(
    args: &ConvertArgs,
    list_threshold: usize,
    printer: Printer,
) -> Result<ExitStatus> {
    let options = Options {
        fix: args.fix,
        list_threshold,
    };
    let report = pipeline::convert(&args.path, options)
        .with_context(|| format!("failed to convert `{}`", args.path.display()))?;

    for step in &report.steps {
        print_step(printer, step, false);
    }

    if report.has_errors() {
        if !args.fix {
            printer.info("Some problems may be fixable with `--fix`.");
        }
        return Ok(ExitStatus::Failure);
    }
    Ok(ExitStatus::Success)
}
