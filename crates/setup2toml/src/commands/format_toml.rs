//! `setup2toml format-toml`: validate and reformat a `pyproject.toml`.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::cli::FormatTomlArgs;
use crate::commands::{ExitStatus, print_step};
use crate::pipeline;
use crate::printer::Printer;
use crate::pyproject::find_pyproject;

/// Execute `setup2toml format-toml`.
pub(crate) fn execute(args: &FormatTomlArgs, printer: Printer) -> Result<ExitStatus> {
    let path = match &args.path {
        Some(path) => path.clone(),
        None => {
            let explicit = env::var_os("SETUP2TOML_PYPROJECT").map(PathBuf::from);
            find_pyproject(&env::current_dir()?, explicit.as_deref())?
        }
    };

    let report = pipeline::format_toml(&path, args.fix, args.check)
        .with_context(|| format!("failed to format `{}`", path.display()))?;
    print_step(printer, &report, args.check);

    if report.diagnostics.has_errors() || (args.check && report.changed) {
        return Ok(ExitStatus::Failure);
    }
    Ok(ExitStatus::Success)
}
