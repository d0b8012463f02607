//! `setup2toml cfg-to-toml`: convert `setup.cfg` to `pyproject.toml`.

use anyhow::{Context, Result};

use crate::cli::CfgToTomlArgs;
use crate::commands::{ExitStatus, print_step, sibling};
use crate::pipeline;
use crate::printer::Printer;

/// Execute `setup2toml cfg-to-toml`.
pub(crate) fn execute(args: &CfgToTomlArgs, printer: Printer) -> Result<ExitStatus> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| sibling(&args.path, "pyproject.toml"));
    let report = pipeline::cfg_to_toml(&args.path, &output)
        .with_context(|| format!("failed to convert `{}`", args.path.display()))?;
    print_step(printer, &report, false);
    Ok(ExitStatus::Success)
}
