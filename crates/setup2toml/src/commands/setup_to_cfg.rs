//! `setup2toml setup-to-cfg`: read a setup script and write `setup.cfg`.

use anyhow::{Context, Result};

use crate::cli::SetupToCfgArgs;
use crate::commands::{ExitStatus, print_step, sibling};
use crate::pipeline;
use crate::printer::Printer;

/// Execute `setup2toml setup-to-cfg`.
pub(crate) fn execute(
    args: &SetupToCfgArgs,
    list_threshold: usize,
    printer: Printer,
) -> Result<ExitStatus> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| sibling(&args.path, "setup.cfg"));
    let report = pipeline::setup_to_cfg(&args.path, &output, list_threshold)
        .with_context(|| format!("failed to read `{}`", args.path.display()))?;
    print_step(printer, &report, false);
    Ok(ExitStatus::Success)
}
