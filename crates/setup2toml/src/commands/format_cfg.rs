//! `setup2toml format-cfg`: normalize an INI file in place.

use anyhow::{Context, Result};

use crate::cli::FormatCfgArgs;
use crate::commands::{ExitStatus, print_step};
use crate::pipeline;
use crate::printer::Printer;

/// Execute `setup2toml format-cfg`.
pub(crate) fn execute(args: &FormatCfgArgs, printer: Printer) -> Result<ExitStatus> {
    let report = pipeline::format_cfg(&args.path, args.check)
        .with_context(|| format!("failed to format `{}`", args.path.display()))?;
    print_step(printer, &report, args.check);

    if args.check && report.changed {
        return Ok(ExitStatus::Failure);
    }
    Ok(ExitStatus::Success)
}
