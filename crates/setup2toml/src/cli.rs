//! CLI argument definitions for setup2toml.
//!
//! All clap derive structs live here. The [`Cli`] struct is the top-level
//! parser; [`Commands`] enumerates every subcommand. Without a subcommand,
//! the given path runs through the full pipeline.

use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Args, Parser, Subcommand};

use crate::pipeline::DEFAULT_LIST_THRESHOLD;

/// Clap v3-style help menu colors.
const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Convert setup.py and setup.cfg packaging metadata to pyproject.toml.
#[derive(Parser, Debug)]
#[command(
    name = "setup2toml",
    author,
    version,
    about = "Convert setup.py and setup.cfg packaging metadata to pyproject.toml.",
    styles = STYLES,
    args_conflicts_with_subcommands = true,
    arg_required_else_help = true,
    after_help = "Use `setup2toml help <command>` for more information on a specific command."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// A setup script, `setup.cfg` or `pyproject.toml` to convert.
    pub path: Option<PathBuf>,

    /// Apply fixable validation findings to `pyproject.toml`.
    #[arg(long)]
    pub fix: bool,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct GlobalArgs {
    /// Increase logging verbosity.
    #[arg(global = true, short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors.
    #[arg(global = true, short, long)]
    pub quiet: bool,

    /// Write lists longer than this many characters one item per line.
    #[arg(
        global = true,
        long,
        env = "SETUP2TOML_LIST_THRESHOLD",
        value_name = "N",
        default_value_t = DEFAULT_LIST_THRESHOLD
    )]
    pub list_threshold: usize,
}

/// Top-level subcommands for setup2toml.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full pipeline on a file (the default).
    Convert(ConvertArgs),

    /// Read a setup script statically and write `setup.cfg`.
    SetupToCfg(SetupToCfgArgs),

    /// Normalize a `setup.cfg` or other INI file in place.
    FormatCfg(FormatCfgArgs),

    /// Convert `setup.cfg` to `pyproject.toml`.
    CfgToToml(CfgToTomlArgs),

    /// Validate and reformat a `pyproject.toml` in place.
    FormatToml(FormatTomlArgs),
}

impl Commands {
    /// Return the subcommand name as a static string (for diagnostics).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Convert(_) => "convert",
            Self::SetupToCfg(_) => "setup-to-cfg",
            Self::FormatCfg(_) => "format-cfg",
            Self::CfgToToml(_) => "cfg-to-toml",
            Self::FormatToml(_) => "format-toml",
        }
    }
}

/// Arguments for `setup2toml convert`.
#[derive(Parser, Debug)]
pub struct ConvertArgs {
    /// A setup script, `setup.cfg` or `pyproject.toml`.
    ///
    /// The format is chosen by extension: `.toml` is only validated and
    /// formatted, `.cfg` and `.ini` skip the setup script step, anything
    /// else is read as a setup script.
    pub path: PathBuf,

    /// Apply fixable validation findings to `pyproject.toml`.
    #[arg(long, env = "SETUP2TOML_FIX")]
    pub fix: bool,
}

/// Arguments for `setup2toml setup-to-cfg`.
#[derive(Parser, Debug)]
pub struct SetupToCfgArgs {
    /// The setup script to read. It is never executed.
    pub path: PathBuf,

    /// Where to write the result (default: `setup.cfg` next to the script).
    ///
    /// An existing file is merged: its sections and keys keep their order
    /// and values from the script win.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for `setup2toml format-cfg`.
#[derive(Parser, Debug)]
pub struct FormatCfgArgs {
    /// The INI file to normalize.
    pub path: PathBuf,

    /// Exit with status 1 if the file would change, without writing it.
    #[arg(long)]
    pub check: bool,
}

/// Arguments for `setup2toml cfg-to-toml`.
#[derive(Parser, Debug)]
pub struct CfgToTomlArgs {
    /// The `setup.cfg` to convert.
    pub path: PathBuf,

    /// Where to write the result (default: `pyproject.toml` next to the input).
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for `setup2toml format-toml`.
#[derive(Parser, Debug)]
pub struct FormatTomlArgs {
    /// The file to format. If omitted, the nearest `pyproject.toml` in the
    /// current directory or its parents (or `SETUP2TOML_PYPROJECT`).
    pub path: Option<PathBuf>,

    /// Apply fixable validation findings.
    #[arg(long, env = "SETUP2TOML_FIX")]
    pub fix: bool,

    /// Exit with status 1 if the file would change, without writing it.
    #[arg(long)]
    pub check: bool,
}
