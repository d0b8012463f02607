//! User-facing output for setup2toml commands.
//!
//! The [`Printer`] writes to stderr and honours `--quiet`. Errors are always
//! printed. Debug output goes through `tracing` instead (see `logging`).

use anstream::eprintln;
use owo_colors::OwoColorize;

use crate::diagnostics::Diagnostics;

#[derive(Copy, Clone)]
pub struct Printer {
    /// Whether output is suppressed.
    quiet: bool,
}

impl Printer {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Print an informational message to stderr.
    pub fn info(&self, message: &str) {
        if !self.quiet {
            eprintln!("{message}");
        }
    }

    /// Print a warning message to stderr.
    pub fn warn(&self, message: &str) {
        if !self.quiet {
            eprintln!("{}: {}", "warning".yellow().bold(), message);
        }
    }

    /// Print an error message to stderr, even in quiet mode.
    pub fn error(&self, message: &str) {
        eprintln!("{}: {}", "error".red().bold(), message);
    }

    /// Print every finding of `diagnostics`, errors first.
    pub fn diagnostics(&self, diagnostics: &Diagnostics) {
        for error in diagnostics.errors() {
            self.error(error);
        }
        for warning in diagnostics.warnings() {
            self.warn(warning);
        }
    }
}
