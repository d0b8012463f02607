//! Integration tests for setup2toml.
//!
//! Following the single-integration-test pattern from:
//! <https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html>

pub(crate) mod common;

mod convert;
mod format_cfg;
mod format_toml;
mod help;
mod setup_to_cfg;
mod verbosity;
mod version;
