//! `pyproject.toml` discovery: walk up directories to find the nearest one.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use tracing::debug;

/// The filename we're looking for.
const PYPROJECT_NAME: &str = "pyproject.toml";

/// Discover `pyproject.toml` by walking up from `start_dir`.
///
/// An `explicit` path (from `SETUP2TOML_PYPROJECT`) wins over the search and
/// must name an existing file.
pub fn find_pyproject(start_dir: &Path, explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(explicit) = explicit {
        if explicit.is_file() {
            return Ok(explicit.to_path_buf());
        }
        bail!(
            "SETUP2TOML_PYPROJECT is set to '{}' but the file does not exist",
            explicit.display()
        );
    }

    let mut current = start_dir.to_path_buf();
    loop {
        let candidate = current.join(PYPROJECT_NAME);
        debug!("Looking for {}", candidate.display());
        if candidate.is_file() {
            return Ok(candidate);
        }
        if !current.pop() {
            break;
        }
    }

    bail!(
        "could not locate a `pyproject.toml` file in {} or any parent directory",
        start_dir.display()
    );
}
