//! `pyproject.toml` production and checking.
//!
//! - [`cfg_to_pyproject`] maps a `setup.cfg` onto PEP 621 metadata.
//! - [`validate`] checks the metadata and repairs what it can.
//! - [`format_document`] writes the canonical layout.

mod convert;
mod discovery;
mod format;
mod requirement;
mod validate;

pub use convert::cfg_to_pyproject;
pub use discovery::find_pyproject;
pub use format::format_document;
pub use requirement::{
    Requirement, RequirementError, canonicalize, correct_syntax, is_valid_name, normalize_name,
};
pub use validate::{Validation, Verdict, validate};
