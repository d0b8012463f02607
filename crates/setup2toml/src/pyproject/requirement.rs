//! PEP 508 dependency specifiers and PEP 503 project names.
//!
//! Parsing and the canonical spelling come from `uv-pep508` and
//! `uv-normalize`; this module only repairs typos before parsing.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use uv_normalize::PackageName;

/// A lone `=` used where `==` was meant.
static SINGLE_EQUALS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[^<>=!~])=([^=]|$)").expect("valid equals pattern"));

/// A parsed dependency specifier.
pub type Requirement = uv_pep508::Requirement;

/// Whether `name` is a valid PEP 508 project name.
pub fn is_valid_name(name: &str) -> bool {
    PackageName::from_str(name).is_ok()
}

/// The PEP 503 form of a valid project name.
pub fn normalize_name(name: &str) -> Option<String> {
    PackageName::from_str(name).ok().map(|name| name.to_string())
}

/// Repair common typos in a requirement before parsing it, such as
/// `name=1.0` for `name==1.0`. URLs and markers are left alone.
pub fn correct_syntax(requirement: &str) -> String {
    let end = requirement.find(['@', ';']).unwrap_or(requirement.len());
    let (head, tail) = requirement.split_at(end);
    // Applied twice since matches cannot overlap (`a=1,b=2`).
    let head = SINGLE_EQUALS.replace_all(head, "${1}==${2}");
    let head = SINGLE_EQUALS.replace_all(&head, "${1}==${2}");
    format!("{head}{tail}")
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RequirementError {
    message: String,
}

/// Correct, parse and re-render `requirement` in its canonical spelling.
pub fn canonicalize(requirement: &str) -> Result<String, RequirementError> {
    let parsed = Requirement::from_str(&correct_syntax(requirement)).map_err(|err| {
        RequirementError {
            message: err.message.to_string(),
        }
    })?;
    Ok(parsed.to_string())
}
