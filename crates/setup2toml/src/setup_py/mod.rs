//! Static reading of `setup.py` scripts.
//!
//! The script is never executed. Module-level assignments are evaluated as far
//! as they can be known statically (string literals, lists, dicts, paths and
//! files read next to the script), and the keyword arguments of the final
//! `setup()` call are returned for conversion.

use std::path::Path;

use tracing::debug;

pub use lexer::SyntaxError;
pub use to_cfg::setup_call_to_cfg;

mod lexer;
mod reader;
mod to_cfg;

/// A value computed from a setup script.
#[derive(Debug, Clone, PartialEq)]
pub enum PyValue {
    Str(String),
    /// A numeric literal, as written.
    Number(String),
    Bool(bool),
    None,
    /// A list, tuple or set.
    List(Vec<PyValue>),
    Dict(Vec<(PyValue, PyValue)>),
    /// A path relative to the script's directory; empty for the directory itself.
    Path(String),
    /// A file opened by the script.
    File(String),
    /// The text of a file read by the script. `contents` is `None` when the
    /// file could not be read.
    FileContents {
        path: String,
        contents: Option<String>,
    },
    FindPackages(FindPackages),
    /// Anything that cannot be determined without running the script.
    Unknown,
}

impl PyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }
}

/// A call to `find_packages()` or `find_namespace_packages()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindPackages {
    pub namespace: bool,
    pub r#where: Option<String>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

/// The keyword arguments passed to `setup()`, in call order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetupCall {
    keywords: Vec<(String, PyValue)>,
    /// Parts of the call that could not be read statically.
    notes: Vec<String>,
}

impl SetupCall {
    /// Add a keyword, replacing an earlier one with the same name in place.
    pub(crate) fn insert(&mut self, key: String, value: PyValue) {
        match self.keywords.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.keywords.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&PyValue> {
        self.keywords
            .iter()
            .find_map(|(k, value)| (k == key).then_some(value))
    }

    pub fn keywords(&self) -> impl Iterator<Item = (&str, &PyValue)> {
        self.keywords.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error("no `setup()` call found")]
    MissingSetupCall,
}

/// Read the `setup()` call of a script.
///
/// `script_name` is the script's file name (used for `__file__`), and
/// `base_dir` is the directory files opened by the script are read from.
pub fn read_setup_call(
    source: &str,
    script_name: &str,
    base_dir: Option<&Path>,
) -> Result<SetupCall, Error> {
    let tokens = lexer::tokenize(source)?;
    lexer::check_syntax(&tokens)?;
    debug!("Tokenized setup script into {} tokens", tokens.len());
    reader::Reader::new(script_name, base_dir)
        .read(&tokens)
        .ok_or(Error::MissingSetupCall)
}
