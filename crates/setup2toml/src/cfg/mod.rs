//! `setup.cfg` reading, normalization and writing.
//!
//! The document model keeps everything a round trip needs: section and key
//! order, the raw lines of multi-line values, and the comment lines attached
//! to each section and entry. Parsing follows Python's `configparser` the way
//! setuptools configures it (case-sensitive keys, no inline comments).
//!
//! ```text
//! [metadata]          <- Section
//! # maintained by ... <- Entry::comments
//! classifiers =       <- Entry::first (empty)
//!     License :: OSI  <- ValueLine::Text
//! ```

use indexmap::IndexMap;

mod format;
mod parse;

pub use format::format_cfg;
pub use parse::{ParseError, ParseErrorKind};

/// A parsed `setup.cfg` (or any INI file setuptools could read).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SetupCfg {
    pub(crate) sections: IndexMap<String, Section>,
    /// Comment lines after the last entry of the file.
    pub(crate) trailing_comments: Vec<String>,
}

/// A `[section]` and its entries, in file order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Section {
    pub(crate) comments: Vec<String>,
    pub(crate) entries: IndexMap<String, Entry>,
}

/// A single `key = value` entry, possibly spanning several lines.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Entry {
    pub(crate) comments: Vec<String>,
    /// The text after the delimiter on the key's own line.
    pub(crate) first: String,
    pub(crate) continuation: Vec<ValueLine>,
}

/// A continuation line of a multi-line value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueLine {
    Text(String),
    Blank,
    Comment(String),
}

impl SetupCfg {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    /// Iterate over sections in file order.
    pub fn sections(&self) -> impl Iterator<Item = (&str, &Section)> {
        self.sections
            .iter()
            .map(|(name, section)| (name.as_str(), section))
    }

    /// Return the section named `name`, appending an empty one if needed.
    pub fn section_mut(&mut self, name: &str) -> &mut Section {
        self.sections.entry(name.to_owned()).or_default()
    }

    /// Return the joined value of `key` in `section`.
    pub fn get(&self, section: &str, key: &str) -> Option<String> {
        self.section(section)?.get(key).map(Entry::value)
    }

    /// Set `key` in `section` to `value`, keeping the position and comments of
    /// an existing entry.
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.section_mut(section).set(key, value);
    }

    /// Merge `other` into this document.
    ///
    /// Sections of `self` keep their order and new sections are appended. For
    /// a key present in both, the value from `other` replaces the existing
    /// value in place.
    pub fn merge(&mut self, other: Self) {
        for (name, section) in other.sections {
            match self.sections.get_mut(&name) {
                Some(existing) => {
                    for (key, entry) in section.entries {
                        match existing.entries.get_mut(&key) {
                            Some(current) => {
                                current.first = entry.first;
                                current.continuation = entry.continuation;
                            }
                            None => {
                                existing.entries.insert(key, entry);
                            }
                        }
                    }
                }
                None => {
                    self.sections.insert(name, section);
                }
            }
        }
        self.trailing_comments.extend(other.trailing_comments);
    }
}

impl Section {
    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn set(&mut self, key: &str, value: &str) {
        let replacement = Entry::from_value(value);
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.first = replacement.first;
                entry.continuation = replacement.continuation;
            }
            None => {
                self.entries.insert(key.to_owned(), replacement);
            }
        }
    }
}

impl Entry {
    /// Build an entry from a value whose lines are separated by `\n`.
    ///
    /// The first line stays on the key's line; a value starting with a
    /// newline becomes a dangling list.
    pub fn from_value(value: &str) -> Self {
        let mut lines = value.split('\n');
        let first = lines.next().unwrap_or_default().trim().to_owned();
        let mut continuation: Vec<ValueLine> = lines
            .map(|line| {
                let line = line.trim();
                if line.is_empty() {
                    ValueLine::Blank
                } else {
                    ValueLine::Text(line.to_owned())
                }
            })
            .collect();
        while continuation.last() == Some(&ValueLine::Blank) {
            continuation.pop();
        }
        Self {
            comments: Vec::new(),
            first,
            continuation,
        }
    }

    /// The value as `configparser` reports it: lines joined with `\n`,
    /// comments removed.
    pub fn value(&self) -> String {
        let mut value = self.first.clone();
        for line in &self.continuation {
            match line {
                ValueLine::Text(text) => {
                    value.push('\n');
                    value.push_str(text);
                }
                ValueLine::Blank => value.push('\n'),
                ValueLine::Comment(_) => {}
            }
        }
        value
    }

    pub fn is_multiline(&self) -> bool {
        self.continuation
            .iter()
            .any(|line| matches!(line, ValueLine::Text(_)))
    }
}
