use std::str::FromStr;

use indexmap::map::Entry as MapEntry;
use tracing::trace;

use crate::cfg::{Entry, Section, SetupCfg, ValueLine};

/// A syntax error in an INI document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    line: usize,
    kind: ParseErrorKind,
}

impl ParseError {
    /// The 1-based line the error was found on.
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("expected a `[section]` header before `{0}`")]
    MissingSectionHeader(String),
    #[error("section header `{0}` is missing a closing `]`")]
    UnterminatedHeader(String),
    #[error("section header has an empty name")]
    EmptySectionName,
    #[error("section `[{0}]` is defined more than once")]
    DuplicateSection(String),
    #[error("option `{key}` in section `[{section}]` is defined more than once")]
    DuplicateOption { section: String, key: String },
    #[error("expected `key = value`, found `{0}`")]
    MissingDelimiter(String),
    #[error("option name is empty in `{0}`")]
    EmptyKey(String),
}

impl FromStr for SetupCfg {
    type Err = ParseError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        Parser::default().parse(source)
    }
}

#[derive(Default)]
struct Parser {
    document: SetupCfg,
    section: Option<String>,
    /// The open entry and the indentation of its key line.
    key: Option<(String, usize)>,
    /// Blank and comment lines not yet assigned to a value or an entry.
    pending: Vec<ValueLine>,
}

impl Parser {
    fn parse(mut self, source: &str) -> Result<SetupCfg, ParseError> {
        for (index, raw) in source.lines().enumerate() {
            let line = index + 1;
            let trimmed = raw.trim();

            if trimmed.is_empty() {
                if self.key.is_some() {
                    self.pending.push(ValueLine::Blank);
                }
                continue;
            }

            if trimmed.starts_with(['#', ';']) {
                self.pending.push(ValueLine::Comment(trimmed.to_owned()));
                continue;
            }

            let indent = raw.len() - raw.trim_start().len();
            if let Some((_, key_indent)) = &self.key {
                if indent > *key_indent {
                    self.continue_value(trimmed);
                    continue;
                }
            }

            self.key = None;
            if let Some(header) = trimmed.strip_prefix('[') {
                self.start_section(header, trimmed)
                    .map_err(|kind| ParseError { line, kind })?;
            } else {
                self.start_entry(trimmed, indent)
                    .map_err(|kind| ParseError { line, kind })?;
            }
        }

        self.document.trailing_comments = self.take_comments();
        Ok(self.document)
    }

    /// Drain pending lines, keeping only comments.
    fn take_comments(&mut self) -> Vec<String> {
        self.pending
            .drain(..)
            .filter_map(|line| match line {
                ValueLine::Comment(comment) => Some(comment),
                ValueLine::Text(_) | ValueLine::Blank => None,
            })
            .collect()
    }

    fn continue_value(&mut self, text: &str) {
        let (Some(section), Some((key, _))) = (&self.section, &self.key) else {
            return;
        };
        if let Some(entry) = self
            .document
            .sections
            .get_mut(section)
            .and_then(|section| section.entries.get_mut(key))
        {
            entry.continuation.append(&mut self.pending);
            entry.continuation.push(ValueLine::Text(text.to_owned()));
        }
    }

    fn start_section(&mut self, header: &str, line: &str) -> Result<(), ParseErrorKind> {
        let Some(name) = header.strip_suffix(']') else {
            return Err(ParseErrorKind::UnterminatedHeader(line.to_owned()));
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(ParseErrorKind::EmptySectionName);
        }

        let comments = self.take_comments();
        match self.document.sections.entry(name.to_owned()) {
            MapEntry::Occupied(_) => return Err(ParseErrorKind::DuplicateSection(name.to_owned())),
            MapEntry::Vacant(vacant) => {
                vacant.insert(Section {
                    comments,
                    entries: indexmap::IndexMap::new(),
                });
            }
        }
        trace!("Found section `[{name}]`");
        self.section = Some(name.to_owned());
        Ok(())
    }

    fn start_entry(&mut self, line: &str, indent: usize) -> Result<(), ParseErrorKind> {
        let Some(section_name) = self.section.clone() else {
            return Err(ParseErrorKind::MissingSectionHeader(line.to_owned()));
        };
        let Some(delimiter) = line.find(['=', ':']) else {
            return Err(ParseErrorKind::MissingDelimiter(line.to_owned()));
        };
        let key = line[..delimiter].trim();
        if key.is_empty() {
            return Err(ParseErrorKind::EmptyKey(line.to_owned()));
        }
        let value = line[delimiter + 1..].trim();

        let comments = self.take_comments();
        let Some(section) = self.document.sections.get_mut(&section_name) else {
            return Err(ParseErrorKind::MissingSectionHeader(line.to_owned()));
        };
        match section.entries.entry(key.to_owned()) {
            MapEntry::Occupied(_) => {
                return Err(ParseErrorKind::DuplicateOption {
                    section: section_name,
                    key: key.to_owned(),
                });
            }
            MapEntry::Vacant(vacant) => {
                vacant.insert(Entry {
                    comments,
                    first: value.to_owned(),
                    continuation: Vec::new(),
                });
            }
        }
        self.key = Some((key.to_owned(), indent));
        Ok(())
    }
}
