//! Canonical `setup.cfg` layout.

use std::fmt;

use indexmap::IndexMap;
use tracing::debug;

use crate::cfg::{ParseError, Section, SetupCfg, ValueLine};

/// Indentation of continuation lines.
const INDENT: &str = "    ";

/// Section order used by the setuptools documentation.
const SECTION_ORDER: &[&str] = &[
    "metadata",
    "options",
    "options.packages.find",
    "options.package_data",
    "options.exclude_package_data",
    "options.extras_require",
    "options.entry_points",
    "options.data_files",
];

const METADATA_ORDER: &[&str] = &[
    "name",
    "version",
    "author",
    "author_email",
    "maintainer",
    "maintainer_email",
    "url",
    "download_url",
    "project_urls",
    "description",
    "long_description",
    "long_description_content_type",
    "keywords",
    "license",
    "license_file",
    "license_files",
    "classifiers",
    "platforms",
    "provides",
    "requires",
    "obsoletes",
];

const OPTIONS_ORDER: &[&str] = &[
    "zip_safe",
    "setup_requires",
    "install_requires",
    "extras_require",
    "python_requires",
    "entry_points",
    "use_2to3",
    "use_2to3_fixers",
    "use_2to3_exclude_fixers",
    "convert_2to3_doctest",
    "scripts",
    "eager_resources",
    "dependency_links",
    "tests_require",
    "test_suite",
    "include_package_data",
    "packages",
    "package_dir",
    "package_data",
    "exclude_package_data",
    "namespace_packages",
    "py_modules",
    "data_files",
];

/// Parse `source` and render it in canonical form.
pub fn format_cfg(source: &str) -> Result<String, ParseError> {
    let mut document: SetupCfg = source.parse()?;
    document.normalize();
    Ok(document.to_string())
}

/// Position of `name` in `order`, with unknown names sorted last.
fn rank(order: &[&str], name: &str) -> usize {
    order
        .iter()
        .position(|known| *known == name)
        .unwrap_or(order.len())
}

fn key_order(section: &str) -> Option<&'static [&'static str]> {
    match section {
        "metadata" => Some(METADATA_ORDER),
        "options" => Some(OPTIONS_ORDER),
        _ => None,
    }
}

impl SetupCfg {
    /// Put sections and the keys of `[metadata]` and `[options]` in canonical
    /// order, and spell dashed setuptools keys with underscores.
    ///
    /// Unknown sections and keys keep their relative order after the known
    /// ones.
    pub fn normalize(&mut self) {
        for (name, section) in &mut self.sections {
            if let Some(order) = key_order(name) {
                underscore_keys(name, section);
                section
                    .entries
                    .sort_by(|a, _, b, _| rank(order, a).cmp(&rank(order, b)));
            }
        }
        self.sections
            .sort_by(|a, _, b, _| rank(SECTION_ORDER, a).cmp(&rank(SECTION_ORDER, b)));
    }
}

/// Rename `author-email` style keys to `author_email`, unless that would clash
/// with a key already present.
fn underscore_keys(section_name: &str, section: &mut Section) {
    if !section.entries.keys().any(|key| key.contains('-')) {
        return;
    }

    let entries = std::mem::take(&mut section.entries);
    let mut renamed = IndexMap::with_capacity(entries.len());
    for (key, entry) in &entries {
        let underscored = key.replace('-', "_");
        let target = if underscored != *key
            && !entries.contains_key(&underscored)
            && !renamed.contains_key(&underscored)
        {
            debug!("Renaming `{key}` to `{underscored}` in `[{section_name}]`");
            underscored
        } else {
            key.clone()
        };
        renamed.insert(target, entry.clone());
    }
    section.entries = renamed;
}

impl fmt::Display for SetupCfg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (name, section)) in self.sections.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            for comment in &section.comments {
                writeln!(f, "{comment}")?;
            }
            writeln!(f, "[{name}]")?;

            for (key, entry) in &section.entries {
                for comment in &entry.comments {
                    writeln!(f, "{comment}")?;
                }
                if entry.first.is_empty() {
                    writeln!(f, "{key} =")?;
                } else {
                    writeln!(f, "{key} = {}", entry.first)?;
                }
                for line in &entry.continuation {
                    match line {
                        ValueLine::Text(text) => writeln!(f, "{INDENT}{text}")?,
                        ValueLine::Comment(comment) => writeln!(f, "{INDENT}{comment}")?,
                        ValueLine::Blank => writeln!(f)?,
                    }
                }
            }
        }

        if !self.trailing_comments.is_empty() {
            if !self.sections.is_empty() {
                writeln!(f)?;
            }
            for comment in &self.trailing_comments {
                writeln!(f, "{comment}")?;
            }
        }
        Ok(())
    }
}
