//! `setup.cfg` to `pyproject.toml` conversion.
//!
//! `[metadata]` and `[options]` map onto `[project]` and
//! `[tool.setuptools]`; every other section is carried over under `[tool]`.
//! Nothing is dropped silently: keys without a home land in
//! `[tool.setup2toml.unmapped]` and each is reported.

use toml::{Table, Value};
use tracing::{debug, trace};

use crate::cfg::{Section, SetupCfg};
use crate::diagnostics::Diagnostics;

use super::requirement::Requirement;

const SETUPTOOLS_REQUIREMENT: &str = "setuptools>=61.2";
const BUILD_BACKEND: &str = "setuptools.build_meta";

/// Sections configuring a distutils or setuptools command.
const COMMAND_SECTIONS: &[&str] = &[
    "aliases",
    "bdist",
    "bdist_egg",
    "bdist_rpm",
    "bdist_wheel",
    "build",
    "build_clib",
    "build_ext",
    "build_py",
    "build_scripts",
    "check",
    "clean",
    "develop",
    "dist_info",
    "easy_install",
    "egg_info",
    "install",
    "install_data",
    "install_headers",
    "install_lib",
    "install_scripts",
    "register",
    "rotate",
    "saveopts",
    "sdist",
    "setopt",
    "upload",
    "upload_docs",
];

/// `[options]` keys setuptools no longer reads from `pyproject.toml`.
const DROPPED_OPTIONS: &[&str] = &[
    "test_suite",
    "tests_loader",
    "use_2to3",
    "use_2to3_fixers",
    "use_2to3_exclude_fixers",
    "convert_2to3_doctest",
    "dependency_links",
];

/// Convert a parsed `setup.cfg` into a `pyproject.toml` document.
pub fn cfg_to_pyproject(cfg: &SetupCfg) -> (Table, Diagnostics) {
    let mut converter = Converter::default();
    converter.build_system(cfg.get("options", "setup_requires").as_deref());

    for (name, section) in cfg.sections() {
        debug!("Converting section `[{name}]`");
        match name {
            "metadata" => converter.metadata(section),
            "options" => converter.options(section),
            "options.entry_points" => converter.entry_points(section),
            "options.extras_require" => converter.extras(section),
            "options.packages.find" => converter.packages_find(section),
            "options.package_data" => converter.file_lists(section, "package-data"),
            "options.exclude_package_data" => {
                converter.file_lists(section, "exclude-package-data");
            }
            "options.data_files" => converter.file_lists(section, "data-files"),
            "pytest" | "tool:pytest" => {
                converter.generic(section, &["tool", "pytest", "ini_options"]);
            }
            name if COMMAND_SECTIONS.contains(&name) => {
                converter.generic(section, &["tool", "distutils", name]);
            }
            name => {
                let mut path = vec!["tool"];
                path.extend(name.split(':').map(str::trim));
                converter.generic(section, &path);
            }
        }
    }

    converter.finish()
}

#[derive(Default)]
struct Converter {
    document: Table,
    diagnostics: Diagnostics,
    /// `packages = find:` (false) or `find_namespace:` (true).
    find_packages: Option<bool>,
    readme: Readme,
    authors: People,
    maintainers: People,
}

#[derive(Default)]
struct Readme {
    value: Option<String>,
    content_type: Option<String>,
}

#[derive(Default)]
struct People {
    names: Option<String>,
    emails: Option<String>,
}

/// A `file:` or `attr:` value.
enum Directive {
    Attr(String),
    File(Vec<String>),
}

impl Directive {
    fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Some(attr) = value.strip_prefix("attr:") {
            Some(Self::Attr(attr.trim().to_owned()))
        } else {
            value
                .strip_prefix("file:")
                .map(|files| Self::File(split_list(files, ',')))
        }
    }

    fn into_value(self) -> Value {
        let mut table = Table::new();
        match self {
            Self::Attr(attr) => {
                table.insert("attr".to_owned(), Value::String(attr));
            }
            Self::File(mut files) if files.len() == 1 => {
                table.insert("file".to_owned(), Value::String(files.remove(0)));
            }
            Self::File(files) => {
                table.insert("file".to_owned(), string_array(files));
            }
        }
        Value::Table(table)
    }
}

impl Converter {
    fn project(&mut self) -> &mut Table {
        table_mut(&mut self.document, &["project"])
    }

    fn setuptools(&mut self) -> &mut Table {
        table_mut(&mut self.document, &["tool", "setuptools"])
    }

    fn unmapped(&mut self, section: &str, key: &str, value: &str) {
        self.diagnostics.warn(format!(
            "`{section}.{key}` has no pyproject.toml equivalent and was kept under `tool.setup2toml.unmapped`"
        ));
        table_mut(&mut self.document, &["tool", "setup2toml", "unmapped", section])
            .insert(key.to_owned(), generic_value(value));
    }

    /// Mark `field` as dynamic, resolved by setuptools from `directive`.
    fn dynamic(&mut self, field: &str, directive: Directive) {
        self.mark_dynamic(field);
        table_mut(&mut self.document, &["tool", "setuptools", "dynamic"])
            .insert(field.to_owned(), directive.into_value());
    }

    fn mark_dynamic(&mut self, field: &str) {
        trace!("`{field}` is dynamic");
        let dynamic = self
            .project()
            .entry("dynamic")
            .or_insert(Value::Array(Vec::new()));
        if let Value::Array(fields) = dynamic {
            if !fields.iter().any(|f| f.as_str() == Some(field)) {
                fields.push(Value::String(field.to_owned()));
            }
        }
    }

    fn build_system(&mut self, setup_requires: Option<&str>) {
        let extra = setup_requires
            .map(|value| split_list(value, ';'))
            .unwrap_or_default();
        let has_setuptools = extra.iter().any(|requirement| {
            requirement
                .parse::<Requirement>()
                .is_ok_and(|requirement| requirement.name.as_str() == "setuptools")
        });

        let mut requires = Vec::new();
        if !has_setuptools {
            requires.push(SETUPTOOLS_REQUIREMENT.to_owned());
        }
        requires.extend(extra);

        let build_system = table_mut(&mut self.document, &["build-system"]);
        build_system.insert("requires".to_owned(), string_array(requires));
        build_system.insert(
            "build-backend".to_owned(),
            Value::String(BUILD_BACKEND.to_owned()),
        );
    }

    fn metadata(&mut self, section: &Section) {
        for (key, entry) in section.entries() {
            let key = canonical_metadata_key(key);
            let value = entry.value();
            let value = value.trim();
            match key.as_str() {
                "name" => {
                    self.project()
                        .insert("name".to_owned(), Value::String(value.to_owned()));
                }
                "version" | "description" => self.string_or_dynamic(&key, value),
                "classifiers" | "keywords" => match Directive::parse(value) {
                    Some(directive) => self.dynamic(&key, directive),
                    None => {
                        let items = split_list(value, ',');
                        self.project().insert(key.clone(), string_array(items));
                    }
                },
                "long_description" => self.readme.value = Some(value.to_owned()),
                "long_description_content_type" => {
                    self.readme.content_type = Some(value.to_owned());
                }
                "license" => {
                    let license = match Directive::parse(value) {
                        Some(Directive::File(mut files)) if files.len() == 1 => {
                            inline_table([("file", Value::String(files.remove(0)))])
                        }
                        _ => inline_table([("text", Value::String(value.to_owned()))]),
                    };
                    self.project().insert("license".to_owned(), license);
                }
                "license_files" => {
                    let files = split_list(value, ',');
                    self.project()
                        .insert("license-files".to_owned(), string_array(files));
                }
                "author" => self.authors.names = Some(value.to_owned()),
                "author_email" => self.authors.emails = Some(value.to_owned()),
                "maintainer" => self.maintainers.names = Some(value.to_owned()),
                "maintainer_email" => self.maintainers.emails = Some(value.to_owned()),
                "url" => self.url("Homepage", value),
                "download_url" => self.url("Download", value),
                "project_urls" => {
                    for (name, url) in split_mapping(value) {
                        self.url(&name, &url);
                    }
                }
                "platforms" | "provides" | "obsoletes" => {
                    let items = split_list(value, ',');
                    self.setuptools().insert(key.clone(), string_array(items));
                }
                _ => self.unmapped("metadata", &key, value),
            }
        }
    }

    fn string_or_dynamic(&mut self, field: &str, value: &str) {
        match Directive::parse(value) {
            Some(directive) => self.dynamic(field, directive),
            None => {
                self.project()
                    .insert(field.to_owned(), Value::String(value.to_owned()));
            }
        }
    }

    fn url(&mut self, name: &str, url: &str) {
        table_mut(&mut self.document, &["project", "urls"])
            .insert(name.to_owned(), Value::String(url.to_owned()));
    }

    fn options(&mut self, section: &Section) {
        for (key, entry) in section.entries() {
            let key = key.replace('-', "_");
            let value = entry.value();
            let value = value.trim();
            match key.as_str() {
                "install_requires" => match Directive::parse(value) {
                    Some(directive) => self.dynamic("dependencies", directive),
                    None => {
                        let requirements = split_list(value, ';');
                        self.project()
                            .insert("dependencies".to_owned(), string_array(requirements));
                    }
                },
                "python_requires" => {
                    self.project()
                        .insert("requires-python".to_owned(), Value::String(value.to_owned()));
                }
                "tests_require" => {
                    let requirements = split_list(value, ';');
                    self.optional_dependencies("testing", requirements);
                }
                // Part of `[build-system]`.
                "setup_requires" => {}
                "zip_safe" | "include_package_data" => match parse_bool(value) {
                    Some(flag) => {
                        self.setuptools()
                            .insert(key.replace('_', "-"), Value::Boolean(flag));
                    }
                    None => self.unmapped("options", &key, value),
                },
                "packages" => match value {
                    "find:" => self.find_packages = Some(false),
                    "find_namespace:" => self.find_packages = Some(true),
                    _ => {
                        let packages = split_list(value, ',');
                        self.setuptools()
                            .insert("packages".to_owned(), string_array(packages));
                    }
                },
                "package_dir" => {
                    let mut mapping = Table::new();
                    for (package, dir) in split_mapping(value) {
                        mapping.insert(package, Value::String(dir));
                    }
                    self.setuptools()
                        .insert("package-dir".to_owned(), Value::Table(mapping));
                }
                "scripts" => {
                    let scripts = split_list(value, ',');
                    self.setuptools()
                        .insert("script-files".to_owned(), string_array(scripts));
                }
                "py_modules" | "eager_resources" | "namespace_packages" => {
                    let items = split_list(value, ',');
                    self.setuptools()
                        .insert(key.replace('_', "-"), string_array(items));
                }
                key if DROPPED_OPTIONS.contains(&key) => {
                    self.diagnostics.warn(format!(
                        "`options.{key}` is not supported in pyproject.toml and was dropped"
                    ));
                }
                _ => self.unmapped("options", &key, value),
            }
        }
    }

    fn optional_dependencies(&mut self, group: &str, requirements: Vec<String>) {
        let groups = table_mut(&mut self.document, &["project", "optional-dependencies"]);
        match groups.get_mut(group) {
            Some(Value::Array(existing)) => {
                existing.extend(requirements.into_iter().map(Value::String));
            }
            _ => {
                groups.insert(group.to_owned(), string_array(requirements));
            }
        }
    }

    fn entry_points(&mut self, section: &Section) {
        for (group, entry) in section.entries() {
            let path = match group {
                "console_scripts" => vec!["project", "scripts"],
                "gui_scripts" => vec!["project", "gui-scripts"],
                group => vec!["project", "entry-points", group],
            };
            let mut entry_points = Vec::new();
            for line in entry.value().lines().map(str::trim) {
                if line.is_empty() {
                    continue;
                }
                match line.split_once('=') {
                    Some((name, target)) => {
                        entry_points.push((name.trim().to_owned(), target.trim().to_owned()));
                    }
                    None => self.diagnostics.warn(format!(
                        "entry point `{line}` in group `{group}` has no `=` and was skipped"
                    )),
                }
            }
            let table = table_mut(&mut self.document, &path);
            for (name, target) in entry_points {
                table.insert(name, Value::String(target));
            }
        }
    }

    fn extras(&mut self, section: &Section) {
        for (group, entry) in section.entries() {
            let value = entry.value();
            match Directive::parse(&value) {
                Some(directive) => {
                    self.mark_dynamic("optional-dependencies");
                    table_mut(
                        &mut self.document,
                        &["tool", "setuptools", "dynamic", "optional-dependencies"],
                    )
                    .insert(group.to_owned(), directive.into_value());
                }
                None => self.optional_dependencies(group, split_list(&value, ';')),
            }
        }
    }

    fn packages_find(&mut self, section: &Section) {
        let find = table_mut(&mut self.document, &["tool", "setuptools", "packages", "find"]);
        for (key, entry) in section.entries() {
            let value = entry.value();
            let value = match key {
                "namespaces" => match parse_bool(&value) {
                    Some(flag) => Value::Boolean(flag),
                    None => Value::String(value.trim().to_owned()),
                },
                _ => string_array(split_list(&value, ',')),
            };
            find.insert(key.to_owned(), value);
        }
    }

    fn file_lists(&mut self, section: &Section, key: &str) {
        let table = table_mut(&mut self.document, &["tool", "setuptools", key]);
        for (name, entry) in section.entries() {
            let name = if name.is_empty() { "*" } else { name };
            table.insert(name.to_owned(), string_array(split_list(&entry.value(), ',')));
        }
    }

    fn generic(&mut self, section: &Section, path: &[&str]) {
        let table = table_mut(&mut self.document, path);
        for (key, entry) in section.entries() {
            table.insert(key.to_owned(), generic_value(&entry.value()));
        }
    }

    fn finish(mut self) -> (Table, Diagnostics) {
        if let Some(namespace) = self.find_packages {
            let find = table_mut(&mut self.document, &["tool", "setuptools", "packages", "find"]);
            if !namespace && !find.contains_key("namespaces") {
                find.insert("namespaces".to_owned(), Value::Boolean(false));
            }
        }

        let readme = std::mem::take(&mut self.readme);
        self.finish_readme(readme);

        let authors = std::mem::take(&mut self.authors).into_array();
        if let Some(authors) = authors {
            self.project().insert("authors".to_owned(), authors);
        }
        let maintainers = std::mem::take(&mut self.maintainers).into_array();
        if let Some(maintainers) = maintainers {
            self.project().insert("maintainers".to_owned(), maintainers);
        }

        (self.document, self.diagnostics)
    }

    fn finish_readme(&mut self, readme: Readme) {
        let Some(value) = readme.value else {
            if let Some(content_type) = readme.content_type {
                self.unmapped("metadata", "long_description_content_type", &content_type);
            }
            return;
        };

        match Directive::parse(&value) {
            Some(Directive::File(files)) if files.len() == 1 => {
                let file = &files[0];
                let readme = match readme.content_type {
                    Some(content_type) => inline_table([
                        ("file", Value::String(file.clone())),
                        ("content-type", Value::String(content_type)),
                    ]),
                    None if has_readme_extension(file) => Value::String(file.clone()),
                    None => inline_table([
                        ("file", Value::String(file.clone())),
                        ("content-type", Value::String(content_type_for(file).to_owned())),
                    ]),
                };
                self.project().insert("readme".to_owned(), readme);
            }
            Some(Directive::File(files)) => {
                let content_type = readme.content_type.unwrap_or_else(|| {
                    files
                        .first()
                        .map_or("text/x-rst", |file| content_type_for(file))
                        .to_owned()
                });
                self.dynamic("readme", Directive::File(files));
                if let Some(Value::Table(dynamic)) = self
                    .document
                    .get_mut("tool")
                    .and_then(|tool| tool.get_mut("setuptools"))
                    .and_then(|setuptools| setuptools.get_mut("dynamic"))
                    .and_then(|dynamic| dynamic.get_mut("readme"))
                {
                    dynamic.insert("content-type".to_owned(), Value::String(content_type));
                }
            }
            Some(Directive::Attr(_)) => {
                self.unmapped("metadata", "long_description", &value);
                if let Some(content_type) = readme.content_type {
                    self.unmapped("metadata", "long_description_content_type", &content_type);
                }
            }
            None => {
                let readme = inline_table([
                    ("text", Value::String(value)),
                    (
                        "content-type",
                        Value::String(
                            readme
                                .content_type
                                .unwrap_or_else(|| "text/x-rst".to_owned()),
                        ),
                    ),
                ]);
                self.project().insert("readme".to_owned(), readme);
            }
        }
    }
}

impl People {
    /// Pair comma-separated names and emails by position when both lists
    /// have the same length. Otherwise the raw values make up one entry,
    /// since a name such as `Acme, Inc.` may itself contain a comma.
    fn into_array(self) -> Option<Value> {
        let names = self.names.filter(|names| !names.trim().is_empty());
        let emails = self.emails.filter(|emails| !emails.trim().is_empty());
        let people: Vec<(Option<String>, Option<String>)> = match (names, emails) {
            (None, None) => return None,
            (Some(name), None) => vec![(Some(name.trim().to_owned()), None)],
            (None, Some(emails)) => split_list(&emails, ',')
                .into_iter()
                .map(|email| (None, Some(email)))
                .collect(),
            (Some(names), Some(emails)) => {
                let split_names = split_list(&names, ',');
                let split_emails = split_list(&emails, ',');
                if split_names.len() == split_emails.len() {
                    split_names
                        .into_iter()
                        .zip(split_emails)
                        .map(|(name, email)| (Some(name), Some(email)))
                        .collect()
                } else {
                    vec![(
                        Some(names.trim().to_owned()),
                        Some(emails.trim().to_owned()),
                    )]
                }
            }
        };

        let people = people
            .into_iter()
            .map(|(name, email)| {
                let mut person = Table::new();
                if let Some(name) = name {
                    person.insert("name".to_owned(), Value::String(name));
                }
                if let Some(email) = email {
                    person.insert("email".to_owned(), Value::String(email));
                }
                Value::Table(person)
            })
            .collect();
        Some(Value::Array(people))
    }
}

/// The nested table at `path`, created (or replacing a non-table) as needed.
fn table_mut<'t>(mut table: &'t mut Table, path: &[&str]) -> &'t mut Table {
    for key in path {
        let slot = table
            .entry((*key).to_owned())
            .or_insert(Value::Table(Table::new()));
        if !slot.is_table() {
            *slot = Value::Table(Table::new());
        }
        let Value::Table(inner) = slot else {
            unreachable!("slot was just made a table");
        };
        table = inner;
    }
    table
}

fn inline_table<const N: usize>(entries: [(&str, Value); N]) -> Value {
    Value::Table(
        entries
            .into_iter()
            .map(|(key, value)| (key.to_owned(), value))
            .collect(),
    )
}

fn string_array(items: Vec<String>) -> Value {
    Value::Array(items.into_iter().map(Value::String).collect())
}

/// Split a list value the way setuptools does: one item per line when the
/// value spans lines, otherwise on `separator`.
fn split_list(value: &str, separator: char) -> Vec<String> {
    let items: Vec<&str> = if value.contains('\n') {
        value.lines().collect()
    } else {
        value.split(separator).collect()
    };
    items
        .into_iter()
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Split `key = value` lines.
fn split_mapping(value: &str) -> Vec<(String, String)> {
    let lines: Vec<&str> = if value.contains('\n') {
        value.lines().collect()
    } else {
        value.split(',').collect()
    };
    lines
        .into_iter()
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_owned(), value.trim().to_owned()))
        .collect()
}

/// Values of tool sections stay strings; multi-line values become arrays.
fn generic_value(value: &str) -> Value {
    if value.trim().contains('\n') {
        string_array(split_list(value, '\n'))
    } else {
        Value::String(value.trim().to_owned())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn canonical_metadata_key(key: &str) -> String {
    let key = key.replace('-', "_");
    match key.as_str() {
        "home_page" => "url".to_owned(),
        "summary" => "description".to_owned(),
        "classifier" => "classifiers".to_owned(),
        "platform" => "platforms".to_owned(),
        "license_file" => "license_files".to_owned(),
        _ => key,
    }
}

fn has_readme_extension(file: &str) -> bool {
    let lower = file.to_lowercase();
    [".md", ".rst", ".txt"].iter().any(|ext| lower.ends_with(ext))
}

fn content_type_for(file: &str) -> &'static str {
    let lower = file.to_lowercase();
    if lower.ends_with(".md") {
        "text/markdown"
    } else if lower.ends_with(".txt") {
        "text/plain"
    } else {
        "text/x-rst"
    }
}
