//! Packaging-metadata checks for a parsed `pyproject.toml`.
//!
//! Validators run in order and each reports its findings under its own
//! name. A validator whose findings break the document's structure stops
//! the ones after it.

use toml::{Table, Value};
use tracing::debug;

use crate::diagnostics::Diagnostics;

use super::requirement::{canonicalize, normalize_name};

/// The outcome of a single validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Clean,
    /// Every finding can be repaired by [`Validator::fix`].
    Fixable,
    /// Some findings need a human.
    Unfixable,
    /// The document is malformed; later validators are skipped.
    Fatal,
}

trait Validator {
    fn name(&self) -> &'static str;

    fn validate(&mut self, document: &Table, diagnostics: &mut Diagnostics) -> Verdict;

    /// Apply the repairs found by the last [`Validator::validate`] call.
    fn fix(&self, document: &mut Table);
}

/// The combined result of all validators.
#[derive(Debug, Default)]
pub struct Validation {
    pub diagnostics: Diagnostics,
    pub verdicts: Vec<(&'static str, Verdict)>,
    /// Whether fixes were applied to the document.
    pub fixed: bool,
}

impl Validation {
    /// Whether errors remain after fixing.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }
}

fn validators() -> Vec<Box<dyn Validator>> {
    vec![
        Box::new(SpecValidator),
        Box::new(NameValidator::default()),
        Box::new(DependencyValidator::default()),
    ]
}

/// Validate `document`, repairing fixable findings in place when `fix` is set.
pub fn validate(document: &mut Table, fix: bool) -> Validation {
    let mut validation = Validation::default();
    for mut validator in validators() {
        let mut diagnostics = Diagnostics::new();
        let verdict = validator.validate(document, &mut diagnostics);
        debug!("Validator `{}`: {verdict:?}", validator.name());
        validation.verdicts.push((validator.name(), verdict));

        if fix && verdict == Verdict::Fixable {
            validator.fix(document);
            validation.fixed = true;
        }
        validation
            .diagnostics
            .extend_scoped(validator.name(), diagnostics);

        if verdict == Verdict::Fatal {
            break;
        }
    }
    validation
}

/// Structural checks of `[build-system]` and `[project]` against the
/// PEP 517 and PEP 621 shapes.
struct SpecValidator;

impl Validator for SpecValidator {
    fn name(&self) -> &'static str {
        "specs"
    }

    fn validate(&mut self, document: &Table, diagnostics: &mut Diagnostics) -> Verdict {
        let mut checker = Checker { diagnostics };
        match document.get("build-system") {
            Some(Value::Table(build_system)) => checker.build_system(build_system),
            Some(_) => checker.error("build-system", "must be a table"),
            None => checker.build_system(&Table::new()),
        }
        match document.get("project") {
            Some(Value::Table(project)) => checker.project(project),
            Some(_) => checker.error("project", "must be a table"),
            None => checker.project(&Table::new()),
        }

        if checker.diagnostics.has_errors() {
            Verdict::Fatal
        } else {
            Verdict::Clean
        }
    }

    fn fix(&self, _document: &mut Table) {}
}

struct Checker<'a> {
    diagnostics: &'a mut Diagnostics,
}

impl Checker<'_> {
    fn error(&mut self, field: &str, message: &str) {
        self.diagnostics.error(format!("`{field}` {message}"));
    }

    fn build_system(&mut self, table: &Table) {
        match table.get("requires") {
            Some(value) => self.string_array("build-system.requires", value),
            None => self.error("build-system.requires", "is required"),
        }
        match table.get("build-backend") {
            Some(value) => self.string("build-system.build-backend", value),
            None => self.error("build-system.build-backend", "is required"),
        }
        if let Some(value) = table.get("backend-path") {
            self.string_array("build-system.backend-path", value);
        }
    }

    fn project(&mut self, table: &Table) {
        match table.get("name") {
            Some(value) => self.string("project.name", value),
            None => self.error("project.name", "is required"),
        }

        let mut dynamic = Vec::new();
        if let Some(value) = table.get("dynamic") {
            self.string_array("project.dynamic", value);
            dynamic = strings(value);
        }
        if dynamic.iter().any(|field| field == "name") {
            self.error("project.dynamic", "must not list the `name` field");
        }

        if !table.contains_key("version") && !dynamic.iter().any(|field| field == "version") {
            self.diagnostics.error("missing field(s): version");
        }
        let redefined: Vec<&str> = table
            .keys()
            .filter(|key| *key != "dynamic" && *key != "name" && dynamic.contains(key))
            .map(String::as_str)
            .collect();
        if !redefined.is_empty() {
            self.diagnostics.error(format!(
                "field(s) defined but also listed as dynamic: {}",
                redefined.join(", ")
            ));
        }

        for (key, value) in table {
            let field = format!("project.{key}");
            match key.as_str() {
                "version" | "description" | "requires-python" => self.string(&field, value),
                "classifiers" | "dependencies" | "keywords" => self.string_array(&field, value),
                "urls" | "scripts" | "gui-scripts" => self.string_table(&field, value),
                "authors" | "maintainers" => self.people(&field, value),
                "readme" => self.readme(value),
                "license" => self.license(value),
                "license-files" => self.license_files(value),
                "entry-points" => self.table_of(&field, value, Self::string_table),
                "optional-dependencies" => self.table_of(&field, value, Self::string_array),
                _ => {}
            }
        }
    }

    fn string(&mut self, field: &str, value: &Value) {
        if !value.is_str() {
            self.error(field, "must be a string");
        }
    }

    fn string_array(&mut self, field: &str, value: &Value) {
        let is_valid = value
            .as_array()
            .is_some_and(|items| items.iter().all(Value::is_str));
        if !is_valid {
            self.error(field, "must be an array of strings");
        }
    }

    fn string_table(&mut self, field: &str, value: &Value) {
        let is_valid = value
            .as_table()
            .is_some_and(|table| table.values().all(Value::is_str));
        if !is_valid {
            self.error(field, "must be a table of strings");
        }
    }

    fn table_of(&mut self, field: &str, value: &Value, check: fn(&mut Self, &str, &Value)) {
        let Some(table) = value.as_table() else {
            self.error(field, "must be a table");
            return;
        };
        for (key, value) in table {
            check(self, &format!("{field}.{key}"), value);
        }
    }

    fn people(&mut self, field: &str, value: &Value) {
        let Some(people) = value.as_array() else {
            self.error(field, "must be an array of tables");
            return;
        };
        for (index, person) in people.iter().enumerate() {
            let field = format!("{field}[{index}]");
            let Some(person) = person.as_table() else {
                self.error(&field, "must be a table");
                continue;
            };
            for (key, value) in person {
                match key.as_str() {
                    "name" | "email" => self.string(&format!("{field}.{key}"), value),
                    _ => self.error(&field, &format!("has an unknown field `{key}`")),
                }
            }
        }
    }

    fn readme(&mut self, value: &Value) {
        const EXTENSIONS: &[&str] = &[".md", ".rst", ".txt"];
        const CONTENT_TYPES: &[&str] = &["text/markdown", "text/x-rst", "text/plain"];

        match value {
            Value::String(path) => {
                let lower = path.to_lowercase();
                if !EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
                    self.error(
                        "project.readme",
                        &format!(
                            "must have one of the following extensions: {}",
                            EXTENSIONS.join(", ")
                        ),
                    );
                }
            }
            Value::Table(table) => {
                self.file_or_text("project.readme", table);
                match table.get("content-type") {
                    Some(Value::String(content_type))
                        if CONTENT_TYPES.contains(&content_type.as_str()) => {}
                    Some(_) => self.error(
                        "project.readme.content-type",
                        &format!("must be one of: {}", CONTENT_TYPES.join(", ")),
                    ),
                    None => self.error("project.readme.content-type", "is required"),
                }
                if let Some(charset) = table.get("charset") {
                    self.string("project.readme.charset", charset);
                }
            }
            _ => self.error("project.readme", "must be a string or a table"),
        }
    }

    fn license(&mut self, value: &Value) {
        match value {
            Value::String(_) => {}
            Value::Table(table) => self.file_or_text("project.license", table),
            _ => self.error("project.license", "must be a string or a table"),
        }
    }

    fn license_files(&mut self, value: &Value) {
        match value {
            Value::Array(_) => self.string_array("project.license-files", value),
            Value::Table(table) => {
                if !table.contains_key("globs") && !table.contains_key("paths") {
                    self.error(
                        "project.license-files",
                        "must contain either a `globs` or `paths` field",
                    );
                }
                for (key, value) in table {
                    self.string_array(&format!("project.license-files.{key}"), value);
                }
            }
            _ => self.error("project.license-files", "must be an array of strings"),
        }
    }

    fn file_or_text(&mut self, field: &str, table: &Table) {
        if table.contains_key("file") && table.contains_key("text") {
            self.error(field, "cannot contain both a `file` and `text` field");
        }
        for key in ["file", "text"] {
            if let Some(value) = table.get(key) {
                self.string(&format!("{field}.{key}"), value);
            }
        }
    }
}

fn strings(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

fn project(document: &Table) -> Option<&Table> {
    document.get("project").and_then(Value::as_table)
}

fn project_mut(document: &mut Table) -> Option<&mut Table> {
    document.get_mut("project").and_then(Value::as_table_mut)
}

/// The project name must be a valid PEP 508 name in its PEP 503 form.
#[derive(Default)]
struct NameValidator {
    normalized: Option<String>,
}

impl Validator for NameValidator {
    fn name(&self) -> &'static str {
        "naming"
    }

    fn validate(&mut self, document: &Table, diagnostics: &mut Diagnostics) -> Verdict {
        self.normalized = None;
        let Some(name) = project(document)
            .and_then(|project| project.get("name"))
            .and_then(Value::as_str)
        else {
            return Verdict::Clean;
        };

        let Some(normalized) = normalize_name(name) else {
            diagnostics
                .error("must only contain ASCII letters/digits, underscores, hyphens, and periods");
            return Verdict::Unfixable;
        };
        if normalized == name {
            return Verdict::Clean;
        }
        diagnostics.warn(format!("should be {normalized}"));
        self.normalized = Some(normalized);
        Verdict::Fixable
    }

    fn fix(&self, document: &mut Table) {
        if let (Some(name), Some(project)) = (&self.normalized, project_mut(document)) {
            project.insert("name".to_owned(), Value::String(name.clone()));
        }
    }
}

/// Every requirement must parse; lists should hold canonical spellings in
/// sorted order.
#[derive(Default)]
struct DependencyValidator {
    dependencies: Option<Vec<String>>,
    optional: Vec<(String, Vec<String>)>,
}

impl DependencyValidator {
    /// Check one requirement list. Returns the repaired list when it differs
    /// from `dependencies` and every entry parsed.
    fn check_list(
        prefix: &str,
        dependencies: &[String],
        diagnostics: &mut Diagnostics,
    ) -> Option<Vec<String>> {
        let mut normalized = Vec::with_capacity(dependencies.len());
        let mut is_valid = true;
        for (index, dependency) in dependencies.iter().enumerate() {
            let number = index + 1;
            match canonicalize(dependency) {
                Ok(canonical) => {
                    if canonical != *dependency {
                        diagnostics.warn(format!(
                            "{prefix} #{number} was corrected from `{dependency}` to `{canonical}`"
                        ));
                    }
                    normalized.push(canonical);
                }
                Err(err) => {
                    diagnostics.error(format!("{prefix} #{number}: `{dependency}`: {err}"));
                    normalized.push(dependency.clone());
                    is_valid = false;
                }
            }
        }

        let mut sorted = normalized.clone();
        sorted.sort_by_key(|dependency| dependency.to_lowercase());
        if sorted != normalized {
            diagnostics.warn(format!(
                "{prefix} are not sorted; corrected order: {}",
                sorted.join(", ")
            ));
        }

        (is_valid && sorted != dependencies).then_some(sorted)
    }
}

impl Validator for DependencyValidator {
    fn name(&self) -> &'static str {
        "dependencies"
    }

    fn validate(&mut self, document: &Table, diagnostics: &mut Diagnostics) -> Verdict {
        self.dependencies = None;
        self.optional.clear();
        let Some(project) = project(document) else {
            return Verdict::Clean;
        };

        if let Some(value) = project.get("dependencies") {
            self.dependencies = Self::check_list("dependencies", &strings(value), diagnostics);
        }
        if let Some(groups) = project
            .get("optional-dependencies")
            .and_then(Value::as_table)
        {
            for (group, value) in groups {
                let prefix = format!("optional `{group}` dependencies");
                if let Some(fixed) = Self::check_list(&prefix, &strings(value), diagnostics) {
                    self.optional.push((group.clone(), fixed));
                }
            }
        }

        if diagnostics.has_errors() {
            Verdict::Unfixable
        } else if diagnostics.is_empty() {
            Verdict::Clean
        } else {
            Verdict::Fixable
        }
    }

    fn fix(&self, document: &mut Table) {
        let Some(project) = project_mut(document) else {
            return;
        };
        let to_array =
            |list: &[String]| Value::Array(list.iter().cloned().map(Value::String).collect());
        if let Some(dependencies) = &self.dependencies {
            project.insert("dependencies".to_owned(), to_array(dependencies));
        }
        if let Some(groups) = project
            .get_mut("optional-dependencies")
            .and_then(Value::as_table_mut)
        {
            for (group, dependencies) in &self.optional {
                groups.insert(group.clone(), to_array(dependencies));
            }
        }
    }
}
