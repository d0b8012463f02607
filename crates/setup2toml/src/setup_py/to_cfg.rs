//! Mapping of `setup()` keywords onto `setup.cfg` sections.

use std::path::Path;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::cfg::SetupCfg;
use crate::diagnostics::Diagnostics;
use crate::setup_py::{FindPackages, PyValue, SetupCall};

#[derive(Debug, Clone, Copy)]
enum Transform {
    Plain,
    /// Text that may be the contents of a file next to the script.
    FindFile,
    ListComma,
    ListSemi,
    /// Always one item per line.
    Lines,
    Mapping,
}

const METADATA_FIELDS: &[(&str, Transform)] = &[
    ("name", Transform::Plain),
    ("version", Transform::Plain),
    ("author", Transform::Plain),
    ("author_email", Transform::Plain),
    ("maintainer", Transform::Plain),
    ("maintainer_email", Transform::Plain),
    ("license", Transform::FindFile),
    ("description", Transform::Plain),
    ("keywords", Transform::ListComma),
    ("url", Transform::Plain),
    ("download_url", Transform::Plain),
    ("long_description", Transform::FindFile),
    ("long_description_content_type", Transform::Plain),
    ("classifiers", Transform::Lines),
    ("platforms", Transform::ListComma),
    ("provides", Transform::ListComma),
    ("requires", Transform::ListComma),
    ("obsoletes", Transform::ListComma),
    ("project_urls", Transform::Mapping),
    ("license_files", Transform::ListComma),
];

const OPTIONS_FIELDS: &[(&str, Transform)] = &[
    ("package_dir", Transform::Mapping),
    ("py_modules", Transform::ListComma),
    ("zip_safe", Transform::Plain),
    ("setup_requires", Transform::ListSemi),
    ("include_package_data", Transform::Plain),
    ("python_requires", Transform::Plain),
    ("use_2to3", Transform::Plain),
    ("use_2to3_fixers", Transform::ListComma),
    ("use_2to3_exclude_fixers", Transform::ListComma),
    ("convert_2to3_doctest", Transform::ListComma),
    ("scripts", Transform::ListComma),
    ("eager_resources", Transform::ListComma),
    ("dependency_links", Transform::ListComma),
    ("test_suite", Transform::Plain),
    ("tests_require", Transform::ListSemi),
    ("namespace_packages", Transform::ListComma),
];

/// Keywords that need more than a single `key = value` entry.
const STRUCTURED_KEYWORDS: &[&str] = &[
    "packages",
    "install_requires",
    "entry_points",
    "extras_require",
    "package_data",
    "exclude_package_data",
    "data_files",
];

/// Convert the keywords of a `setup()` call into a `setup.cfg` document.
///
/// `base_dir` is the script's directory, searched for files whose contents
/// match literal text values. Lists whose joined form is longer than
/// `list_threshold` characters are written one item per line.
pub fn setup_call_to_cfg(
    call: &SetupCall,
    base_dir: Option<&Path>,
    list_threshold: usize,
) -> (SetupCfg, Diagnostics) {
    let mut converter = Converter {
        base_dir,
        list_threshold,
        document: SetupCfg::new(),
        diagnostics: Diagnostics::new(),
    };
    for note in call.notes() {
        converter.diagnostics.warn(note.clone());
    }

    for (section, fields) in [("metadata", METADATA_FIELDS), ("options", OPTIONS_FIELDS)] {
        for (key, transform) in fields {
            let Some(value) = call.get(key) else {
                continue;
            };
            if let Some(text) = converter.convert(key, value, *transform) {
                converter.set(section, key, &text);
            }
        }
    }

    converter.packages(call.get("packages"));
    let conditional = converter.extras_require(call.get("extras_require"));
    converter.install_requires(call.get("install_requires"), conditional);
    converter.entry_points(call.get("entry_points"));
    converter.package_data("package_data", call.get("package_data"));
    converter.package_data("exclude_package_data", call.get("exclude_package_data"));
    converter.data_files(call.get("data_files"));

    for (key, _) in call.keywords() {
        let known = METADATA_FIELDS
            .iter()
            .chain(OPTIONS_FIELDS)
            .any(|(field, _)| *field == key)
            || STRUCTURED_KEYWORDS.contains(&key);
        if !known {
            converter
                .diagnostics
                .warn(format!("`{key}` has no setup.cfg equivalent and was skipped"));
        }
    }

    (converter.document, converter.diagnostics)
}

struct Converter<'a> {
    base_dir: Option<&'a Path>,
    list_threshold: usize,
    document: SetupCfg,
    diagnostics: Diagnostics,
}

impl Converter<'_> {
    fn set(&mut self, section: &str, key: &str, value: &str) {
        if value
            .split('\n')
            .skip(1)
            .any(|line| line.trim_start().starts_with(['#', ';']))
        {
            self.diagnostics.warn(format!(
                "`{key}` has lines starting with `#` or `;`, which setup.cfg reads as comments"
            ));
        }
        trace!("Setting `{key}` in `[{section}]`");
        self.document.set(section, key, value);
    }

    fn skip(&mut self, key: &str, value: &PyValue) {
        match value {
            PyValue::None => debug!("Skipping `{key}=None`"),
            PyValue::Unknown => self.diagnostics.warn(format!(
                "`{key}` could not be evaluated statically and was skipped"
            )),
            _ => self
                .diagnostics
                .warn(format!("`{key}` has an unsupported value and was skipped")),
        }
    }

    fn convert(&mut self, key: &str, value: &PyValue, transform: Transform) -> Option<String> {
        if let PyValue::FileContents { path, .. } = value {
            if !matches!(transform, Transform::Mapping) {
                return Some(format!("file: {path}"));
            }
        }
        match transform {
            Transform::Plain => self.scalar(key, value),
            Transform::FindFile => {
                let text = self.scalar(key, value)?;
                Some(self.find_file(text))
            }
            Transform::ListComma => self.list(key, value).map(|items| self.list_comma(&items)),
            Transform::ListSemi => self
                .requirements(key, value)
                .map(|items| self.list_semi(&items)),
            Transform::Lines => self.list(key, value).map(|items| join_lines(&items)),
            Transform::Mapping => self.mapping(key, value),
        }
    }

    fn scalar(&mut self, key: &str, value: &PyValue) -> Option<String> {
        match value {
            PyValue::Str(text) | PyValue::Number(text) | PyValue::Path(text) => Some(text.clone()),
            PyValue::Bool(flag) => Some(flag.to_string()),
            PyValue::FileContents { path, .. } => Some(format!("file: {path}")),
            _ => {
                self.skip(key, value);
                None
            }
        }
    }

    fn list(&mut self, key: &str, value: &PyValue) -> Option<Vec<String>> {
        match value {
            PyValue::List(items) => {
                let mut strings = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        PyValue::Str(text) | PyValue::Number(text) | PyValue::Path(text) => {
                            strings.push(text.clone());
                        }
                        _ => {
                            self.skip(key, item);
                            return None;
                        }
                    }
                }
                Some(strings)
            }
            PyValue::Str(text) => Some(vec![text.clone()]),
            _ => {
                self.skip(key, value);
                None
            }
        }
    }

    /// A list of requirements, without blank and comment lines.
    fn requirements(&mut self, key: &str, value: &PyValue) -> Option<Vec<String>> {
        let items = self.list(key, value)?;
        Some(
            items
                .iter()
                .map(|item| item.trim())
                .filter(|item| !item.is_empty() && !item.starts_with('#'))
                .map(str::to_owned)
                .collect(),
        )
    }

    fn mapping(&mut self, key: &str, value: &PyValue) -> Option<String> {
        let PyValue::Dict(items) = value else {
            self.skip(key, value);
            return None;
        };
        let mut lines = Vec::with_capacity(items.len());
        for (name, item) in items {
            match (name, item) {
                (PyValue::Str(name), PyValue::Str(item) | PyValue::Path(item)) => {
                    lines.push(format!("{name} = {item}"));
                }
                _ => {
                    self.skip(key, item);
                    return None;
                }
            }
        }
        Some(join_lines(&lines))
    }

    fn list_comma(&self, items: &[String]) -> String {
        let joined = items.join(", ");
        if joined.len() <= self.list_threshold {
            joined
        } else {
            join_lines(items)
        }
    }

    /// Requirements are joined with `; ` only when none carries a marker.
    fn list_semi(&self, items: &[String]) -> String {
        let joined = items.join("; ");
        if items.iter().any(|item| item.contains(';')) || joined.len() > self.list_threshold {
            join_lines(items)
        } else {
            joined
        }
    }

    /// Replace `text` with a `file:` directive if a file next to the script
    /// holds exactly that text.
    fn find_file(&self, text: String) -> String {
        let Some(dir) = self.base_dir else {
            return text;
        };
        let mut files: Vec<_> = match fs_err::read_dir(dir) {
            Ok(entries) => entries
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|path| path.is_file())
                .collect(),
            Err(err) => {
                debug!("Not searching for matching files: {err}");
                return text;
            }
        };
        files.sort();

        for path in files {
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if fs_err::read_to_string(&path).is_ok_and(|contents| contents == text) {
                debug!("Text matches the contents of `{name}`");
                return format!("file: {name}");
            }
        }
        text
    }

    fn packages(&mut self, value: Option<&PyValue>) {
        let Some(value) = value else {
            return;
        };
        let PyValue::FindPackages(FindPackages {
            namespace,
            r#where,
            include,
            exclude,
        }) = value
        else {
            if let Some(text) = self.convert("packages", value, Transform::ListComma) {
                self.set("options", "packages", &text);
            }
            return;
        };

        let directive = if *namespace {
            "find_namespace:"
        } else {
            "find:"
        };
        self.set("options", "packages", directive);
        if let Some(r#where) = r#where {
            self.set("options.packages.find", "where", r#where);
        }
        if !include.is_empty() {
            let text = self.list_comma(include);
            self.set("options.packages.find", "include", &text);
        }
        if !exclude.is_empty() {
            let text = self.list_comma(exclude);
            self.set("options.packages.find", "exclude", &text);
        }
    }

    /// Write `[options.extras_require]` and return the requirements under an
    /// empty extra name (`":python_version < '3'"`), which are unconditional
    /// apart from their marker.
    fn extras_require(&mut self, value: Option<&PyValue>) -> Vec<String> {
        let Some(value) = value else {
            return Vec::new();
        };
        let PyValue::Dict(items) = value else {
            self.skip("extras_require", value);
            return Vec::new();
        };

        let mut conditional = Vec::new();
        let mut extras: IndexMap<String, Vec<String>> = IndexMap::new();
        for (name, requirements) in items {
            let Some(name) = name.as_str() else {
                self.skip("extras_require", name);
                continue;
            };
            let Some(mut requirements) = self.requirements("extras_require", requirements) else {
                continue;
            };
            let extra = match name.split_once(':') {
                Some((extra, marker)) => {
                    for requirement in &mut requirements {
                        *requirement = add_marker(requirement, marker.trim());
                    }
                    extra.trim()
                }
                None => name.trim(),
            };
            if extra.is_empty() {
                conditional.extend(requirements);
            } else {
                extras
                    .entry(extra.to_owned())
                    .or_default()
                    .extend(requirements);
            }
        }

        for (extra, requirements) in extras {
            if !valid_key(&extra) {
                self.diagnostics
                    .warn(format!("extra `{extra}` is not a valid setup.cfg key and was skipped"));
                continue;
            }
            let text = self.list_semi(&requirements);
            self.set("options.extras_require", &extra, &text);
        }
        conditional
    }

    fn install_requires(&mut self, value: Option<&PyValue>, conditional: Vec<String>) {
        if let Some(PyValue::FileContents { path, .. }) = value {
            self.set("options", "install_requires", &format!("file: {path}"));
            if !conditional.is_empty() {
                self.diagnostics.warn(
                    "requirements with only an environment marker in `extras_require` were skipped because `install_requires` is read from a file",
                );
            }
            return;
        }

        let mut requirements = match value {
            Some(value) => match self.requirements("install_requires", value) {
                Some(requirements) => requirements,
                None => return,
            },
            None if conditional.is_empty() => return,
            None => Vec::new(),
        };
        requirements.extend(conditional);
        let text = self.list_semi(&requirements);
        self.set("options", "install_requires", &text);
    }

    fn entry_points(&mut self, value: Option<&PyValue>) {
        let Some(value) = value else {
            return;
        };
        let groups = match value {
            PyValue::Dict(items) => {
                let mut groups = Vec::with_capacity(items.len());
                for (group, entries) in items {
                    let Some(group) = group.as_str() else {
                        self.skip("entry_points", group);
                        continue;
                    };
                    let Some(entries) = self.list("entry_points", entries) else {
                        continue;
                    };
                    groups.push((group.to_owned(), entries));
                }
                groups
            }
            PyValue::Str(text)
            | PyValue::FileContents {
                contents: Some(text),
                ..
            } => match text.parse::<SetupCfg>() {
                Ok(document) => document
                    .sections()
                    .map(|(group, section)| {
                        let entries = section
                            .entries()
                            .map(|(name, entry)| format!("{name} = {}", entry.value().trim()))
                            .collect();
                        (group.to_owned(), entries)
                    })
                    .collect(),
                Err(err) => {
                    self.diagnostics.warn(format!(
                        "`entry_points` is not valid INI text and was skipped: {err}"
                    ));
                    return;
                }
            },
            _ => {
                self.skip("entry_points", value);
                return;
            }
        };

        for (group, entries) in groups {
            let entries: Vec<String> = entries
                .iter()
                .map(|entry| normalize_entry_point(entry))
                .collect();
            self.set("options.entry_points", &group, &join_lines(&entries));
        }
    }

    fn package_data(&mut self, keyword: &str, value: Option<&PyValue>) {
        let Some(value) = value else {
            return;
        };
        let PyValue::Dict(items) = value else {
            self.skip(keyword, value);
            return;
        };
        let section = format!("options.{keyword}");
        for (package, patterns) in items {
            let Some(package) = package.as_str() else {
                self.skip(keyword, package);
                continue;
            };
            let Some(patterns) = self.list(keyword, patterns) else {
                continue;
            };
            let package = if package.is_empty() { "*" } else { package };
            let text = self.list_comma(&patterns);
            self.set(&section, package, &text);
        }
    }

    fn data_files(&mut self, value: Option<&PyValue>) {
        let Some(value) = value else {
            return;
        };
        let PyValue::List(items) = value else {
            self.skip("data_files", value);
            return;
        };
        for item in items {
            let PyValue::List(pair) = item else {
                self.skip("data_files", item);
                continue;
            };
            let [directory, files] = pair.as_slice() else {
                self.skip("data_files", item);
                continue;
            };
            let Some(directory) = directory.as_str() else {
                self.skip("data_files", directory);
                continue;
            };
            if !valid_key(directory) {
                self.diagnostics.warn(format!(
                    "data_files directory `{directory}` is not a valid setup.cfg key and was skipped"
                ));
                continue;
            }
            let Some(files) = self.list("data_files", files) else {
                continue;
            };
            let text = self.list_comma(&files);
            self.set("options.data_files", directory, &text);
        }
    }
}

fn join_lines(items: &[String]) -> String {
    let mut joined = String::new();
    for item in items {
        joined.push('\n');
        joined.push_str(item);
    }
    joined
}

/// Combine `marker` with any marker already on `requirement`.
fn add_marker(requirement: &str, marker: &str) -> String {
    match requirement.split_once(';') {
        Some((base, existing)) => {
            format!("{}; ({}) and ({marker})", base.trim(), existing.trim())
        }
        None => format!("{}; {marker}", requirement.trim()),
    }
}

/// Spell an entry point as `name = object.reference`.
fn normalize_entry_point(entry: &str) -> String {
    match entry.split_once('=') {
        Some((name, reference)) => format!("{} = {}", name.trim(), reference.trim()),
        None => entry.trim().to_owned(),
    }
}

fn valid_key(key: &str) -> bool {
    !key.is_empty() && !key.contains(['=', ':']) && !key.starts_with(['#', ';', '['])
}
