//! The conversion pipeline: detect the input format and run each step.
//!
//! ```text
//! .toml       -> format-toml
//! .cfg / .ini -> format-cfg -> cfg-to-toml -> format-toml
//! otherwise   -> setup-to-cfg -> format-cfg -> cfg-to-toml -> format-toml
//! ```
//!
//! Every step parses its input completely before writing anything, so a
//! malformed input never overwrites an existing file.

use std::fmt;
use std::path::{Path, PathBuf};

use toml::{Table, Value};
use tracing::{debug, info};

use crate::cfg::{self, SetupCfg};
use crate::diagnostics::Diagnostics;
use crate::pyproject;
use crate::setup_py;

/// Lists longer than this many characters are written one item per line.
pub const DEFAULT_LIST_THRESHOLD: usize = 100;

const SETUP_CFG: &str = "setup.cfg";
const PYPROJECT_TOML: &str = "pyproject.toml";

/// The kind of file the pipeline starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Toml,
    Cfg,
    /// Anything else is read as a Python setup script.
    SetupScript,
}

impl InputFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            Some(ext) if ext.eq_ignore_ascii_case("cfg") || ext.eq_ignore_ascii_case("ini") => {
                Self::Cfg
            }
            _ => Self::SetupScript,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Cfg(#[from] cfg::ParseError),
    #[error(transparent)]
    Python(#[from] setup_py::SyntaxError),
    #[error("file is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to parse `{}`", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
    #[error("unsupported input `{}`: {reason}", path.display())]
    UnsupportedInput { path: PathBuf, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    fn parse(path: &Path, source: impl Into<ParseError>) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            source: source.into(),
        }
    }

    fn unsupported(path: &Path, reason: impl Into<String>) -> Self {
        Self::UnsupportedInput {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// Apply fixable validation findings.
    pub fix: bool,
    pub list_threshold: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            fix: false,
            list_threshold: DEFAULT_LIST_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    SetupToCfg,
    FormatCfg,
    CfgToToml,
    FormatToml,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetupToCfg => f.write_str("setup-to-cfg"),
            Self::FormatCfg => f.write_str("format-cfg"),
            Self::CfgToToml => f.write_str("cfg-to-toml"),
            Self::FormatToml => f.write_str("format-toml"),
        }
    }
}

/// What a single step did.
#[derive(Debug)]
pub struct StepReport {
    pub step: Step,
    /// The file the step wrote, or would have written.
    pub path: PathBuf,
    /// Whether the output differs from what was on disk.
    pub changed: bool,
    pub diagnostics: Diagnostics,
}

impl StepReport {
    fn new(step: Step, path: &Path, changed: bool, diagnostics: Diagnostics) -> Self {
        debug!(
            "Step {step} on {}: changed={changed}, {} error(s), {} warning(s)",
            path.display(),
            diagnostics.errors().len(),
            diagnostics.warnings().len()
        );
        Self {
            step,
            path: path.to_path_buf(),
            changed,
            diagnostics,
        }
    }
}

/// The steps of a full run, in order.
#[derive(Debug, Default)]
pub struct Report {
    pub steps: Vec<StepReport>,
}

impl Report {
    /// Whether any step left errors behind.
    pub fn has_errors(&self) -> bool {
        self.steps.iter().any(|step| step.diagnostics.has_errors())
    }

    /// The `pyproject.toml` the run ended with.
    pub fn output(&self) -> Option<&Path> {
        self.steps.last().map(|step| step.path.as_path())
    }
}

/// Run the full pipeline on `path`.
pub fn convert(path: &Path, options: Options) -> Result<Report, Error> {
    if !path.is_file() {
        let reason = if path.exists() {
            "not a regular file"
        } else {
            "no such file"
        };
        return Err(Error::unsupported(path, reason));
    }

    let format = InputFormat::from_path(path);
    info!("Converting {} as {format:?}", path.display());
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    let pyproject = dir.join(PYPROJECT_TOML);

    let mut report = Report::default();
    match format {
        InputFormat::Toml => {
            report.steps.push(format_toml(path, options.fix, false)?);
        }
        InputFormat::Cfg => {
            report.steps.push(format_cfg(path, false)?);
            report.steps.push(cfg_to_toml(path, &pyproject)?);
            report
                .steps
                .push(format_toml(&pyproject, options.fix, false)?);
        }
        InputFormat::SetupScript => {
            let setup_cfg = dir.join(SETUP_CFG);
            report
                .steps
                .push(setup_to_cfg(path, &setup_cfg, options.list_threshold)?);
            report.steps.push(format_cfg(&setup_cfg, false)?);
            report.steps.push(cfg_to_toml(&setup_cfg, &pyproject)?);
            report
                .steps
                .push(format_toml(&pyproject, options.fix, false)?);
        }
    }
    Ok(report)
}

/// Read `script` statically and write its metadata to `output`, merged into
/// the file already there.
pub fn setup_to_cfg(script: &Path, output: &Path, list_threshold: usize) -> Result<StepReport, Error> {
    let source = read_text(script)?;
    let script_name = script
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("setup.py");
    let base_dir = match script.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let call = match setup_py::read_setup_call(&source, script_name, Some(base_dir)) {
        Ok(call) => call,
        Err(setup_py::Error::Syntax(err)) => return Err(Error::parse(script, err)),
        Err(err @ setup_py::Error::MissingSetupCall) => {
            return Err(Error::unsupported(script, err.to_string()));
        }
    };
    let (mut document, diagnostics) = setup_py::setup_call_to_cfg(&call, Some(base_dir), list_threshold);

    let existing = read_if_exists(output)?;
    if let Some(existing) = &existing {
        debug!("Merging into existing {}", output.display());
        let mut merged: SetupCfg = existing
            .parse()
            .map_err(|err: cfg::ParseError| Error::parse(output, err))?;
        merged.merge(document);
        document = merged;
    }
    document.normalize();

    let rendered = document.to_string();
    let changed = existing.as_deref() != Some(rendered.as_str());
    if changed {
        fs_err::write(output, &rendered)?;
    }
    Ok(StepReport::new(Step::SetupToCfg, output, changed, diagnostics))
}

/// Normalize the INI file at `path`. With `check`, nothing is written.
pub fn format_cfg(path: &Path, check: bool) -> Result<StepReport, Error> {
    let source = read_text(path)?;
    let formatted = cfg::format_cfg(&source).map_err(|err| Error::parse(path, err))?;
    let changed = formatted != source;
    if changed && !check {
        fs_err::write(path, &formatted)?;
    }
    Ok(StepReport::new(Step::FormatCfg, path, changed, Diagnostics::new()))
}

/// Convert the INI file at `cfg_path` and write `output`.
///
/// Tables under `[tool]` of an existing `output` that the conversion does
/// not produce are kept.
pub fn cfg_to_toml(cfg_path: &Path, output: &Path) -> Result<StepReport, Error> {
    let source = read_text(cfg_path)?;
    let document: SetupCfg = source.parse().map_err(|err: cfg::ParseError| Error::parse(cfg_path, err))?;
    let (mut pyproject, diagnostics) = pyproject::cfg_to_pyproject(&document);

    let existing = read_if_exists(output)?;
    if let Some(existing) = &existing {
        let existing: Table = existing
            .parse()
            .map_err(|err: toml::de::Error| Error::parse(output, err))?;
        keep_tool_tables(&mut pyproject, existing);
    }

    let rendered = pyproject::format_document(&pyproject);
    let changed = existing.as_deref() != Some(rendered.as_str());
    if changed {
        fs_err::write(output, &rendered)?;
    }
    Ok(StepReport::new(Step::CfgToToml, output, changed, diagnostics))
}

fn keep_tool_tables(pyproject: &mut Table, mut existing: Table) {
    let Some(Value::Table(existing_tools)) = existing.remove("tool") else {
        return;
    };
    let tools = pyproject
        .entry("tool")
        .or_insert(Value::Table(Table::new()));
    if let Value::Table(tools) = tools {
        for (name, table) in existing_tools {
            if !tools.contains_key(&name) {
                debug!("Keeping existing `[tool.{name}]`");
                tools.insert(name, table);
            }
        }
    }
}

/// Validate and reformat the TOML file at `path`. With `fix`, fixable
/// findings are repaired first; with `check`, nothing is written.
pub fn format_toml(path: &Path, fix: bool, check: bool) -> Result<StepReport, Error> {
    let source = read_text(path)?;
    let mut document: Table = source
        .parse()
        .map_err(|err: toml::de::Error| Error::parse(path, err))?;

    let validation = pyproject::validate(&mut document, fix);
    let formatted = pyproject::format_document(&document);
    let changed = formatted != source;
    if changed && !check {
        fs_err::write(path, &formatted)?;
    }
    Ok(StepReport::new(Step::FormatToml, path, changed, validation.diagnostics))
}

/// Read `path` as UTF-8; other encodings are parse errors.
fn read_text(path: &Path) -> Result<String, Error> {
    let bytes = fs_err::read(path)?;
    String::from_utf8(bytes).map_err(|err| Error::parse(path, err))
}

fn read_if_exists(path: &Path) -> Result<Option<String>, Error> {
    if path.is_file() {
        read_text(path).map(Some)
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn format_from_extension() {
        assert_eq!(InputFormat::from_path(Path::new("pyproject.toml")), InputFormat::Toml);
        assert_eq!(InputFormat::from_path(Path::new("a/Setup.CFG")), InputFormat::Cfg);
        assert_eq!(InputFormat::from_path(Path::new("tox.ini")), InputFormat::Cfg);
        assert_eq!(InputFormat::from_path(Path::new("setup.py")), InputFormat::SetupScript);
        assert_eq!(InputFormat::from_path(Path::new("build")), InputFormat::SetupScript);
    }

    #[test]
    fn setup_script_runs_every_step() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("setup.py");
        fs_err::write(
            &script,
            "from setuptools import setup\nsetup(name='x', version='1.0')\n",
        )
        .unwrap();

        let report = convert(&script, Options::default()).unwrap();
        let steps: Vec<_> = report.steps.iter().map(|step| step.step).collect();
        assert_eq!(
            steps,
            [Step::SetupToCfg, Step::FormatCfg, Step::CfgToToml, Step::FormatToml]
        );
        assert!(!report.has_errors());

        let pyproject: Table = fs_err::read_to_string(dir.path().join("pyproject.toml"))
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(pyproject["project"]["name"].as_str(), Some("x"));
        assert_eq!(pyproject["project"]["version"].as_str(), Some("1.0"));
        assert!(dir.path().join("setup.cfg").is_file());
    }

    #[test]
    fn cfg_input_skips_the_script_step() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("project.ini");
        fs_err::write(&input, "[metadata]\nversion=2\nname=demo\n").unwrap();

        let report = convert(&input, Options::default()).unwrap();
        assert_eq!(report.steps[0].step, Step::FormatCfg);
        assert_eq!(
            fs_err::read_to_string(&input).unwrap(),
            "[metadata]\nname = demo\nversion = 2\n"
        );
        assert!(!dir.path().join("setup.cfg").exists());
        assert_eq!(report.output(), Some(dir.path().join("pyproject.toml").as_path()));
    }

    #[test]
    fn malformed_toml_is_left_alone() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("pyproject.toml");
        fs_err::write(&input, "[project\nname = 1\n").unwrap();

        let err = convert(&input, Options::default()).unwrap_err();
        assert!(matches!(err, Error::Parse { source: ParseError::Toml(_), .. }));
        assert_eq!(fs_err::read_to_string(&input).unwrap(), "[project\nname = 1\n");
    }

    #[test]
    fn script_without_setup_call_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("notes.txt");
        fs_err::write(&script, "print('hello')\n").unwrap();

        let err = convert(&script, Options::default()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedInput { .. }));
    }

    #[test]
    fn invalid_python_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("README.md");
        fs_err::write(&script, "# Title\n\nIt's not Python.\n").unwrap();

        let err = convert(&script, Options::default()).unwrap_err();
        assert!(matches!(err, Error::Parse { source: ParseError::Python(_), .. }));
    }

    #[test]
    fn prose_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("notes.txt");
        fs_err::write(&script, "just some words\n").unwrap();

        let err = convert(&script, Options::default()).unwrap_err();
        assert!(matches!(err, Error::Parse { source: ParseError::Python(_), .. }));
        assert!(!dir.path().join("setup.cfg").exists());
    }

    #[test]
    fn binary_input_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        for name in ["blob.bin", "setup.cfg", "pyproject.toml"] {
            let input = dir.path().join(name);
            fs_err::write(&input, [0xff, 0xfe, 0x00, 0x80]).unwrap();

            let err = convert(&input, Options::default()).unwrap_err();
            assert!(
                matches!(err, Error::Parse { source: ParseError::Encoding(_), .. }),
                "{name}: {err:?}"
            );
        }
    }

    #[test]
    fn missing_input_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let err = convert(&dir.path().join("setup.py"), Options::default()).unwrap_err();
        assert!(err.to_string().contains("no such file"), "{err}");

        let err = convert(dir.path(), Options::default()).unwrap_err();
        assert!(err.to_string().contains("not a regular file"), "{err}");
    }

    #[test]
    fn existing_setup_cfg_is_merged() {
        let dir = TempDir::new().unwrap();
        fs_err::write(
            dir.path().join("setup.cfg"),
            "[metadata]\nname = old\nlicense = MIT\n\n[flake8]\nmax-line-length = 99\n",
        )
        .unwrap();
        let script = dir.path().join("setup.py");
        fs_err::write(&script, "from setuptools import setup\nsetup(name='new')\n").unwrap();

        setup_to_cfg(&script, &dir.path().join("setup.cfg"), DEFAULT_LIST_THRESHOLD).unwrap();
        assert_eq!(
            fs_err::read_to_string(dir.path().join("setup.cfg")).unwrap(),
            "[metadata]\nname = new\nlicense = MIT\n\n[flake8]\nmax-line-length = 99\n"
        );
    }

    #[test]
    fn existing_tool_tables_survive_conversion() {
        let dir = TempDir::new().unwrap();
        let cfg = dir.path().join("setup.cfg");
        fs_err::write(&cfg, "[metadata]\nname = demo\nversion = 1\n").unwrap();
        let pyproject = dir.path().join("pyproject.toml");
        fs_err::write(&pyproject, "[tool.black]\nline-length = 99\n").unwrap();

        cfg_to_toml(&cfg, &pyproject).unwrap();
        let output = fs_err::read_to_string(&pyproject).unwrap();
        assert!(output.contains("[tool.black]\nline-length = 99\n"), "{output}");
        assert!(output.contains("name = \"demo\""), "{output}");
    }

    #[test]
    fn check_does_not_write() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("pyproject.toml");
        let source = "[project]\nversion = \"1\"\nname = \"demo\"\n";
        fs_err::write(&input, source).unwrap();

        let report = format_toml(&input, false, true).unwrap();
        assert!(report.changed);
        assert_eq!(fs_err::read_to_string(&input).unwrap(), source);

        let report = format_toml(&input, false, false).unwrap();
        assert!(report.changed);
        let report = format_toml(&input, false, false).unwrap();
        assert!(!report.changed);
    }
}
