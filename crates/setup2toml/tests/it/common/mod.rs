// The `unreachable_pub` is to silence false positives in RustRover.
#![allow(dead_code, unreachable_pub)]

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

/// Insta snapshot filters shared across setup2toml tests.
pub const INSTA_FILTERS: &[(&str, &str)] = &[
    // Rewrite Windows output to Unix output
    (r"\\([\w\d]|\.)", "/$1"),
    (r"setup2toml\.exe", "setup2toml"),
    // setup2toml version display
    (
        r"setup2toml \d+\.\d+\.\d+(-(alpha|beta|rc)\.\d+)?(\+\d+)?",
        r"setup2toml [VERSION]",
    ),
    // Trim end-of-line whitespaces
    (r"([^\s])[ \t]+(\r?\n)", "$1$2"),
];

/// Returns the setup2toml binary that cargo built before launching the tests.
pub fn get_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_setup2toml"))
}

/// Create a `setup2toml` command for testing.
pub fn setup2toml_command() -> Command {
    let mut command = Command::new(get_bin());
    // Clear environment variables that might interfere with tests.
    command.env_remove("SETUP2TOML_FIX");
    command.env_remove("SETUP2TOML_LIST_THRESHOLD");
    command.env_remove("SETUP2TOML_PYPROJECT");
    command.env_remove("RUST_LOG");
    command
}

/// A scratch project directory that commands run in.
pub struct TestContext {
    pub temp_dir: TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write `contents` to `name` inside the project directory.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            fs_err::create_dir_all(parent).expect("Failed to create parent dir");
        }
        fs_err::write(&path, contents).expect("Failed to write file");
        path
    }

    /// Read `name` from the project directory.
    pub fn read(&self, name: &str) -> String {
        fs_err::read_to_string(self.path().join(name)).expect("Failed to read file")
    }

    /// Copy a file from `tests/fixtures` into the project directory.
    pub fn copy_fixture(&self, fixture: &str, name: &str) -> PathBuf {
        let source = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join(fixture);
        let contents = fs_err::read_to_string(source).expect("Failed to read fixture");
        self.write(name, &contents)
    }

    /// A `setup2toml` command running in the project directory.
    pub fn command(&self) -> Command {
        let mut command = setup2toml_command();
        command.current_dir(self.path());
        command
    }

    /// The shared filters plus one that hides the project directory.
    pub fn filters(&self) -> Vec<(String, String)> {
        let mut filters = Vec::new();
        for path in [
            self.path().to_path_buf(),
            fs_err::canonicalize(self.path()).expect("Failed to canonicalize temp dir"),
        ] {
            filters.push((
                regex::escape(&path.display().to_string()),
                "[TEMP]".to_string(),
            ));
        }
        filters.extend(
            INSTA_FILTERS
                .iter()
                .map(|(pattern, replacement)| ((*pattern).to_string(), (*replacement).to_string())),
        );
        filters
    }
}

/// Create a `setup2toml help` command.
pub fn setup2toml_help() -> Command {
    let mut command = setup2toml_command();
    command.arg("help");
    command
}

/// Snapshot test helper macro. Runs a command and asserts against an insta snapshot.
#[macro_export]
macro_rules! setup2toml_snapshot {
    ($filters:expr, $command:expr, @$expected:literal) => {{
        let output = $command.output().expect("Failed to execute setup2toml");
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        let mut combined = format!(
            "success: {:?}\nexit_code: {}\n----- stdout -----\n{}\n----- stderr -----\n{}",
            output.status.success(),
            output.status.code().unwrap_or(-1),
            stdout.trim(),
            stderr.trim(),
        );

        // Apply filters
        for (pattern, replacement) in $filters.iter() {
            let re = regex::Regex::new(pattern).expect("Invalid filter regex");
            combined = re.replace_all(&combined, replacement.as_str()).to_string();
        }

        insta::assert_snapshot!(combined, @$expected);
    }};
}
