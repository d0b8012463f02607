use crate::common::TestContext;
use crate::setup2toml_snapshot;

const BUILD_SYSTEM: &str = r#"[build-system]
requires = ["setuptools>=61.2"]
build-backend = "setuptools.build_meta"
"#;

const FORMATTED: &str = r#"[build-system]
requires = ["setuptools>=61.2"]
build-backend = "setuptools.build_meta"

[project]
name = "demo"
version = "1.0"
"#;

#[test]
fn discovers_pyproject_in_parent() {
    let context = TestContext::new();
    context.write("pyproject.toml", FORMATTED);
    context.write("src/demo/__init__.py", "");

    let mut command = context.command();
    command
        .arg("format-toml")
        .current_dir(context.path().join("src").join("demo"));
    setup2toml_snapshot!(context.filters(), command, @r"
    success: true
    exit_code: 0
    ----- stdout -----

    ----- stderr -----
    format-toml: [TEMP]/pyproject.toml is unchanged
    ");
}

#[test]
fn explicit_pyproject_from_environment() {
    let context = TestContext::new();
    context.write("pyproject.toml", FORMATTED);

    let output = context
        .command()
        .arg("format-toml")
        .env("SETUP2TOML_PYPROJECT", "missing.toml")
        .output()
        .expect("Failed to execute setup2toml");
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(2));
    assert!(
        stderr.contains("SETUP2TOML_PYPROJECT is set to 'missing.toml' but the file does not exist"),
        "{stderr}"
    );
}

#[test]
fn reorders_tables_and_keys() {
    let context = TestContext::new();
    context.write(
        "pyproject.toml",
        r#"[project]
version = "1.0"
name = "demo"

[build-system]
build-backend = "setuptools.build_meta"
requires = ["setuptools>=61.2"]
"#,
    );

    setup2toml_snapshot!(context.filters(), context.command().args(["format-toml", "pyproject.toml", "--check"]), @r"
    success: false
    exit_code: 1
    ----- stdout -----

    ----- stderr -----
    format-toml: Would reformat pyproject.toml
    ");

    let output = context
        .command()
        .args(["format-toml", "pyproject.toml"])
        .output()
        .expect("Failed to execute setup2toml");
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(context.read("pyproject.toml"), FORMATTED);
}

#[test]
fn fix_corrects_dependencies() {
    let context = TestContext::new();
    context.write(
        "pyproject.toml",
        &format!(
            "{BUILD_SYSTEM}\n[project]\nname = \"demo\"\nversion = \"1.0\"\ndependencies = [\"Requests=2.0\"]\n"
        ),
    );

    setup2toml_snapshot!(context.filters(), context.command().args(["format-toml", "pyproject.toml", "--fix"]), @r"
    success: true
    exit_code: 0
    ----- stdout -----

    ----- stderr -----
    warning: dependencies: dependencies #1 was corrected from `Requests=2.0` to `requests==2.0`
    format-toml: Wrote pyproject.toml
    ");

    insta::assert_snapshot!(context.read("pyproject.toml"), @r#"
    [build-system]
    requires = ["setuptools>=61.2"]
    build-backend = "setuptools.build_meta"

    [project]
    name = "demo"
    version = "1.0"
    dependencies = ["requests==2.0"]
    "#);
}

#[test]
fn unfixable_dependency_fails() {
    let context = TestContext::new();
    let source = format!(
        "{BUILD_SYSTEM}\n[project]\nname = \"demo\"\nversion = \"1.0\"\ndependencies = [\"requests >=\"]\n"
    );
    context.write("pyproject.toml", &source);

    let output = context
        .command()
        .args(["format-toml", "pyproject.toml", "--fix"])
        .output()
        .expect("Failed to execute setup2toml");
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(1));
    assert!(
        stderr.contains("error: dependencies: dependencies #1: `requests >=`"),
        "{stderr}"
    );
    assert_eq!(context.read("pyproject.toml"), source);
}

#[test]
fn missing_tables_are_errors() {
    let context = TestContext::new();
    context.write("pyproject.toml", "[tool.black]\nline-length = 99\n");

    setup2toml_snapshot!(context.filters(), context.command().args(["format-toml", "pyproject.toml"]), @r"
    success: false
    exit_code: 1
    ----- stdout -----

    ----- stderr -----
    error: specs: `build-system.requires` is required
    error: specs: `build-system.build-backend` is required
    error: specs: `project.name` is required
    error: specs: missing field(s): version
    format-toml: pyproject.toml is unchanged
    ");
}
