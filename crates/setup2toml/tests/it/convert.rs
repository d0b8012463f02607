use toml::Table;

use crate::common::TestContext;
use crate::setup2toml_snapshot;

const SETUP_CFG: &str = "\
[metadata]
name = demo
version = 1.0
description = Demo

[options]
install_requires =
    requests
    attrs
python_requires = >=3.9
";

fn demo_project() -> TestContext {
    let context = TestContext::new();
    context.copy_fixture("demo/setup.py", "setup.py");
    context.copy_fixture("demo/README.md", "README.md");
    context
}

#[test]
fn setup_script_runs_every_step() {
    let context = demo_project();

    let output = context
        .command()
        .arg("setup.py")
        .output()
        .expect("Failed to execute setup2toml");
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(0), "{stderr}");
    let steps: Vec<&str> = stderr
        .lines()
        .filter(|line| !line.starts_with("warning"))
        .collect();
    assert_eq!(
        steps,
        [
            "setup-to-cfg: Wrote setup.cfg",
            "format-cfg: setup.cfg is unchanged",
            "cfg-to-toml: Wrote pyproject.toml",
            "format-toml: pyproject.toml is unchanged",
        ]
    );
    assert!(stderr.contains("warning: naming: should be demo-tool"), "{stderr}");

    let setup_cfg = context.read("setup.cfg");
    assert!(setup_cfg.starts_with("[metadata]\nname = Demo_Tool\nversion = 0.3.1\n"));
    assert!(setup_cfg.contains("long_description = file: README.md\n"));
    assert!(setup_cfg.contains("packages = find:\n"));
    assert!(setup_cfg.contains("[options.packages.find]\nexclude = tests, tests.*\n"));
    assert!(setup_cfg.contains("console_scripts =\n    demo = demo.cli:main\n"));

    let pyproject: Table = context.read("pyproject.toml").parse().unwrap();
    let project = pyproject["project"].as_table().unwrap();
    assert_eq!(project["name"].as_str(), Some("Demo_Tool"));
    assert_eq!(project["version"].as_str(), Some("0.3.1"));
    assert_eq!(project["requires-python"].as_str(), Some(">=3.8"));
    assert_eq!(project["readme"]["file"].as_str(), Some("README.md"));
    assert_eq!(project["readme"]["content-type"].as_str(), Some("text/markdown"));
    assert_eq!(project["license"]["text"].as_str(), Some("MIT"));
    assert_eq!(project["authors"][0]["email"].as_str(), Some("jane@example.com"));
    assert_eq!(project["urls"]["Homepage"].as_str(), Some("https://example.com/demo"));
    assert_eq!(project["scripts"]["demo"].as_str(), Some("demo.cli:main"));
    assert_eq!(
        project["dependencies"].as_array().unwrap().len(),
        2,
        "{project:?}"
    );
    assert_eq!(
        pyproject["tool"]["setuptools"]["zip-safe"].as_bool(),
        Some(false)
    );
    assert!(
        pyproject["tool"]["setuptools"]["packages"]["find"]["exclude"]
            .as_array()
            .is_some_and(|exclude| exclude.len() == 2)
    );
}

#[test]
fn fix_normalizes_and_sorts() {
    let context = demo_project();

    let output = context
        .command()
        .args(["setup.py", "--fix"])
        .output()
        .expect("Failed to execute setup2toml");
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(0), "{stderr}");
    assert!(stderr.contains("format-toml: Wrote pyproject.toml"), "{stderr}");

    let pyproject = context.read("pyproject.toml");
    assert!(pyproject.contains("name = \"demo-tool\"\n"), "{pyproject}");
    assert!(
        pyproject.contains("dependencies = [\n    \"click>=8.0\",\n    \"requests>=2.25\",\n]\n"),
        "{pyproject}"
    );
    assert!(
        pyproject.contains("dev = [\n    \"black\",\n    \"pytest\",\n]\n"),
        "{pyproject}"
    );

    // A second run has nothing left to fix.
    let output = context
        .command()
        .args(["convert", "pyproject.toml", "--fix"])
        .output()
        .expect("Failed to execute setup2toml");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stderr.trim(), "format-toml: pyproject.toml is unchanged");
}

#[test]
fn fix_from_environment() {
    let context = TestContext::new();
    context.write("setup.cfg", SETUP_CFG);

    let output = context
        .command()
        .args(["convert", "setup.cfg"])
        .env("SETUP2TOML_FIX", "true")
        .output()
        .expect("Failed to execute setup2toml");

    assert_eq!(output.status.code(), Some(0));
    assert!(
        context
            .read("pyproject.toml")
            .contains("dependencies = [\n    \"attrs\",\n    \"requests\",\n]\n")
    );
}

#[test]
fn setup_cfg_input() {
    let context = TestContext::new();
    context.write("setup.cfg", SETUP_CFG);

    setup2toml_snapshot!(context.filters(), context.command().arg("setup.cfg"), @r"
    success: true
    exit_code: 0
    ----- stdout -----

    ----- stderr -----
    format-cfg: setup.cfg is unchanged
    cfg-to-toml: Wrote pyproject.toml
    warning: dependencies: dependencies are not sorted; corrected order: attrs, requests
    format-toml: pyproject.toml is unchanged
    ");

    insta::assert_snapshot!(context.read("pyproject.toml"), @r#"
    [build-system]
    requires = ["setuptools>=61.2"]
    build-backend = "setuptools.build_meta"

    [project]
    name = "demo"
    version = "1.0"
    description = "Demo"
    requires-python = ">=3.9"
    dependencies = [
        "requests",
        "attrs",
    ]
    "#);
}

#[test]
fn existing_tool_tables_are_kept() {
    let context = TestContext::new();
    context.write("setup.cfg", SETUP_CFG);
    context.write(
        "pyproject.toml",
        "[tool.black]\nline-length = 88\n\n[project]\nname = \"old\"\n",
    );

    let output = context
        .command()
        .arg("setup.cfg")
        .output()
        .expect("Failed to execute setup2toml");
    assert_eq!(output.status.code(), Some(0));

    let pyproject: Table = context.read("pyproject.toml").parse().unwrap();
    assert_eq!(pyproject["project"]["name"].as_str(), Some("demo"));
    assert_eq!(pyproject["tool"]["black"]["line-length"].as_integer(), Some(88));
}

#[test]
fn validation_errors_fail() {
    let context = TestContext::new();
    context.write(
        "pyproject.toml",
        "[build-system]\nrequires = [\"setuptools\"]\nbuild-backend = \"setuptools.build_meta\"\n\n[project]\nname = \"demo\"\nversion = 1\n",
    );

    setup2toml_snapshot!(context.filters(), context.command().arg("pyproject.toml"), @r"
    success: false
    exit_code: 1
    ----- stdout -----

    ----- stderr -----
    error: specs: `project.version` must be a string
    format-toml: pyproject.toml is unchanged
    Some problems may be fixable with `--fix`.
    ");
}

#[test]
fn missing_input() {
    let context = TestContext::new();

    setup2toml_snapshot!(context.filters(), context.command().arg("setup.py"), @r"
    success: false
    exit_code: 2
    ----- stdout -----

    ----- stderr -----
    error: failed to convert `setup.py`
      Caused by: unsupported input `setup.py`: no such file
    ");
}

#[test]
fn script_without_setup_call() {
    let context = TestContext::new();
    context.write("build.py", "print('hello')\n");

    let output = context
        .command()
        .arg("build.py")
        .output()
        .expect("Failed to execute setup2toml");
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr.contains("unsupported input `build.py`"), "{stderr}");
    assert!(!context.path().join("setup.cfg").exists());
}

#[test]
fn malformed_toml_is_not_rewritten() {
    let context = TestContext::new();
    context.write("pyproject.toml", "[project\nname = 1\n");

    let output = context
        .command()
        .arg("pyproject.toml")
        .output()
        .expect("Failed to execute setup2toml");
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr.contains("failed to parse `pyproject.toml`"), "{stderr}");
    assert_eq!(context.read("pyproject.toml"), "[project\nname = 1\n");
}
