use crate::common::TestContext;
use crate::setup2toml_snapshot;

const UNORDERED: &str = "\
[options]
packages=find:
zip_safe = False

[metadata]
version = 1.0
author-email = jane@example.com
name = demo
";

#[test]
fn normalizes_in_place() {
    let context = TestContext::new();
    context.write("setup.cfg", UNORDERED);

    setup2toml_snapshot!(context.filters(), context.command().args(["format-cfg", "setup.cfg"]), @r"
    success: true
    exit_code: 0
    ----- stdout -----

    ----- stderr -----
    format-cfg: Wrote setup.cfg
    ");

    insta::assert_snapshot!(context.read("setup.cfg"), @r"
    [metadata]
    name = demo
    version = 1.0
    author_email = jane@example.com

    [options]
    zip_safe = False
    packages = find:
    ");
}

#[test]
fn check_reports_without_writing() {
    let context = TestContext::new();
    context.write("setup.cfg", UNORDERED);

    setup2toml_snapshot!(context.filters(), context.command().args(["format-cfg", "setup.cfg", "--check"]), @r"
    success: false
    exit_code: 1
    ----- stdout -----

    ----- stderr -----
    format-cfg: Would reformat setup.cfg
    ");
    assert_eq!(context.read("setup.cfg"), UNORDERED);

    let output = context
        .command()
        .args(["format-cfg", "setup.cfg"])
        .output()
        .expect("Failed to execute setup2toml");
    assert_eq!(output.status.code(), Some(0));

    let output = context
        .command()
        .args(["format-cfg", "setup.cfg", "--check"])
        .output()
        .expect("Failed to execute setup2toml");
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn invalid_ini_is_an_error() {
    let context = TestContext::new();
    context.write("setup.cfg", "name = demo\n");

    let output = context
        .command()
        .args(["format-cfg", "setup.cfg"])
        .output()
        .expect("Failed to execute setup2toml");
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr.contains("error: failed to format `setup.cfg`"), "{stderr}");
    assert_eq!(context.read("setup.cfg"), "name = demo\n");
}
