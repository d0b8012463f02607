use crate::common::TestContext;

const SETUP_CFG: &str = "[metadata]\nname = demo\nversion = 1.0\n";

#[test]
fn quiet_suppresses_progress() {
    let context = TestContext::new();
    context.write("setup.cfg", SETUP_CFG);

    let output = context
        .command()
        .args(["--quiet", "setup.cfg"])
        .output()
        .expect("Failed to execute setup2toml");
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(0));
    assert!(
        stderr.is_empty(),
        "Expected no output with --quiet, got: {stderr}"
    );
    assert!(context.path().join("pyproject.toml").is_file());
}

#[test]
fn quiet_still_prints_errors() {
    let context = TestContext::new();

    let output = context
        .command()
        .args(["-q", "missing.py"])
        .output()
        .expect("Failed to execute setup2toml");
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr.contains("no such file"), "got: {stderr}");
}

#[test]
fn verbose_enables_debug_logs() {
    let context = TestContext::new();
    context.write("setup.cfg", SETUP_CFG);

    let output = context
        .command()
        .args(["--verbose", "setup.cfg"])
        .output()
        .expect("Failed to execute setup2toml");
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(0));
    assert!(
        stderr.contains("DEBUG"),
        "Expected debug logs with --verbose, got: {stderr}"
    );
    assert!(stderr.contains("Running `convert`"));
}

#[test]
fn default_hides_debug_logs() {
    let context = TestContext::new();
    context.write("setup.cfg", SETUP_CFG);

    let output = context
        .command()
        .arg("setup.cfg")
        .output()
        .expect("Failed to execute setup2toml");
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(0));
    assert!(!stderr.contains("DEBUG"), "got: {stderr}");
}
