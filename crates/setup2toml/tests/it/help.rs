use crate::common::{setup2toml_command, setup2toml_help};

#[test]
fn help_lists_every_command() {
    let output = setup2toml_help()
        .output()
        .expect("Failed to execute setup2toml");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("Convert setup.py and setup.cfg packaging metadata"));
    for command in [
        "convert",
        "setup-to-cfg",
        "format-cfg",
        "cfg-to-toml",
        "format-toml",
    ] {
        assert!(stdout.contains(command), "Missing `{command}` in: {stdout}");
    }
    assert!(stdout.contains("--list-threshold"));
    assert!(stdout.contains("Use `setup2toml help <command>`"));
}

#[test]
fn help_format_toml() {
    let mut cmd = setup2toml_command();
    cmd.args(["help", "format-toml"]);

    let output = cmd.output().expect("Failed to execute setup2toml");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("Validate and reformat"));
    assert!(stdout.contains("--fix"));
    assert!(stdout.contains("--check"));
}

#[test]
fn unknown_command_errors() {
    let mut cmd = setup2toml_command();
    cmd.args(["setup-to-toml", "setup.py"]);

    let output = cmd.output().expect("Failed to execute setup2toml");

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn no_args_shows_help() {
    let output = setup2toml_command()
        .output()
        .expect("Failed to execute setup2toml");
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(
        stderr.contains("Usage"),
        "Expected usage info in stderr, got: {stderr}"
    );
}
