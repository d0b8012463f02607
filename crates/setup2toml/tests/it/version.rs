use crate::common::setup2toml_command;

#[test]
fn version_flag_shows_version() {
    let mut cmd = setup2toml_command();
    cmd.arg("--version");

    let output = cmd.output().expect("Failed to execute setup2toml");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(
        stdout.starts_with("setup2toml "),
        "Expected version string starting with 'setup2toml ', got: {stdout}"
    );
}

#[test]
fn short_version_flag_works() {
    let mut cmd = setup2toml_command();
    cmd.arg("-V");

    let output = cmd.output().expect("Failed to execute setup2toml");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.starts_with("setup2toml "));
}
