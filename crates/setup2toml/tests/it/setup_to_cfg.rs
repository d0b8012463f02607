use crate::common::TestContext;
use crate::setup2toml_snapshot;

const SETUP_PY: &str = r#"from setuptools import setup

setup(
    name="demo",
    version="1.0",
    py_modules=["demo"],
    install_requires=["requests"],
    cmdclass={},
)
"#;

#[test]
fn writes_to_output() {
    let context = TestContext::new();
    context.write("setup.py", SETUP_PY);

    setup2toml_snapshot!(
        context.filters(),
        context.command().args(["setup-to-cfg", "setup.py", "-o", "metadata.cfg"]),
        @r"
    success: true
    exit_code: 0
    ----- stdout -----

    ----- stderr -----
    warning: `cmdclass` has no setup.cfg equivalent and was skipped
    setup-to-cfg: Wrote metadata.cfg
    "
    );

    insta::assert_snapshot!(context.read("metadata.cfg"), @r"
    [metadata]
    name = demo
    version = 1.0

    [options]
    install_requires = requests
    py_modules = demo
    ");
    assert!(!context.path().join("setup.cfg").exists());
    assert!(!context.path().join("pyproject.toml").exists());
}

#[test]
fn merges_into_existing_setup_cfg() {
    let context = TestContext::new();
    context.write("setup.py", SETUP_PY);
    context.write(
        "setup.cfg",
        "[bdist_wheel]\nuniversal = 1\n\n[metadata]\nname = old\nlicense = MIT\n",
    );

    let output = context
        .command()
        .args(["setup-to-cfg", "setup.py"])
        .output()
        .expect("Failed to execute setup2toml");
    assert_eq!(output.status.code(), Some(0));

    let setup_cfg = context.read("setup.cfg");
    assert!(
        setup_cfg.starts_with("[metadata]\nname = demo\nversion = 1.0\nlicense = MIT\n"),
        "{setup_cfg}"
    );
    assert!(setup_cfg.ends_with("[bdist_wheel]\nuniversal = 1\n"), "{setup_cfg}");
}

#[test]
fn long_lists_are_split_by_threshold() {
    let context = TestContext::new();
    context.write(
        "setup.py",
        "from setuptools import setup\nsetup(name='demo', install_requires=['requests', 'click'])\n",
    );

    let output = context
        .command()
        .args(["setup-to-cfg", "setup.py", "--list-threshold", "5"])
        .output()
        .expect("Failed to execute setup2toml");
    assert_eq!(output.status.code(), Some(0));
    assert!(
        context
            .read("setup.cfg")
            .contains("install_requires =\n    requests\n    click\n")
    );

    let output = context
        .command()
        .args(["setup-to-cfg", "setup.py"])
        .output()
        .expect("Failed to execute setup2toml");
    assert_eq!(output.status.code(), Some(0));
    assert!(
        context
            .read("setup.cfg")
            .contains("install_requires = requests; click\n")
    );
}
