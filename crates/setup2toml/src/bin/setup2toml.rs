use std::process::ExitCode;

use setup2toml::main as setup2toml_main;

fn main() -> ExitCode {
    setup2toml_main(std::env::args_os())
}
