use std::process::ExitCode;

fn main() -> ExitCode {
    menudex_cli::run()
}
