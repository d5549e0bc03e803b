use std::process::ExitCode;

fn main() -> ExitCode {
    athena_cli::run()
}
