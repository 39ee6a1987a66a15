//! Binary entrypoint for the `issue-fixer` service.

use std::process::ExitCode;

fn main() -> ExitCode {
    match issue_fixer::run(std::env::args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
