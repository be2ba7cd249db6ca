mod bootstrap;
mod loop_runner;
mod render;
mod sim;

use std::process::ExitCode;

use tracing::error;

pub(crate) fn run() -> ExitCode {
    let wiring = bootstrap::build_app();
    if let Err(error) = loop_runner::run_app(wiring) {
        error!(error = %error, "startup_failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
