use std::process::ExitCode;

use cococurate::CurateError;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match cococurate::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            if let CurateError::ExportIncomplete { failures } = &err {
                for failure in failures {
                    eprintln!("  skipped {}", failure);
                }
            }
            ExitCode::FAILURE
        }
    }
}
