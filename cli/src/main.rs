mod cmd;
mod logging;

use std::process::ExitCode;

use cmd::Outcome;

fn main() -> ExitCode {
    match cmd::run() {
        Ok(Outcome::Exec(invocation)) => {
            let error = invocation.exec();
            eprintln!("hssh: {error:#}");
            ExitCode::FAILURE
        }
        Ok(Outcome::Fail(error)) => {
            eprintln!("hssh: {error}");
            ExitCode::from(u8::try_from(error.exit_code()).unwrap_or(1))
        }
        Err(error) => {
            eprintln!("hssh: {error:#}");
            ExitCode::FAILURE
        }
    }
}
