use std::process::ExitCode;

fn main() -> ExitCode {
    match featcheck::featcheck_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = e.exit_code();
            eprintln!("Error: {}", featcheck::SnafuReport::from_error(e));
            ExitCode::from(code)
        }
    }
}
