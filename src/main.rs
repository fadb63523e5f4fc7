use conform::errors::print_error;
use std::process::ExitCode;

fn main() -> ExitCode {
    match conform::demo::registry() {
        Ok(registry) => conform::cli::run(&registry),
        Err(e) => {
            print_error(e);
            ExitCode::from(2)
        }
    }
}
