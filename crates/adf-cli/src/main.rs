#![forbid(unsafe_code)]

use std::io;
use std::process::ExitCode;

use adf_cli::{Cli, DiffOptions, EXIT_FAIL, EXIT_PASS, run};
use adf_diff::{DiffError, FileArraySource};
use clap::Parser;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            // --help and --version are reported through the same path.
            return if err.use_stderr() {
                ExitCode::from(EXIT_FAIL)
            } else {
                ExitCode::from(EXIT_PASS)
            };
        }
    };

    match compare_files(cli) {
        Ok(true) => ExitCode::from(EXIT_PASS),
        Ok(false) => ExitCode::from(EXIT_FAIL),
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(EXIT_FAIL)
        }
    }
}

fn compare_files(cli: Cli) -> Result<bool, DiffError> {
    let options = DiffOptions::try_from(cli)?;
    let verdict = run(&FileArraySource, &options, &mut io::stdout().lock())?;
    Ok(verdict.passed)
}
