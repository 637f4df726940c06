//! Compare the reconstructed memory of two Snort replay files.
//!
//! Exit status: 0 when every instruction matches, 1 on the first
//! mismatch, 2 when a file cannot be opened or the files are incompatible.

use std::process::ExitCode;

use clap::Parser;
use snort_cli::compare::{run, CompareArgs};

fn main() -> ExitCode {
    let args = CompareArgs::parse();
    snort_cli::init_tracing(args.verbose);

    let mut stdout = std::io::stdout().lock();
    match run(&args, &mut stdout) {
        Ok(verdict) => verdict.exit_code(),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
