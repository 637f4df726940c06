//! Print the contents of a Snort replay file.

use std::process::ExitCode;

use clap::Parser;
use snort_cli::inspect::{run, InspectArgs};

fn main() -> ExitCode {
    let args = InspectArgs::parse();
    snort_cli::init_tracing(args.verbose);

    let mut stdout = std::io::stdout().lock();
    match run(&args, &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
