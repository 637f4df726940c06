//! Command-line tools for Snort replay files.
//!
//! - `snort-compare` checks that two recordings reconstruct to the same memory
//! - `snort-inspect` prints the header, region table and diffs of one recording
//!
//! Both binaries are thin wrappers; the logic lives here so it can be tested
//! against in-memory output.

#![deny(missing_docs)]
#![forbid(unsafe_code)]

pub mod compare;
pub mod inspect;

use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber on stderr.
///
/// `RUST_LOG` wins when set; otherwise `warn`, or `debug` when `verbose`.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}
