//! `snort-compare`: cross-file memory validation.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use snort_replay::{first_divergence, DivergenceReport, ReplayError, ReplayFile};

/// Compare the reconstructed memory of two replay files.
#[derive(Debug, Parser)]
#[command(name = "snort-compare", version, about, long_about = None)]
pub struct CompareArgs {
    /// Reference recording.
    pub replay: PathBuf,
    /// Recording to check against the reference.
    pub comparison: PathBuf,
    /// Print every differing region at the first divergent instruction.
    #[arg(long)]
    pub detail: bool,
    /// Enable debug logging (overridden by RUST_LOG).
    #[arg(short, long)]
    pub verbose: bool,
}

/// Result of a comparison run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Memory matched at every instruction.
    Pass,
    /// Memory first differed after this instruction.
    Fail(u64),
    /// The files do not cover the same window over the same regions.
    Incompatible(String),
}

impl Verdict {
    /// Process exit status: 0 pass, 1 fail, 2 incompatible.
    pub fn exit_status(&self) -> u8 {
        match self {
            Self::Pass => 0,
            Self::Fail(_) => 1,
            Self::Incompatible(_) => 2,
        }
    }

    /// [`exit_status`](Self::exit_status) as an [`ExitCode`].
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }
}

/// Open both files, compare them and print the verdict to `out`.
///
/// Open failures are returned as errors.
pub fn run(args: &CompareArgs, out: &mut dyn Write) -> Result<Verdict> {
    let replay = ReplayFile::open(&args.replay)
        .with_context(|| format!("failed to open replay {}", args.replay.display()))?;
    let comparison = ReplayFile::open(&args.comparison)
        .with_context(|| format!("failed to open comparison {}", args.comparison.display()))?;

    let name = args.replay.display();
    let verdict = match first_divergence(&replay, &comparison) {
        Ok(None) => {
            writeln!(out, "->{name}: PASS")?;
            Verdict::Pass
        }
        Ok(Some(report)) => {
            writeln!(out, "->{name}: FAIL, first invalid frame: {}", report.instruction)?;
            if args.detail {
                write_report(out, &report)?;
            }
            Verdict::Fail(report.instruction)
        }
        Err(ReplayError::Incompatible(reason)) => {
            writeln!(out, "->{name}: INCOMPATIBLE, {reason}")?;
            Verdict::Incompatible(reason.to_string())
        }
        Err(e) => return Err(e).context("comparison failed"),
    };
    Ok(verdict)
}

fn write_report(out: &mut dyn Write, report: &DivergenceReport) -> std::io::Result<()> {
    writeln!(out, "  absolute instruction {}", report.absolute_instruction)?;
    for region in &report.regions {
        writeln!(
            out,
            "  region {} '{}': byte {} is {:#04x} vs {:#04x} ({} bytes differ)",
            region.region,
            region.label,
            region.byte_offset,
            region.left,
            region.right,
            region.differing_bytes
        )?;
    }
    Ok(())
}
