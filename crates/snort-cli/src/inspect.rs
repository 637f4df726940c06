//! `snort-inspect`: text dump of a replay file.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use snort_core::ByteDiff;
use snort_replay::ReplayFile;

/// Print the header, region table and per-instruction diffs of a replay file.
#[derive(Debug, Parser)]
#[command(name = "snort-inspect", version, about, long_about = None)]
pub struct InspectArgs {
    /// Replay file to inspect.
    pub replay: PathBuf,
    /// Only show this instruction (relative to the recording start).
    #[arg(short, long)]
    pub instruction: Option<u64>,
    /// Print diff payloads as hex.
    #[arg(long)]
    pub diffs: bool,
    /// Enable debug logging (overridden by RUST_LOG).
    #[arg(short, long)]
    pub verbose: bool,
}

/// Open the file named in `args` and write the dump to `out`.
pub fn run(args: &InspectArgs, out: &mut dyn Write) -> Result<()> {
    let file = ReplayFile::open(&args.replay)
        .with_context(|| format!("failed to open replay {}", args.replay.display()))?;
    dump(&file, args.instruction, args.diffs, out)
}

/// Write a dump of `file`, optionally limited to one instruction.
pub fn dump(
    file: &ReplayFile,
    instruction: Option<u64>,
    payloads: bool,
    out: &mut dyn Write,
) -> Result<()> {
    writeln!(out, "instruction offset: {}", file.instruction_offset())?;
    writeln!(out, "instruction count:  {}", file.instruction_count())?;
    writeln!(out, "regions:            {}", file.region_count())?;
    for (index, region) in file.registry().iter().enumerate() {
        writeln!(
            out,
            "  [{index}] {:<24} {:<6} x{:<8} stride {:<4} {} bytes",
            region.label,
            region.data_type.to_string(),
            region.element_count,
            region.element_display_row_stride,
            region.byte_count()
        )?;
    }

    let range = match instruction {
        Some(i) => {
            ensure!(
                i < file.instruction_count(),
                "instruction {i} out of range (count {})",
                file.instruction_count()
            );
            i..i + 1
        }
        None => 0..file.instruction_count(),
    };

    for i in range {
        let record = file.instruction(i)?;
        let absolute = match file.absolute_instruction(i) {
            Some(abs) => abs.to_string(),
            None => "overflow".to_string(),
        };
        writeln!(
            out,
            "instruction {i} (absolute {absolute}): {} bytes",
            record.payload_bytes()
        )?;
        for (region, diffs) in record.regions().enumerate() {
            if diffs.is_empty() {
                continue;
            }
            let label = &file.region_descriptor(region)?.label;
            writeln!(out, "  {label}: {} diffs", diffs.len())?;
            if payloads {
                for diff in diffs {
                    writeln!(out, "    {}", format_diff(diff))?;
                }
            }
        }
    }
    Ok(())
}

fn format_diff(diff: &ByteDiff) -> String {
    let hex: Vec<String> = diff.data.iter().map(|b| format!("{b:02x}")).collect();
    format!("+{:#06x} [{}] {}", diff.byte_offset, diff.byte_count(), hex.join(" "))
}
