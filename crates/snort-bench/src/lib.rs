//! Deterministic synthetic workloads for Snort benchmarks.
//!
//! Region layouts mimic a small emulated machine: a register file, a
//! flags region, main RAM and a 1-bit display.

#![forbid(unsafe_code)]
#![allow(missing_docs)]

use snort_core::{compute_diff, full_capture, DataType, RegionDescriptor, RegionRegistry};
use snort_replay::{InstructionRecord, ReplayData};

/// Registers, flags, 4 KiB of RAM and a 64x32 display.
pub fn machine_regions() -> Vec<RegionDescriptor> {
    vec![
        RegionDescriptor::new(DataType::U8, 16, 16, "registers"),
        RegionDescriptor::new(DataType::U16, 4, 0, "flags"),
        RegionDescriptor::new(DataType::U8, 4096, 32, "ram"),
        RegionDescriptor::new(DataType::R1, 64 * 32, 64, "display"),
    ]
}

pub fn machine_registry() -> RegionRegistry {
    RegionRegistry::new(machine_regions()).expect("benchmark regions are valid")
}

/// Produce `frames` successive snapshots of every region in `registry`.
///
/// Each frame writes `writes_per_frame` pseudo-random bytes chosen by a
/// 64-bit LCG seeded with `seed`.
pub fn synthetic_frames(
    registry: &RegionRegistry,
    frames: usize,
    writes_per_frame: usize,
    seed: u64,
) -> Vec<Vec<Vec<u8>>> {
    let mut state = seed;
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        state >> 16
    };

    let mut current = registry
        .zeroed_buffers()
        .expect("benchmark regions fit in memory");
    let mut out = Vec::with_capacity(frames);
    for _ in 0..frames {
        for _ in 0..writes_per_frame {
            let region = (next() % current.len() as u64) as usize;
            let offset = (next() % current[region].len() as u64) as usize;
            current[region][offset] = next() as u8;
        }
        out.push(current.clone());
    }
    out
}

/// Diff successive snapshots into an in-memory recording.
///
/// The first frame is captured in full.
pub fn build_recording(registry: &RegionRegistry, frames: &[Vec<Vec<u8>>]) -> ReplayData {
    let mut data = ReplayData::new(0, registry.clone());
    let mut previous = registry
        .zeroed_buffers()
        .expect("benchmark regions fit in memory");
    for (index, frame) in frames.iter().enumerate() {
        let record = if index == 0 {
            InstructionRecord::from_regions(frame.iter().map(|b| vec![full_capture(b)]))
        } else {
            InstructionRecord::from_regions(
                previous
                    .iter()
                    .zip(frame)
                    .map(|(old, new)| compute_diff(old, new).expect("equal region sizes")),
            )
        };
        data.instructions.push(record);
        previous.clone_from(frame);
    }
    data
}
