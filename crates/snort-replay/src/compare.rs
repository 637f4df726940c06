//! Cross-file memory validation.
//!
//! Two recordings of the same program over the same instruction window
//! should reconstruct to identical memory after every instruction. The
//! scan walks both files forward in lockstep and stops at the first
//! instruction where any region differs.
//!
//! Fast path: once both files agree up to instruction `k - 1`, identical
//! records at `k` cannot diverge, and a region neither file touched at
//! `k` cannot either. Only the remaining regions are compared byte by byte.

use std::fmt;

use snort_core::RegionMismatch;
use tracing::warn;

use crate::error::ReplayError;
use crate::reader::ReplayFile;

/// Why two replay files cannot be compared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Incompatibility {
    /// The recordings start at different instructions.
    InstructionOffset {
        /// Offset of the left file.
        left: u64,
        /// Offset of the right file.
        right: u64,
    },
    /// The recordings cover a different number of instructions.
    InstructionCount {
        /// Count in the left file.
        left: u64,
        /// Count in the right file.
        right: u64,
    },
    /// The region tables differ.
    Regions(RegionMismatch),
}

impl fmt::Display for Incompatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InstructionOffset { left, right } => {
                write!(f, "instruction offset differs: {left} vs {right}")
            }
            Self::InstructionCount { left, right } => {
                write!(f, "instruction count differs: {left} vs {right}")
            }
            Self::Regions(mismatch) => write!(f, "{mismatch}"),
        }
    }
}

/// The first differing byte of one region at a divergent instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionDivergence {
    /// Region index.
    pub region: usize,
    /// Region label.
    pub label: String,
    /// Offset of the first differing byte.
    pub byte_offset: usize,
    /// Byte in the left file.
    pub left: u8,
    /// Byte in the right file.
    pub right: u8,
    /// Total number of differing bytes in the region.
    pub differing_bytes: usize,
}

/// Every region that differs at the first divergent instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DivergenceReport {
    /// Instruction index relative to the recording start.
    pub instruction: u64,
    /// Absolute instruction index.
    pub absolute_instruction: u64,
    /// Differing regions, in region order.
    pub regions: Vec<RegionDivergence>,
}

/// Check that two files cover the same window over the same regions.
pub fn check_compatible(left: &ReplayFile, right: &ReplayFile) -> Result<(), Incompatibility> {
    let result = compatibility(left, right);
    if let Err(reason) = &result {
        warn!(%reason, "replay files are not comparable");
    }
    result
}

fn compatibility(left: &ReplayFile, right: &ReplayFile) -> Result<(), Incompatibility> {
    if left.instruction_offset() != right.instruction_offset() {
        return Err(Incompatibility::InstructionOffset {
            left: left.instruction_offset(),
            right: right.instruction_offset(),
        });
    }
    if left.instruction_count() != right.instruction_count() {
        return Err(Incompatibility::InstructionCount {
            left: left.instruction_count(),
            right: right.instruction_count(),
        });
    }
    left.registry()
        .check_compatible(right.registry())
        .map_err(Incompatibility::Regions)
}

/// Index of the first instruction after which the reconstructed memory
/// of the two files differs, or `None` if they agree throughout.
pub fn validate_memory(left: &ReplayFile, right: &ReplayFile) -> Result<Option<u64>, ReplayError> {
    Ok(first_divergence(left, right)?.map(|report| report.instruction))
}

/// Like [`validate_memory`], with the differing bytes of every region.
pub fn first_divergence(
    left: &ReplayFile,
    right: &ReplayFile,
) -> Result<Option<DivergenceReport>, ReplayError> {
    check_compatible(left, right)?;

    let mut left_state = left.cursor()?;
    let mut right_state = right.cursor()?;
    for instruction in 0..left.instruction_count() {
        left_state.step_forward()?;
        right_state.step_forward()?;

        let left_record = left.instruction(instruction)?;
        let right_record = right.instruction(instruction)?;
        if instruction > 0 && left_record == right_record {
            continue;
        }

        let mut regions = Vec::new();
        for (region, descriptor) in left.registry().iter().enumerate() {
            let touched = left_record.region(region).is_some_and(|d| !d.is_empty())
                || right_record.region(region).is_some_and(|d| !d.is_empty());
            if instruction > 0 && !touched {
                continue;
            }
            let a = left_state.region(region)?;
            let b = right_state.region(region)?;
            if let Some(divergence) = diff_region(region, &descriptor.label, a, b) {
                regions.push(divergence);
            }
        }

        if !regions.is_empty() {
            let absolute_instruction = left.absolute_instruction(instruction).ok_or_else(|| {
                ReplayError::MalformedFile {
                    detail: format!(
                        "instruction {instruction} past offset {} overflows u64",
                        left.instruction_offset()
                    ),
                }
            })?;
            return Ok(Some(DivergenceReport {
                instruction,
                absolute_instruction,
                regions,
            }));
        }
    }
    Ok(None)
}

fn diff_region(region: usize, label: &str, a: &[u8], b: &[u8]) -> Option<RegionDivergence> {
    let byte_offset = a.iter().zip(b).position(|(x, y)| x != y)?;
    let differing_bytes = a.iter().zip(b).filter(|(x, y)| x != y).count();
    Some(RegionDivergence {
        region,
        label: label.to_string(),
        byte_offset,
        left: a[byte_offset],
        right: b[byte_offset],
        differing_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InstructionRecord, ReplayData};
    use snort_core::{ByteDiff, DataType, RegionDescriptor, RegionRegistry};

    fn registry() -> RegionRegistry {
        RegionRegistry::new(vec![
            RegionDescriptor::new(DataType::U8, 4, 4, "regs"),
            RegionDescriptor::new(DataType::U8, 4, 4, "ram"),
        ])
        .unwrap()
    }

    fn replay(records: Vec<[Vec<ByteDiff>; 2]>) -> ReplayFile {
        let mut data = ReplayData::new(10, registry());
        data.instructions = records
            .into_iter()
            .map(InstructionRecord::from_regions)
            .collect();
        ReplayFile::from_data(data)
    }

    fn baseline() -> Vec<[Vec<ByteDiff>; 2]> {
        vec![
            [vec![ByteDiff::new(0, vec![1, 2, 3, 4])], vec![ByteDiff::new(0, vec![0, 0, 0, 5])]],
            [vec![ByteDiff::new(1, vec![9])], vec![]],
            [vec![], vec![ByteDiff::new(0, vec![6])]],
        ]
    }

    #[test]
    fn identical_files_match() {
        let a = replay(baseline());
        let b = replay(baseline());
        assert_eq!(validate_memory(&a, &b).unwrap(), None);
        assert_eq!(validate_memory(&a, &a).unwrap(), None);
    }

    #[test]
    fn different_diffs_same_state_match() {
        // Writing a byte to the value it already holds shows up as a diff in
        // one recording only; the memory is still equal.
        let a = replay(baseline());
        let mut records = baseline();
        records[1][1] = vec![ByteDiff::new(3, vec![5])];
        let b = replay(records);
        assert_eq!(validate_memory(&a, &b).unwrap(), None);
    }

    #[test]
    fn first_divergence_reported() {
        let a = replay(baseline());
        let mut records = baseline();
        records[2][1] = vec![ByteDiff::new(0, vec![7])];
        let b = replay(records);
        assert_eq!(validate_memory(&a, &b).unwrap(), Some(2));

        let report = first_divergence(&a, &b).unwrap().unwrap();
        assert_eq!(report.absolute_instruction, 12);
        assert_eq!(
            report.regions,
            vec![RegionDivergence {
                region: 1,
                label: "ram".into(),
                byte_offset: 0,
                left: 6,
                right: 7,
                differing_bytes: 1,
            }]
        );
    }

    #[test]
    fn divergence_at_first_instruction() {
        let a = replay(baseline());
        let mut records = baseline();
        records[0][0] = vec![ByteDiff::new(0, vec![1, 2, 3, 0])];
        let b = replay(records);
        assert_eq!(validate_memory(&a, &b).unwrap(), Some(0));
    }

    #[test]
    fn divergence_past_u64_offset_is_malformed() {
        let at_max = |records| {
            let mut data = replay(records).into_data();
            data.instruction_offset = u64::MAX;
            ReplayFile::from_data(data)
        };
        let a = at_max(baseline());
        let mut records = baseline();
        records[1][0] = vec![ByteDiff::new(1, vec![8])];
        let b = at_max(records);
        assert!(matches!(
            first_divergence(&a, &b),
            Err(ReplayError::MalformedFile { .. })
        ));

        let mut records = baseline();
        records[0][1] = vec![];
        let c = at_max(records);
        let report = first_divergence(&a, &c).unwrap().unwrap();
        assert_eq!(report.instruction, 0);
        assert_eq!(report.absolute_instruction, u64::MAX);
    }

    #[test]
    fn empty_recordings_match() {
        let a = replay(vec![]);
        let b = replay(vec![]);
        assert_eq!(validate_memory(&a, &b).unwrap(), None);
    }

    #[test]
    fn incompatible_count_is_an_error() {
        let a = replay(baseline());
        let mut records = baseline();
        records.pop();
        let b = replay(records);
        let err = validate_memory(&a, &b).unwrap_err();
        assert!(matches!(
            err,
            ReplayError::Incompatible(Incompatibility::InstructionCount { left: 3, right: 2 })
        ));
    }

    #[test]
    fn incompatible_offset_and_regions() {
        let a = replay(baseline());
        let mut data = replay(baseline()).into_data();
        data.instruction_offset = 11;
        let b = ReplayFile::from_data(data);
        assert!(matches!(
            check_compatible(&a, &b),
            Err(Incompatibility::InstructionOffset { left: 10, right: 11 })
        ));

        let other = RegionRegistry::new(vec![
            RegionDescriptor::new(DataType::U8, 4, 4, "regs"),
            RegionDescriptor::new(DataType::U8, 4, 2, "ram"),
        ])
        .unwrap();
        let mut data = replay(baseline()).into_data();
        data.registry = other;
        let c = ReplayFile::from_data(data);
        assert!(matches!(
            check_compatible(&a, &c),
            Err(Incompatibility::Regions(RegionMismatch::DisplayStride { index: 1, .. }))
        ));
    }
}
