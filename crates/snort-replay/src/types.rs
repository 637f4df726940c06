//! In-memory model of a replay: header plus per-instruction diff lists.

use smallvec::SmallVec;
use snort_core::{ByteDiff, RegionRegistry};

/// The diffs recorded for one region during one instruction.
pub type RegionDiffs = Vec<ByteDiff>;

/// One instruction's worth of diffs: exactly one list per region, in
/// region order. Lists for regions that did not change are empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InstructionRecord {
    regions: SmallVec<[RegionDiffs; 8]>,
}

impl InstructionRecord {
    /// A record with `region_count` empty diff lists.
    pub fn new(region_count: usize) -> Self {
        Self {
            regions: SmallVec::from_elem(Vec::new(), region_count),
        }
    }

    /// Build a record from complete per-region lists.
    pub fn from_regions(regions: impl IntoIterator<Item = RegionDiffs>) -> Self {
        Self {
            regions: regions.into_iter().collect(),
        }
    }

    /// Number of region slots.
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Diffs for `region`, if the slot exists.
    pub fn region(&self, region: usize) -> Option<&[ByteDiff]> {
        self.regions.get(region).map(Vec::as_slice)
    }

    /// Replace the diff list in slot `region`. Returns false if there is no such slot.
    pub fn set_region(&mut self, region: usize, diffs: RegionDiffs) -> bool {
        match self.regions.get_mut(region) {
            Some(slot) => {
                *slot = diffs;
                true
            }
            None => false,
        }
    }

    /// Iterate the per-region lists in order.
    pub fn regions(&self) -> impl Iterator<Item = &[ByteDiff]> {
        self.regions.iter().map(Vec::as_slice)
    }

    /// Total payload bytes across all regions.
    pub fn payload_bytes(&self) -> u64 {
        self.regions
            .iter()
            .flatten()
            .map(ByteDiff::byte_count)
            .sum()
    }

    /// Whether no region changed.
    pub fn is_unchanged(&self) -> bool {
        self.regions.iter().all(Vec::is_empty)
    }
}

/// Everything a replay file holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplayData {
    /// Absolute index of the first captured instruction.
    pub instruction_offset: u64,
    /// Region descriptors, in region order.
    pub registry: RegionRegistry,
    /// Instruction records, oldest first.
    pub instructions: Vec<InstructionRecord>,
}

impl ReplayData {
    /// An empty recording over `registry`.
    pub fn new(instruction_offset: u64, registry: RegionRegistry) -> Self {
        Self {
            instruction_offset,
            registry,
            instructions: Vec::new(),
        }
    }

    /// Number of instruction records.
    pub fn instruction_count(&self) -> u64 {
        self.instructions.len() as u64
    }

    /// Number of regions per instruction.
    pub fn region_count(&self) -> usize {
        self.registry.len()
    }

    /// Total payload bytes across all instructions.
    pub fn payload_bytes(&self) -> u64 {
        self.instructions
            .iter()
            .map(InstructionRecord::payload_bytes)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_has_empty_slots() {
        let record = InstructionRecord::new(3);
        assert_eq!(record.region_count(), 3);
        assert!(record.is_unchanged());
        assert_eq!(record.region(2), Some(&[][..]));
        assert_eq!(record.region(3), None);
    }

    #[test]
    fn set_region_and_payload_bytes() {
        let mut record = InstructionRecord::new(2);
        assert!(record.set_region(1, vec![ByteDiff::new(0, vec![1, 2, 3])]));
        assert!(!record.set_region(2, vec![]));
        assert_eq!(record.payload_bytes(), 3);
        assert!(!record.is_unchanged());
        assert_eq!(record.region(1).unwrap()[0].byte_count(), 3);
    }
}
