//! Shared region layouts, reference recordings and frame generators.

use snort_core::{ByteDiff, DataType, RegionDescriptor, RegionRegistry};

/// Two regions: 8 single-byte registers and 2 sixteen-bit RAM cells.
pub fn two_regions() -> Vec<RegionDescriptor> {
    vec![
        RegionDescriptor::new(DataType::U8, 8, 2, "region-registers"),
        RegionDescriptor::new(DataType::U16, 2, 1, "region-ram"),
    ]
}

pub fn two_region_registry() -> RegionRegistry {
    RegionRegistry::new(two_regions()).expect("fixture regions are valid")
}

/// The reference recording over [`two_regions`], one entry per instruction,
/// one diff list per region.
///
/// - instruction 0: registers `[0..4) = "test"`, ram `[0..4) = "data"`
/// - instruction 1: registers `[2..4) = "he"`, ram `[2..4) = "lo"`
/// - instruction 2: registers `[0..2) = "wo"`, ram `[0..2) = "rl"`
pub fn scenario_frames() -> Vec<Vec<Vec<ByteDiff>>> {
    let d = |offset: u64, bytes: &[u8]| vec![ByteDiff::new(offset, bytes.to_vec())];
    vec![
        vec![d(0, b"test"), d(0, b"data")],
        vec![d(2, b"he"), d(2, b"lo")],
        vec![d(0, b"wo"), d(0, b"rl")],
    ]
}

pub const SCENARIO_FINAL_REGISTERS: [u8; 8] = *b"wohe\0\0\0\0";
pub const SCENARIO_FINAL_RAM: [u8; 4] = *b"rllo";

/// Expected `[registers, ram]` contents after each scenario instruction.
pub fn scenario_region_states() -> Vec<[Vec<u8>; 2]> {
    vec![
        [b"test\0\0\0\0".to_vec(), b"data".to_vec()],
        [b"tehe\0\0\0\0".to_vec(), b"dalo".to_vec()],
        [SCENARIO_FINAL_REGISTERS.to_vec(), SCENARIO_FINAL_RAM.to_vec()],
    ]
}

/// Deterministic stream of region snapshots.
///
/// Each frame rewrites a handful of bytes chosen by a 64-bit LCG, so
/// consecutive frames differ in a few scattered spans.
pub struct FrameGenerator {
    buffers: Vec<Vec<u8>>,
    state: u64,
    writes_per_frame: usize,
}

impl FrameGenerator {
    pub fn new(registry: &RegionRegistry, seed: u64, writes_per_frame: usize) -> Self {
        Self {
            buffers: registry
                .zeroed_buffers()
                .expect("fixture regions fit in memory"),
            state: seed,
            writes_per_frame,
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state >> 16
    }

    /// Advance one frame and return the new contents of every region.
    pub fn next_frame(&mut self) -> &[Vec<u8>] {
        for _ in 0..self.writes_per_frame {
            let region = (self.next_u64() % self.buffers.len() as u64) as usize;
            let len = self.buffers[region].len() as u64;
            let offset = (self.next_u64() % len) as usize;
            let value = self.next_u64() as u8;
            self.buffers[region][offset] = value;
        }
        &self.buffers
    }

    /// Current contents as borrowed slices, in region order.
    pub fn slices(&self) -> Vec<&[u8]> {
        self.buffers.iter().map(Vec::as_slice).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snort_core::apply_diffs;

    #[test]
    fn scenario_states_follow_frames() {
        let registry = two_region_registry();
        let mut buffers = registry.zeroed_buffers().unwrap();
        for (frame, expected) in scenario_frames().iter().zip(scenario_region_states()) {
            for (buffer, diffs) in buffers.iter_mut().zip(frame) {
                apply_diffs(buffer, diffs).unwrap();
            }
            assert_eq!(buffers[0], expected[0]);
            assert_eq!(buffers[1], expected[1]);
        }
    }

    #[test]
    fn generator_is_deterministic() {
        let registry = two_region_registry();
        let mut a = FrameGenerator::new(&registry, 7, 3);
        let mut b = FrameGenerator::new(&registry, 7, 3);
        for _ in 0..10 {
            assert_eq!(a.next_frame(), b.next_frame());
        }
        assert_eq!(a.slices()[0].len(), 8);
        assert_eq!(a.slices()[1].len(), 4);
    }
}
