//! Replay file reader.
//!
//! [`ReplayFile`] loads an entire recording into memory and validates
//! it up front, so every accessor afterwards is a bounds-checked lookup.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use snort_core::{ByteDiff, RegionDescriptor, RegionRegistry};
use tracing::{debug, warn};

use crate::codec::decode_replay;
use crate::error::ReplayError;
use crate::reconstruct::StateCursor;
use crate::types::{InstructionRecord, ReplayData};

/// A fully loaded, validated replay file.
///
/// Instruction indices are relative to the start of the recording;
/// add [`instruction_offset`](Self::instruction_offset) for the absolute index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplayFile {
    data: ReplayData,
}

impl ReplayFile {
    /// Load and validate a replay file from disk.
    ///
    /// Failures are logged with the path and reason.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let path = path.as_ref();
        let result = File::open(path)
            .map_err(ReplayError::from)
            .and_then(|file| Self::from_reader(BufReader::new(file)));
        match &result {
            Ok(file) => debug!(
                path = %path.display(),
                instructions = file.instruction_count(),
                regions = file.region_count(),
                "loaded replay file"
            ),
            Err(e) => warn!(path = %path.display(), error = %e, "failed to open replay file"),
        }
        result
    }

    /// Decode a replay from any byte source.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, ReplayError> {
        let data = decode_replay(&mut reader)?;
        Ok(Self { data })
    }

    /// Wrap already-decoded data.
    pub fn from_data(data: ReplayData) -> Self {
        Self { data }
    }

    /// Give up the underlying data.
    pub fn into_data(self) -> ReplayData {
        self.data
    }

    /// Absolute index of the first recorded instruction.
    pub fn instruction_offset(&self) -> u64 {
        self.data.instruction_offset
    }

    /// Number of instruction records.
    pub fn instruction_count(&self) -> u64 {
        self.data.instruction_count()
    }

    /// Number of regions per instruction.
    pub fn region_count(&self) -> usize {
        self.data.region_count()
    }

    /// Region descriptors in region order.
    pub fn registry(&self) -> &RegionRegistry {
        &self.data.registry
    }

    /// Descriptor of region `region`.
    pub fn region_descriptor(&self, region: usize) -> Result<&RegionDescriptor, ReplayError> {
        self.data
            .registry
            .get(region)
            .ok_or_else(|| self.region_out_of_range(region))
    }

    /// Absolute index of relative `instruction`, or `None` if it does not
    /// fit in a `u64`.
    pub fn absolute_instruction(&self, instruction: u64) -> Option<u64> {
        self.instruction_offset().checked_add(instruction)
    }

    /// Instruction record `instruction`.
    pub fn instruction(&self, instruction: u64) -> Result<&InstructionRecord, ReplayError> {
        usize::try_from(instruction)
            .ok()
            .and_then(|i| self.data.instructions.get(i))
            .ok_or(ReplayError::OutOfRange {
                what: "instruction",
                index: instruction,
                len: self.instruction_count(),
            })
    }

    /// All instruction records, oldest first.
    pub fn instructions(&self) -> &[InstructionRecord] {
        &self.data.instructions
    }

    /// Diffs recorded for `region` during `instruction`.
    pub fn diffs(&self, instruction: u64, region: usize) -> Result<&[ByteDiff], ReplayError> {
        self.instruction(instruction)?
            .region(region)
            .ok_or_else(|| self.region_out_of_range(region))
    }

    /// Number of diffs recorded for `region` during `instruction`.
    pub fn diff_count(&self, instruction: u64, region: usize) -> Result<usize, ReplayError> {
        Ok(self.diffs(instruction, region)?.len())
    }

    /// Contents of `region` after `instruction` has executed.
    pub fn reconstruct_region(&self, region: usize, instruction: u64) -> Result<Vec<u8>, ReplayError> {
        self.region_descriptor(region)?;
        let mut cursor = self.cursor()?;
        cursor.seek(instruction)?;
        Ok(cursor.region(region)?.to_vec())
    }

    /// Contents of every region after `instruction` has executed.
    pub fn reconstruct(&self, instruction: u64) -> Result<Vec<Vec<u8>>, ReplayError> {
        let mut cursor = self.cursor()?;
        cursor.seek(instruction)?;
        Ok(cursor.into_regions())
    }

    /// A reconstruction cursor positioned before the first instruction.
    ///
    /// Fails if the zeroed region buffers cannot be allocated.
    pub fn cursor(&self) -> Result<StateCursor<'_>, ReplayError> {
        StateCursor::new(self)
    }

    fn region_out_of_range(&self, region: usize) -> ReplayError {
        ReplayError::OutOfRange {
            what: "region",
            index: region as u64,
            len: self.region_count() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_replay;
    use snort_core::{CoreError, DataType};

    fn sample() -> ReplayData {
        let registry = snort_core::RegionRegistry::new(vec![
            RegionDescriptor::new(DataType::U8, 4, 4, "a"),
            RegionDescriptor::new(DataType::U8, 2, 2, "b"),
        ])
        .unwrap();
        let mut data = ReplayData::new(100, registry);
        data.instructions.push(InstructionRecord::from_regions([
            vec![ByteDiff::new(0, vec![1, 2, 3, 4])],
            vec![ByteDiff::new(0, vec![9, 9])],
        ]));
        data.instructions.push(InstructionRecord::from_regions([
            vec![ByteDiff::new(2, vec![7])],
            vec![],
        ]));
        data
    }

    fn file() -> ReplayFile {
        let mut buf = Vec::new();
        encode_replay(&mut buf, &sample()).unwrap();
        ReplayFile::from_reader(buf.as_slice()).unwrap()
    }

    #[test]
    fn accessors() {
        let f = file();
        assert_eq!(f.instruction_offset(), 100);
        assert_eq!(f.instruction_count(), 2);
        assert_eq!(f.region_count(), 2);
        assert_eq!(f.region_descriptor(1).unwrap().label, "b");
        assert_eq!(f.diff_count(1, 0).unwrap(), 1);
        assert_eq!(f.diff_count(1, 1).unwrap(), 0);
        assert_eq!(f.diffs(1, 0).unwrap()[0].data, vec![7]);
    }

    #[test]
    fn out_of_range_indices() {
        let f = file();
        assert!(matches!(
            f.region_descriptor(2),
            Err(ReplayError::OutOfRange { what: "region", index: 2, len: 2 })
        ));
        assert!(matches!(
            f.diffs(2, 0),
            Err(ReplayError::OutOfRange { what: "instruction", index: 2, len: 2 })
        ));
        assert!(matches!(
            f.diff_count(0, 5),
            Err(ReplayError::OutOfRange { what: "region", .. })
        ));
        assert!(f.reconstruct_region(0, 2).is_err());
        assert!(f.reconstruct_region(3, 0).is_err());
    }

    #[test]
    fn reconstruction_folds_forward() {
        let f = file();
        assert_eq!(f.reconstruct_region(0, 0).unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(f.reconstruct_region(0, 1).unwrap(), vec![1, 2, 7, 4]);
        assert_eq!(f.reconstruct(1).unwrap(), vec![vec![1, 2, 7, 4], vec![9, 9]]);
    }

    #[test]
    fn absolute_index_near_u64_max() {
        let mut data = sample();
        data.instruction_offset = u64::MAX;
        let f = ReplayFile::from_data(data);
        assert_eq!(f.absolute_instruction(0), Some(u64::MAX));
        assert_eq!(f.absolute_instruction(1), None);
        assert_eq!(file().absolute_instruction(1), Some(101));
    }

    fn oversized_region_bytes() -> Vec<u8> {
        let registry = snort_core::RegionRegistry::new(vec![
            RegionDescriptor::new(DataType::U8, 2, 2, "regs"),
            RegionDescriptor::new(DataType::U8, 1 << 60, 1, "ram"),
        ])
        .unwrap();
        let mut data = ReplayData::new(0, registry);
        data.instructions.push(InstructionRecord::from_regions([
            vec![ByteDiff::new(0, vec![1])],
            vec![],
        ]));
        let mut buf = Vec::new();
        encode_replay(&mut buf, &data).unwrap();
        buf
    }

    #[test]
    fn oversized_region_fails_reconstruction_without_aborting() {
        let f = ReplayFile::from_reader(oversized_region_bytes().as_slice()).unwrap();
        assert_eq!(f.diff_count(0, 0).unwrap(), 1);

        let alloc_failed = |e: ReplayError| {
            matches!(e, ReplayError::Core(CoreError::AllocationFailed { .. }))
        };
        assert!(alloc_failed(f.cursor().unwrap_err()));
        assert!(alloc_failed(f.reconstruct(0).unwrap_err()));
        assert!(alloc_failed(f.reconstruct_region(0, 0).unwrap_err()));
        assert!(alloc_failed(crate::compare::validate_memory(&f, &f).unwrap_err()));
    }

    #[test]
    fn oversized_region_through_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.rpl");
        std::fs::write(&path, oversized_region_bytes()).unwrap();

        let mut fs = crate::fs::ReplayFs::new();
        let replay = fs.replay_open(&path).unwrap();
        assert_eq!(
            fs.replay_reconstruct_region(replay, 0, 0),
            Err(crate::status::ReplayStatus::InvalidArgument)
        );
        assert_eq!(fs.replay_instruction_count(replay), Ok(1));
    }

    #[test]
    fn open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = ReplayFile::open(dir.path().join("nope.rpl")).unwrap_err();
        assert!(matches!(err, ReplayError::Io(_)));
    }
}
