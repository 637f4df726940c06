//! Incremental state reconstruction.

use snort_core::apply_diffs;

use crate::error::ReplayError;
use crate::reader::ReplayFile;

/// Walks a [`ReplayFile`] forward, keeping one buffer per region.
///
/// Seeking forward applies only the instructions in between. Seeking
/// backward starts over from zeroed buffers.
#[derive(Clone, Debug)]
pub struct StateCursor<'a> {
    file: &'a ReplayFile,
    buffers: Vec<Vec<u8>>,
    position: Option<u64>,
}

impl<'a> StateCursor<'a> {
    /// A cursor before the first instruction: every region zeroed.
    pub fn new(file: &'a ReplayFile) -> Result<Self, ReplayError> {
        Ok(Self {
            file,
            buffers: file.registry().zeroed_buffers()?,
            position: None,
        })
    }

    /// Index of the last applied instruction, or `None` before the first.
    pub fn position(&self) -> Option<u64> {
        self.position
    }

    /// Return to the zeroed state.
    pub fn reset(&mut self) {
        for buffer in &mut self.buffers {
            buffer.fill(0);
        }
        self.position = None;
    }

    /// Move to the state after `instruction` has executed.
    pub fn seek(&mut self, instruction: u64) -> Result<(), ReplayError> {
        let count = self.file.instruction_count();
        if instruction >= count {
            return Err(ReplayError::OutOfRange {
                what: "instruction",
                index: instruction,
                len: count,
            });
        }
        if self.position.is_some_and(|p| p > instruction) {
            self.reset();
        }
        let start = self.position.map_or(0, |p| p + 1);
        for k in start..=instruction {
            self.apply(k)?;
        }
        Ok(())
    }

    /// Apply the next instruction and return its index.
    pub fn step_forward(&mut self) -> Result<u64, ReplayError> {
        let next = self.position.map_or(0, |p| p + 1);
        self.seek(next)?;
        Ok(next)
    }

    /// Current contents of `region`.
    pub fn region(&self, region: usize) -> Result<&[u8], ReplayError> {
        self.buffers
            .get(region)
            .map(Vec::as_slice)
            .ok_or(ReplayError::OutOfRange {
                what: "region",
                index: region as u64,
                len: self.buffers.len() as u64,
            })
    }

    /// Current contents of every region.
    pub fn regions(&self) -> &[Vec<u8>] {
        &self.buffers
    }

    /// Take the region buffers.
    pub fn into_regions(self) -> Vec<Vec<u8>> {
        self.buffers
    }

    fn apply(&mut self, instruction: u64) -> Result<(), ReplayError> {
        let record = self.file.instruction(instruction)?;
        for (buffer, diffs) in self.buffers.iter_mut().zip(record.regions()) {
            apply_diffs(buffer, diffs)?;
        }
        self.position = Some(instruction);
        Ok(())
    }
}
