//! Handle-based facade over recorders and replay files.
//!
//! [`ReplayFs`] owns every open recorder and replay file and hands out
//! `Copy` tokens for them. Operations report failures as
//! [`ReplayStatus`] codes, which suits callers that cannot hold Rust
//! references across calls (scripting bridges, C shims, UI loops).

use std::path::Path;

use snort_core::{ByteDiff, DiffRecord, RegionDescriptor};
use tracing::{debug, warn};

use crate::compare::validate_memory;
use crate::config::RecorderConfig;
use crate::error::ReplayError;
use crate::handle::{HandleTable, RawHandle};
use crate::reader::ReplayFile;
use crate::recorder::{RecordOutcome, ReplayRecorder};
use crate::status::ReplayStatus;

/// Token for an open recorder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RecorderHandle(pub u64);

/// Token for an open replay file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ReplayHandle(pub u64);

fn status_of(e: &ReplayError) -> ReplayStatus {
    let status = ReplayStatus::from(e);
    debug!(?status, error = %e, "replay operation failed");
    status
}

/// Registry of open recorders and replay files.
#[derive(Debug, Default)]
pub struct ReplayFs {
    recorders: HandleTable<ReplayRecorder>,
    replays: HandleTable<ReplayFile>,
    recorder_config: RecorderConfig,
}

impl ReplayFs {
    /// An empty facade using default recorder settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty facade whose recorders use `config`.
    pub fn with_recorder_config(config: RecorderConfig) -> Self {
        Self {
            recorder_config: config,
            ..Self::default()
        }
    }

    // ── Recorders ───────────────────────────────────────────────

    /// Start a recording to `path`.
    pub fn recorder_open(
        &mut self,
        path: impl AsRef<Path>,
        instruction_offset: u64,
        descriptors: &[RegionDescriptor],
    ) -> Result<RecorderHandle, ReplayStatus> {
        let recorder = ReplayRecorder::open(
            path.as_ref(),
            instruction_offset,
            descriptors.iter().cloned(),
            self.recorder_config.clone(),
        )
        .map_err(|e| status_of(&e))?;
        Ok(RecorderHandle(self.recorders.insert(recorder).to_bits()))
    }

    fn recorder_mut(&mut self, handle: RecorderHandle) -> Result<&mut ReplayRecorder, ReplayStatus> {
        let raw = RawHandle::from_bits(handle.0);
        self.recorders.get_mut(raw).ok_or_else(|| {
            warn!(handle = handle.0, "stale or unknown recorder handle");
            ReplayStatus::InvalidHandle
        })
    }

    /// Evicts the recorder if the call closed it, successfully or not.
    fn after_record(
        &mut self,
        handle: RecorderHandle,
        result: Result<RecordOutcome, ReplayError>,
    ) -> ReplayStatus {
        let raw = RawHandle::from_bits(handle.0);
        if !self.recorders.get(raw).is_some_and(ReplayRecorder::is_open) {
            self.recorders.remove(raw);
        }
        match result {
            Ok(_) => ReplayStatus::Ok,
            Err(e) => status_of(&e),
        }
    }

    /// Append the next region's diff list.
    ///
    /// If the list trips the recording's size limit the file is written
    /// and the handle stops resolving, even when that write fails; see
    /// [`recorder_is_open`](Self::recorder_is_open).
    pub fn recorder_record_instruction(
        &mut self,
        handle: RecorderHandle,
        diffs: &[DiffRecord<'_>],
    ) -> ReplayStatus {
        let result = match self.recorder_mut(handle) {
            Ok(recorder) => recorder.record_instruction(diffs),
            Err(status) => return status,
        };
        self.after_record(handle, result)
    }

    /// Append one whole instruction record.
    pub fn recorder_record_frame(
        &mut self,
        handle: RecorderHandle,
        frame: Vec<Vec<ByteDiff>>,
    ) -> ReplayStatus {
        let result = match self.recorder_mut(handle) {
            Ok(recorder) => recorder.record_frame(frame),
            Err(status) => return status,
        };
        self.after_record(handle, result)
    }

    /// Write the recording and invalidate the handle.
    pub fn recorder_close(&mut self, handle: RecorderHandle) -> ReplayStatus {
        match self.recorders.remove(RawHandle::from_bits(handle.0)) {
            Some(recorder) => match recorder.close() {
                Ok(_) => ReplayStatus::Ok,
                Err(e) => status_of(&e),
            },
            None => {
                warn!(handle = handle.0, "close of stale or unknown recorder handle");
                ReplayStatus::InvalidHandle
            }
        }
    }

    /// Whether `handle` still refers to an open recorder.
    pub fn recorder_is_open(&self, handle: RecorderHandle) -> bool {
        self.recorders.contains(RawHandle::from_bits(handle.0))
    }

    /// Close every open recorder, writing their files. Returns the first failure.
    pub fn close_all_recorders(&mut self) -> ReplayStatus {
        let mut status = ReplayStatus::Ok;
        for recorder in self.recorders.drain() {
            if let Err(e) = recorder.close() {
                let failed = status_of(&e);
                if status.is_ok() {
                    status = failed;
                }
            }
        }
        status
    }

    // ── Replay files ────────────────────────────────────────────

    /// Load a replay file.
    pub fn replay_open(&mut self, path: impl AsRef<Path>) -> Result<ReplayHandle, ReplayStatus> {
        let file = ReplayFile::open(path).map_err(|e| status_of(&e))?;
        Ok(ReplayHandle(self.replays.insert(file).to_bits()))
    }

    /// Release a replay file. Closing an already-closed handle is a no-op.
    pub fn replay_close(&mut self, handle: ReplayHandle) -> ReplayStatus {
        if self.replays.remove(RawHandle::from_bits(handle.0)).is_none() {
            debug!(handle = handle.0, "replay handle already closed");
        }
        ReplayStatus::Ok
    }

    /// Whether `handle` refers to an open replay file.
    pub fn replay_is_open(&self, handle: ReplayHandle) -> bool {
        self.replays.contains(RawHandle::from_bits(handle.0))
    }

    /// The replay file behind `handle`.
    pub fn replay(&self, handle: ReplayHandle) -> Result<&ReplayFile, ReplayStatus> {
        self.replays
            .get(RawHandle::from_bits(handle.0))
            .ok_or_else(|| {
                warn!(handle = handle.0, "stale or unknown replay handle");
                ReplayStatus::InvalidHandle
            })
    }

    /// Absolute index of the first recorded instruction.
    pub fn replay_instruction_offset(&self, handle: ReplayHandle) -> Result<u64, ReplayStatus> {
        Ok(self.replay(handle)?.instruction_offset())
    }

    /// Number of instruction records.
    pub fn replay_instruction_count(&self, handle: ReplayHandle) -> Result<u64, ReplayStatus> {
        Ok(self.replay(handle)?.instruction_count())
    }

    /// Number of regions per instruction.
    pub fn replay_region_count(&self, handle: ReplayHandle) -> Result<usize, ReplayStatus> {
        Ok(self.replay(handle)?.region_count())
    }

    /// Descriptor of `region`.
    pub fn replay_region_descriptor(
        &self,
        handle: ReplayHandle,
        region: usize,
    ) -> Result<&RegionDescriptor, ReplayStatus> {
        self.replay(handle)?
            .region_descriptor(region)
            .map_err(|e| status_of(&e))
    }

    /// Number of diffs for `region` at `instruction`.
    pub fn replay_diff_count(
        &self,
        handle: ReplayHandle,
        instruction: u64,
        region: usize,
    ) -> Result<usize, ReplayStatus> {
        self.replay(handle)?
            .diff_count(instruction, region)
            .map_err(|e| status_of(&e))
    }

    /// Diffs for `region` at `instruction`.
    pub fn replay_diffs(
        &self,
        handle: ReplayHandle,
        instruction: u64,
        region: usize,
    ) -> Result<&[ByteDiff], ReplayStatus> {
        self.replay(handle)?
            .diffs(instruction, region)
            .map_err(|e| status_of(&e))
    }

    /// Contents of `region` after `instruction`.
    pub fn replay_reconstruct_region(
        &self,
        handle: ReplayHandle,
        region: usize,
        instruction: u64,
    ) -> Result<Vec<u8>, ReplayStatus> {
        self.replay(handle)?
            .reconstruct_region(region, instruction)
            .map_err(|e| status_of(&e))
    }

    /// First instruction at which the two files' memory differs.
    ///
    /// `Ok(None)` means they agree at every instruction.
    pub fn replay_validate_memory(
        &self,
        left: ReplayHandle,
        right: ReplayHandle,
    ) -> Result<Option<u64>, ReplayStatus> {
        validate_memory(self.replay(left)?, self.replay(right)?).map_err(|e| status_of(&e))
    }
}
