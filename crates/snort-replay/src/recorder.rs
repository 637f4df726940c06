//! Replay recorder.
//!
//! [`ReplayRecorder`] accumulates diff lists in memory and writes the
//! whole file in one pass on [`close`](ReplayRecorder::close). Lists are
//! assigned to regions round-robin: the first call after a boundary
//! starts a new instruction record and feeds region 0, the next feeds
//! region 1, and so on until every region has a list.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use snort_core::{validate_diff_list, ByteDiff, DiffRecord, RegionDescriptor, RegionRegistry};
use tracing::{error, info, warn};

use crate::codec::encode_replay;
use crate::config::RecorderConfig;
use crate::error::ReplayError;
use crate::types::{InstructionRecord, ReplayData};

/// What happened to a recorded diff list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The list was stored; the recorder is still open.
    Recorded,
    /// The list completed an instruction that pushed the recording past
    /// its byte limit. The file has been written and the recorder is closed.
    AutoClosed(RecordingSummary),
}

/// Result of writing a recording to disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordingSummary {
    /// Destination file.
    pub path: PathBuf,
    /// Instruction records written, including a trailing partial one.
    pub instruction_count: u64,
    /// Total diff payload bytes.
    pub recorded_bytes: u64,
    /// Whether the last record was missing regions.
    pub incomplete: bool,
}

/// Records per-region diff lists and writes them as a replay file.
///
/// # Examples
///
/// ```no_run
/// use snort_core::{DataType, DiffRecord, RegionDescriptor};
/// use snort_replay::{RecorderConfig, ReplayRecorder};
///
/// let regions = vec![RegionDescriptor::new(DataType::U8, 4, 4, "ram")];
/// let mut recorder =
///     ReplayRecorder::open("run.rpl", 0, regions, RecorderConfig::default()).unwrap();
/// recorder
///     .record_instruction(&[DiffRecord::new(0, &[1, 2, 3, 4])])
///     .unwrap();
/// let summary = recorder.close().unwrap();
/// assert_eq!(summary.instruction_count, 1);
/// ```
#[derive(Debug)]
pub struct ReplayRecorder {
    path: PathBuf,
    config: RecorderConfig,
    data: Option<ReplayData>,
    cursor: usize,
    recorded_bytes: u64,
}

impl ReplayRecorder {
    /// Start a recording. Nothing touches the filesystem until close.
    pub fn open(
        path: impl Into<PathBuf>,
        instruction_offset: u64,
        descriptors: impl IntoIterator<Item = RegionDescriptor>,
        config: RecorderConfig,
    ) -> Result<Self, ReplayError> {
        let path = path.into();
        let registry = RegionRegistry::new(descriptors)?;
        info!(
            path = %path.display(),
            instruction = instruction_offset,
            regions = registry.len(),
            "starting replay recording"
        );
        Ok(Self {
            path,
            config,
            data: Some(ReplayData::new(instruction_offset, registry)),
            cursor: 0,
            recorded_bytes: 0,
        })
    }

    /// Destination file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the recorder still accepts diffs.
    pub fn is_open(&self) -> bool {
        self.data.is_some()
    }

    /// Whether the next list starts a new instruction record.
    pub fn is_at_boundary(&self) -> bool {
        self.cursor == 0
    }

    /// Absolute index of the first recorded instruction.
    pub fn instruction_offset(&self) -> Result<u64, ReplayError> {
        Ok(self.data()?.instruction_offset)
    }

    /// Instruction records so far, including one in progress.
    pub fn instruction_count(&self) -> Result<u64, ReplayError> {
        Ok(self.data()?.instruction_count())
    }

    /// Regions per instruction.
    pub fn region_count(&self) -> Result<usize, ReplayError> {
        Ok(self.data()?.region_count())
    }

    /// Region descriptors.
    pub fn registry(&self) -> Result<&RegionRegistry, ReplayError> {
        Ok(&self.data()?.registry)
    }

    /// Diff payload bytes recorded so far.
    pub fn recorded_bytes(&self) -> u64 {
        self.recorded_bytes
    }

    fn data(&self) -> Result<&ReplayData, ReplayError> {
        self.data.as_ref().ok_or(ReplayError::RecorderClosed)
    }

    /// Append the diff list for the next region in round-robin order.
    ///
    /// The payload is copied. A list that fails validation against the
    /// region's size is rejected without advancing the cursor.
    pub fn record_instruction(
        &mut self,
        diffs: &[DiffRecord<'_>],
    ) -> Result<RecordOutcome, ReplayError> {
        let cursor = self.cursor;
        let data = self.data.as_mut().ok_or(ReplayError::RecorderClosed)?;
        let region_count = data.region_count();
        let region_bytes = data.registry.byte_count(cursor).unwrap_or(0);
        validate_diff_list(diffs, region_bytes)?;

        if cursor == 0 {
            data.instructions.push(InstructionRecord::new(region_count));
        }
        let owned: Vec<ByteDiff> = diffs.iter().map(DiffRecord::to_owned_diff).collect();
        let bytes: u64 = owned.iter().map(ByteDiff::byte_count).sum();
        if let Some(record) = data.instructions.last_mut() {
            record.set_region(cursor, owned);
        }
        self.recorded_bytes += bytes;

        self.cursor = (cursor + 1) % region_count;
        if self.cursor == 0 {
            self.finish_instruction()
        } else {
            Ok(RecordOutcome::Recorded)
        }
    }

    /// Append one whole instruction record.
    ///
    /// Requires the cursor at a boundary and exactly one list per region.
    /// Either every list is stored or none is.
    pub fn record_frame(&mut self, frame: Vec<Vec<ByteDiff>>) -> Result<RecordOutcome, ReplayError> {
        let cursor = self.cursor;
        let data = self.data.as_mut().ok_or(ReplayError::RecorderClosed)?;
        let region_count = data.region_count();
        if cursor != 0 {
            return Err(ReplayError::IncompleteInstruction {
                recorded: cursor,
                region_count,
            });
        }
        if frame.len() != region_count {
            return Err(ReplayError::FrameShape {
                expected: region_count,
                actual: frame.len(),
            });
        }
        for (region, diffs) in frame.iter().enumerate() {
            validate_diff_list(diffs, data.registry.byte_count(region).unwrap_or(0))?;
        }

        let record = InstructionRecord::from_regions(frame);
        self.recorded_bytes += record.payload_bytes();
        data.instructions.push(record);
        self.finish_instruction()
    }

    fn finish_instruction(&mut self) -> Result<RecordOutcome, ReplayError> {
        if self.recorded_bytes <= self.config.max_recording_bytes {
            return Ok(RecordOutcome::Recorded);
        }
        if let Some(data) = &self.data {
            let index = data.instruction_count().saturating_sub(1);
            error!(
                path = %self.path.display(),
                instruction = data.instruction_offset + index,
                bytes = self.recorded_bytes,
                limit = self.config.max_recording_bytes,
                "replay recording exceeded its size limit, closing"
            );
        }
        self.flush().map(RecordOutcome::AutoClosed)
    }

    /// Write the recording and close the recorder.
    ///
    /// A partial trailing instruction is written with empty lists for the
    /// missing regions. On failure the in-memory recording is discarded.
    pub fn close(mut self) -> Result<RecordingSummary, ReplayError> {
        self.flush()
    }

    fn flush(&mut self) -> Result<RecordingSummary, ReplayError> {
        let data = self.data.take().ok_or(ReplayError::RecorderClosed)?;
        let incomplete = self.cursor != 0;
        if incomplete {
            warn!(
                path = %self.path.display(),
                recorded = self.cursor,
                regions = data.region_count(),
                "closing replay recording in the middle of an instruction"
            );
        }
        self.cursor = 0;

        let summary = RecordingSummary {
            path: self.path.clone(),
            instruction_count: data.instruction_count(),
            recorded_bytes: self.recorded_bytes,
            incomplete,
        };
        info!(
            path = %summary.path.display(),
            instructions = summary.instruction_count,
            kib = summary.recorded_bytes / 1024,
            "closing replay recording"
        );

        match write_replay_file(&self.path, &data) {
            Ok(()) => Ok(summary),
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "failed to write replay file");
                Err(e)
            }
        }
    }
}

impl Drop for ReplayRecorder {
    fn drop(&mut self) {
        if let Some(data) = &self.data {
            if data.instruction_count() > 0 {
                warn!(
                    path = %self.path.display(),
                    instructions = data.instruction_count(),
                    "replay recorder dropped without close, recording discarded"
                );
            }
        }
    }
}

/// Encode `data` to `path`, replacing any existing file.
///
/// The file is written next to `path` under a `.tmp` name and renamed
/// into place, so a failed write leaves an existing file untouched.
pub fn write_replay_file(path: &Path, data: &ReplayData) -> Result<(), ReplayError> {
    let tmp = tmp_path(path);
    let result = encode_to(&tmp, data).and_then(|()| fs::rename(&tmp, path).map_err(ReplayError::from));
    if result.is_err() {
        // Best effort; the temp file may never have been created.
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn encode_to(path: &Path, data: &ReplayData) -> Result<(), ReplayError> {
    let mut writer = BufWriter::new(File::create(path)?);
    encode_replay(&mut writer, data)?;
    writer.flush()?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
