//! Frame capture for emulator cores.
//!
//! A core hands [`FrameCapture::end_frame`] its live region buffers after
//! each instruction. The capture keeps a shadow copy of the previous
//! state, derives forward diffs for an active recording and old-value
//! diffs for a short in-memory rewind history.
//!
//! The first instruction of every recording is captured in full, so a
//! reader starting from zeroed buffers reconstructs the exact state even
//! when the recording begins mid-run.

use std::collections::VecDeque;
use std::path::PathBuf;

use snort_core::{
    apply_diffs, compute_diff, compute_rollback, full_capture, ByteDiff, CoreError,
    RegionRegistry,
};

use crate::config::CaptureConfig;
use crate::error::ReplayError;
use crate::recorder::{RecordOutcome, RecordingSummary, ReplayRecorder};

/// What [`FrameCapture::end_frame`] did with a frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame updated the shadow state; nothing was recording.
    Captured,
    /// The frame was also appended to the active recording.
    Recorded,
    /// The frame was recorded and the recording hit its size limit.
    RecordingAutoClosed(RecordingSummary),
}

/// Tracks region state across instructions and feeds a recorder.
#[derive(Debug)]
pub struct FrameCapture {
    registry: RegionRegistry,
    config: CaptureConfig,
    shadow: Vec<Vec<u8>>,
    history: VecDeque<Vec<Vec<ByteDiff>>>,
    recorder: Option<ReplayRecorder>,
    first_recorded_frame: bool,
    instruction_count: u64,
}

impl FrameCapture {
    /// A capture over `registry` with zeroed shadow buffers.
    pub fn new(registry: RegionRegistry, config: CaptureConfig) -> Result<Self, ReplayError> {
        let shadow = registry.zeroed_buffers()?;
        Ok(Self {
            registry,
            config,
            shadow,
            history: VecDeque::new(),
            recorder: None,
            first_recorded_frame: false,
            instruction_count: 0,
        })
    }

    /// Region descriptors.
    pub fn registry(&self) -> &RegionRegistry {
        &self.registry
    }

    /// Instructions captured so far.
    pub fn instruction_count(&self) -> u64 {
        self.instruction_count
    }

    /// Shadow contents of `region` as of the last frame.
    pub fn region(&self, region: usize) -> Option<&[u8]> {
        self.shadow.get(region).map(Vec::as_slice)
    }

    /// Frames of rewind history currently held.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Whether a recording is active.
    pub fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }

    /// Start recording at the current instruction.
    pub fn start_recording(&mut self, path: impl Into<PathBuf>) -> Result<(), ReplayError> {
        if self.recorder.is_some() {
            return Err(ReplayError::AlreadyRecording);
        }
        let recorder = ReplayRecorder::open(
            path,
            self.instruction_count,
            self.registry.iter().cloned(),
            self.config.recorder.clone(),
        )?;
        self.recorder = Some(recorder);
        self.first_recorded_frame = true;
        Ok(())
    }

    /// Stop and write the active recording. `Ok(None)` if none was active.
    pub fn stop_recording(&mut self) -> Result<Option<RecordingSummary>, ReplayError> {
        match self.recorder.take() {
            Some(recorder) => recorder.close().map(Some),
            None => Ok(None),
        }
    }

    /// Finish one instruction with the live contents of every region.
    ///
    /// On error nothing is updated: the shadow, history, counter and
    /// recording all stay as they were. The one exception is a recording
    /// that hits its size limit and then fails to write: it is dropped,
    /// the frame is still captured, and the write error is returned.
    pub fn end_frame(&mut self, buffers: &[&[u8]]) -> Result<FrameOutcome, ReplayError> {
        if buffers.len() != self.shadow.len() {
            return Err(ReplayError::FrameShape {
                expected: self.shadow.len(),
                actual: buffers.len(),
            });
        }
        for (shadow, live) in self.shadow.iter().zip(buffers) {
            if shadow.len() != live.len() {
                return Err(CoreError::LengthMismatch {
                    expected: shadow.len(),
                    actual: live.len(),
                }
                .into());
            }
        }

        let mut outcome = FrameOutcome::Captured;
        let mut lost = None;
        if let Some(recorder) = self.recorder.as_mut() {
            let frame: Vec<Vec<ByteDiff>> = if self.first_recorded_frame {
                buffers.iter().map(|live| vec![full_capture(live)]).collect()
            } else {
                self.shadow
                    .iter()
                    .zip(buffers)
                    .map(|(old, live)| compute_diff(old, live))
                    .collect::<Result<_, _>>()?
            };
            match recorder.record_frame(frame) {
                Ok(RecordOutcome::Recorded) => outcome = FrameOutcome::Recorded,
                Ok(RecordOutcome::AutoClosed(summary)) => {
                    self.recorder = None;
                    outcome = FrameOutcome::RecordingAutoClosed(summary);
                }
                Err(e) if !recorder.is_open() => {
                    self.recorder = None;
                    lost = Some(e);
                }
                Err(e) => return Err(e),
            }
            self.first_recorded_frame = false;
        }

        if self.config.history_depth > 0 {
            let rollback = self
                .shadow
                .iter()
                .zip(buffers)
                .map(|(old, live)| compute_rollback(old, live))
                .collect::<Result<Vec<_>, _>>()?;
            if self.history.len() == self.config.history_depth {
                self.history.pop_front();
            }
            self.history.push_back(rollback);
        }

        for (shadow, live) in self.shadow.iter_mut().zip(buffers) {
            shadow.copy_from_slice(live);
        }
        self.instruction_count += 1;
        match lost {
            Some(e) => Err(e),
            None => Ok(outcome),
        }
    }

    /// Contents of `region` as they were `frames_back` frames ago.
    ///
    /// Zero returns the current shadow. The shadow itself is not modified.
    pub fn historical_region(&self, region: usize, frames_back: usize) -> Result<Vec<u8>, ReplayError> {
        let mut buffer = self
            .shadow
            .get(region)
            .cloned()
            .ok_or(ReplayError::OutOfRange {
                what: "region",
                index: region as u64,
                len: self.shadow.len() as u64,
            })?;
        if frames_back > self.history.len() {
            return Err(ReplayError::OutOfRange {
                what: "history frame",
                index: frames_back as u64,
                len: self.history.len() as u64,
            });
        }
        for frame in self.history.iter().rev().take(frames_back) {
            if let Some(diffs) = frame.get(region) {
                apply_diffs(&mut buffer, diffs)?;
            }
        }
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecorderConfig;
    use crate::reader::ReplayFile;
    use snort_core::{DataType, RegionDescriptor};

    fn registry() -> RegionRegistry {
        RegionRegistry::new(vec![
            RegionDescriptor::new(DataType::U8, 4, 4, "regs"),
            RegionDescriptor::new(DataType::U8, 2, 2, "flags"),
        ])
        .unwrap()
    }

    #[test]
    fn shape_errors_leave_state_untouched() {
        let mut capture = FrameCapture::new(registry(), CaptureConfig::default()).unwrap();
        assert!(matches!(
            capture.end_frame(&[&[1, 2, 3, 4]]),
            Err(ReplayError::FrameShape { expected: 2, actual: 1 })
        ));
        assert!(matches!(
            capture.end_frame(&[&[1, 2, 3], &[0, 0]]),
            Err(ReplayError::Core(CoreError::LengthMismatch { .. }))
        ));
        assert_eq!(capture.instruction_count(), 0);
        assert_eq!(capture.history_len(), 0);
    }

    #[test]
    fn history_is_bounded_and_rewinds() {
        let config = CaptureConfig {
            history_depth: 2,
            ..CaptureConfig::default()
        };
        let mut capture = FrameCapture::new(registry(), config).unwrap();
        for v in 1..=4u8 {
            assert_eq!(
                capture.end_frame(&[&[v, 0, 0, v], &[v, v]]).unwrap(),
                FrameOutcome::Captured
            );
        }
        assert_eq!(capture.history_len(), 2);
        assert_eq!(capture.historical_region(0, 0).unwrap(), vec![4, 0, 0, 4]);
        assert_eq!(capture.historical_region(0, 1).unwrap(), vec![3, 0, 0, 3]);
        assert_eq!(capture.historical_region(1, 2).unwrap(), vec![2, 2]);
        assert!(capture.historical_region(0, 3).is_err());
        assert!(capture.historical_region(2, 0).is_err());
        assert_eq!(capture.region(0), Some(&[4, 0, 0, 4][..]));
    }

    #[test]
    fn zero_depth_keeps_no_history() {
        let config = CaptureConfig {
            history_depth: 0,
            ..CaptureConfig::default()
        };
        let mut capture = FrameCapture::new(registry(), config).unwrap();
        capture.end_frame(&[&[1, 1, 1, 1], &[1, 1]]).unwrap();
        assert_eq!(capture.history_len(), 0);
    }

    #[test]
    fn recording_starts_with_full_capture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.rpl");
        let mut capture = FrameCapture::new(registry(), CaptureConfig::default()).unwrap();

        capture.end_frame(&[&[1, 2, 3, 4], &[0, 0]]).unwrap();
        capture.start_recording(&path).unwrap();
        assert!(matches!(
            capture.start_recording(&path),
            Err(ReplayError::AlreadyRecording)
        ));
        assert_eq!(
            capture.end_frame(&[&[1, 2, 3, 4], &[0, 0]]).unwrap(),
            FrameOutcome::Recorded
        );
        capture.end_frame(&[&[1, 9, 3, 4], &[0, 0]]).unwrap();
        let summary = capture.stop_recording().unwrap().unwrap();
        assert_eq!(summary.instruction_count, 2);
        assert!(!capture.is_recording());
        assert_eq!(capture.stop_recording().unwrap(), None);

        let file = ReplayFile::open(&path).unwrap();
        assert_eq!(file.instruction_offset(), 1);
        assert_eq!(file.diffs(0, 0).unwrap(), &[ByteDiff::new(0, vec![1, 2, 3, 4])]);
        assert_eq!(file.diffs(0, 1).unwrap(), &[ByteDiff::new(0, vec![0, 0])]);
        assert_eq!(file.diffs(1, 0).unwrap(), &[ByteDiff::new(1, vec![9])]);
        assert_eq!(file.reconstruct_region(0, 1).unwrap(), vec![1, 9, 3, 4]);
    }

    #[test]
    fn auto_close_ends_recording() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.rpl");
        let config = CaptureConfig {
            history_depth: 0,
            recorder: RecorderConfig::with_max_recording_bytes(4),
        };
        let mut capture = FrameCapture::new(registry(), config).unwrap();
        capture.start_recording(&path).unwrap();
        let outcome = capture.end_frame(&[&[1, 1, 1, 1], &[1, 1]]).unwrap();
        assert!(matches!(outcome, FrameOutcome::RecordingAutoClosed(_)));
        assert!(!capture.is_recording());
        assert!(path.exists());
        assert_eq!(
            capture.end_frame(&[&[2, 1, 1, 1], &[1, 1]]).unwrap(),
            FrameOutcome::Captured
        );
    }

    #[test]
    fn failed_auto_close_drops_recording_and_keeps_capturing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("lost.rpl");
        let config = CaptureConfig {
            history_depth: 2,
            recorder: RecorderConfig::with_max_recording_bytes(4),
        };
        let mut capture = FrameCapture::new(registry(), config).unwrap();
        capture.start_recording(&path).unwrap();

        let err = capture.end_frame(&[&[1, 1, 1, 1], &[1, 1]]).unwrap_err();
        assert!(matches!(err, ReplayError::Io(_)));
        assert!(!capture.is_recording());
        assert_eq!(capture.instruction_count(), 1);
        assert_eq!(capture.region(0), Some(&[1, 1, 1, 1][..]));
        assert_eq!(capture.history_len(), 1);
        assert!(!path.exists());

        for v in 2..4u8 {
            assert_eq!(
                capture.end_frame(&[&[v, 1, 1, 1], &[1, 1]]).unwrap(),
                FrameOutcome::Captured
            );
        }
        assert_eq!(capture.instruction_count(), 3);
        assert_eq!(capture.historical_region(0, 1).unwrap(), vec![2, 1, 1, 1]);

        let retry = dir.path().join("retry.rpl");
        capture.start_recording(&retry).unwrap();
        assert!(matches!(
            capture.end_frame(&[&[4, 1, 1, 1], &[1, 1]]).unwrap(),
            FrameOutcome::RecordingAutoClosed(_)
        ));
        assert_eq!(ReplayFile::open(&retry).unwrap().instruction_offset(), 3);
    }
}
