//! Recorder and capture configuration.

/// Configuration for a [`ReplayRecorder`](crate::ReplayRecorder).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecorderConfig {
    /// Payload bytes after which the recorder closes itself.
    ///
    /// Checked each time an instruction completes. Default: 64 MiB.
    pub max_recording_bytes: u64,
}

impl RecorderConfig {
    /// Default recording limit: 64 MiB of diff payload.
    pub const DEFAULT_MAX_RECORDING_BYTES: u64 = 64 * 1024 * 1024;

    /// A config with a custom byte limit.
    pub fn with_max_recording_bytes(max_recording_bytes: u64) -> Self {
        Self {
            max_recording_bytes,
        }
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            max_recording_bytes: Self::DEFAULT_MAX_RECORDING_BYTES,
        }
    }
}

/// Configuration for a [`FrameCapture`](crate::FrameCapture).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Number of frames of rollback history kept in memory.
    ///
    /// Default: 5. Zero disables history.
    pub history_depth: usize,
    /// Settings passed to recorders started by the capture.
    pub recorder: RecorderConfig,
}

impl CaptureConfig {
    /// Default rollback history depth.
    pub const DEFAULT_HISTORY_DEPTH: usize = 5;
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            history_depth: Self::DEFAULT_HISTORY_DEPTH,
            recorder: RecorderConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        assert_eq!(RecorderConfig::default().max_recording_bytes, 67_108_864);
        let capture = CaptureConfig::default();
        assert_eq!(capture.history_depth, 5);
        assert_eq!(capture.recorder, RecorderConfig::default());
    }
}
