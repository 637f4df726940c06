//! Error types for the replay system.

use std::fmt;
use std::io;

use snort_core::CoreError;

use crate::compare::Incompatibility;

/// Errors that can occur during replay recording, playback, or comparison.
#[derive(Debug)]
pub enum ReplayError {
    /// An I/O error occurred during read or write.
    Io(io::Error),
    /// The file does not start with the `b"SNORTRPL"` magic bytes.
    InvalidMagic {
        /// The eight bytes found instead.
        found: [u8; 8],
    },
    /// The file ended before the trailing magic was reached.
    Truncated {
        /// What was being read when the data ran out.
        context: String,
    },
    /// The file is structurally invalid (bad counts, bad trailer, ...).
    MalformedFile {
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// A region descriptor or diff list failed validation.
    Core(CoreError),
    /// An instruction or region index is past the stored bounds.
    OutOfRange {
        /// Which kind of index was out of range.
        what: &'static str,
        /// The requested index.
        index: u64,
        /// Number of valid entries.
        len: u64,
    },
    /// The recorder was closed, explicitly or by the byte limit.
    RecorderClosed,
    /// A whole-instruction call arrived while an instruction was half recorded.
    IncompleteInstruction {
        /// Regions already recorded for the open instruction.
        recorded: usize,
        /// Regions per instruction.
        region_count: usize,
    },
    /// A frame did not supply exactly one entry per region.
    FrameShape {
        /// Regions per instruction.
        expected: usize,
        /// Entries supplied.
        actual: usize,
    },
    /// A capture already has an active recording.
    AlreadyRecording,
    /// Two replay files cannot be compared.
    Incompatible(Incompatibility),
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::InvalidMagic { found } => write!(
                f,
                "invalid magic bytes (expected b\"SNORTRPL\", found {:?})",
                String::from_utf8_lossy(found)
            ),
            Self::Truncated { context } => write!(f, "file truncated while reading {context}"),
            Self::MalformedFile { detail } => write!(f, "malformed replay file: {detail}"),
            Self::Core(e) => write!(f, "{e}"),
            Self::OutOfRange { what, index, len } => {
                write!(f, "{what} index {index} out of range (count {len})")
            }
            Self::RecorderClosed => write!(f, "recorder is closed"),
            Self::IncompleteInstruction {
                recorded,
                region_count,
            } => write!(
                f,
                "instruction is incomplete: {recorded} of {region_count} regions recorded"
            ),
            Self::FrameShape { expected, actual } => {
                write!(f, "frame has {actual} region entries, expected {expected}")
            }
            Self::AlreadyRecording => write!(f, "a recording is already in progress"),
            Self::Incompatible(reason) => write!(f, "replay files are incompatible: {reason}"),
        }
    }
}

impl std::error::Error for ReplayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Core(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ReplayError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<CoreError> for ReplayError {
    fn from(e: CoreError) -> Self {
        Self::Core(e)
    }
}

impl From<Incompatibility> for ReplayError {
    fn from(e: Incompatibility) -> Self {
        Self::Incompatible(e)
    }
}
