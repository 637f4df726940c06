//! Error types for region descriptors and the diff engine.

use std::error::Error;
use std::fmt;

/// Errors raised while validating regions or computing/applying diffs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CoreError {
    /// A data-type ordinal is not part of the stable ordinal table.
    UnknownDataType {
        /// The unrecognized ordinal.
        ordinal: u64,
    },
    /// A region descriptor failed validation.
    InvalidRegion {
        /// Label of the offending region (may be empty).
        label: String,
        /// Human-readable description of what is wrong.
        reason: String,
    },
    /// A registry was built from an empty region list.
    NoRegions,
    /// Two regions in one registry share a label.
    DuplicateLabel {
        /// The label that appears more than once.
        label: String,
    },
    /// Two buffers that must be the same length are not.
    LengthMismatch {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },
    /// A diff span does not fit inside its region.
    DiffOutOfBounds {
        /// Start of the span.
        byte_offset: u64,
        /// Length of the span.
        byte_count: u64,
        /// Size of the region the span was applied to.
        region_bytes: u64,
    },
    /// A diff list violates ordering or disjointness.
    InvalidDiffList {
        /// Index of the offending diff within its list.
        index: usize,
        /// Human-readable description of what is wrong.
        reason: String,
    },
    /// Zeroed buffers for a region could not be allocated.
    AllocationFailed {
        /// Label of the region.
        label: String,
        /// Requested size in bytes.
        bytes: u64,
    },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownDataType { ordinal } => {
                write!(f, "unknown data type ordinal {ordinal}")
            }
            Self::InvalidRegion { label, reason } => {
                write!(f, "invalid region '{label}': {reason}")
            }
            Self::NoRegions => write!(f, "at least one memory region is required"),
            Self::DuplicateLabel { label } => {
                write!(f, "duplicate region label '{label}'")
            }
            Self::LengthMismatch { expected, actual } => {
                write!(f, "buffer length mismatch: expected {expected} bytes, got {actual}")
            }
            Self::DiffOutOfBounds {
                byte_offset,
                byte_count,
                region_bytes,
            } => write!(
                f,
                "diff [{byte_offset}, +{byte_count}) exceeds region of {region_bytes} bytes"
            ),
            Self::InvalidDiffList { index, reason } => {
                write!(f, "invalid diff list at diff {index}: {reason}")
            }
            Self::AllocationFailed { label, bytes } => {
                write!(f, "cannot allocate {bytes} bytes for region '{label}'")
            }
        }
    }
}

impl Error for CoreError {}
