//! Integer status codes for the handle-based facade.

use crate::error::ReplayError;

/// Status returned by [`ReplayFs`](crate::ReplayFs) operations.
///
/// `Ok` = 0, all errors are negative. Values are ABI-stable.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReplayStatus {
    /// Success.
    Ok = 0,
    /// Handle is unknown, stale or already closed.
    InvalidHandle = -1,
    /// Instruction or region index past the stored bounds.
    OutOfRange = -2,
    /// Filesystem read or write failed.
    Io = -3,
    /// File is truncated, has bad magic, or fails validation.
    Malformed = -4,
    /// Arguments rejected (bad descriptors, bad diff list, wrong frame shape).
    InvalidArgument = -5,
    /// Two replay files cannot be compared.
    Incompatible = -6,
    /// The recorder was closed, explicitly or by its byte limit.
    RecorderClosed = -7,
}

impl ReplayStatus {
    /// Whether this is [`ReplayStatus::Ok`].
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl From<&ReplayError> for ReplayStatus {
    fn from(e: &ReplayError) -> Self {
        match e {
            ReplayError::Io(_) => Self::Io,
            ReplayError::InvalidMagic { .. }
            | ReplayError::Truncated { .. }
            | ReplayError::MalformedFile { .. } => Self::Malformed,
            ReplayError::Core(_)
            | ReplayError::IncompleteInstruction { .. }
            | ReplayError::FrameShape { .. }
            | ReplayError::AlreadyRecording => Self::InvalidArgument,
            ReplayError::OutOfRange { .. } => Self::OutOfRange,
            ReplayError::RecorderClosed => Self::RecorderClosed,
            ReplayError::Incompatible(_) => Self::Incompatible,
        }
    }
}

impl From<i32> for ReplayStatus {
    /// Unknown codes map to `InvalidArgument`.
    fn from(code: i32) -> Self {
        match code {
            0 => Self::Ok,
            -1 => Self::InvalidHandle,
            -2 => Self::OutOfRange,
            -3 => Self::Io,
            -4 => Self::Malformed,
            -6 => Self::Incompatible,
            -7 => Self::RecorderClosed,
            _ => Self::InvalidArgument,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snort_core::CoreError;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ReplayStatus::Ok as i32, 0);
        assert_eq!(ReplayStatus::InvalidHandle as i32, -1);
        assert_eq!(ReplayStatus::RecorderClosed as i32, -7);
        for status in [
            ReplayStatus::Ok,
            ReplayStatus::InvalidHandle,
            ReplayStatus::OutOfRange,
            ReplayStatus::Io,
            ReplayStatus::Malformed,
            ReplayStatus::InvalidArgument,
            ReplayStatus::Incompatible,
            ReplayStatus::RecorderClosed,
        ] {
            assert_eq!(ReplayStatus::from(status as i32), status);
        }
    }

    #[test]
    fn errors_map_to_statuses() {
        let cases = [
            (ReplayError::RecorderClosed, ReplayStatus::RecorderClosed),
            (
                ReplayError::Truncated {
                    context: "diff data".into(),
                },
                ReplayStatus::Malformed,
            ),
            (ReplayError::Core(CoreError::NoRegions), ReplayStatus::InvalidArgument),
            (
                ReplayError::OutOfRange {
                    what: "region",
                    index: 3,
                    len: 2,
                },
                ReplayStatus::OutOfRange,
            ),
        ];
        for (error, status) in &cases {
            assert_eq!(ReplayStatus::from(error), *status);
        }
    }
}
