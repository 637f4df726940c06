//! Byte-level diff engine.
//!
//! A diff is a contiguous span of changed bytes, recorded as
//! `(offset, bytes)`. The engine scans two equal-length buffers left to
//! right and coalesces adjacent changed bytes into one span, so a diff
//! list is always ordered by offset and no two spans touch or overlap.
//!
//! Persisted diffs carry the *new* bytes: reconstruction starts from a
//! zero buffer and folds diffs forward in instruction order. Rollback
//! diffs carry the *old* bytes and only ever live in memory.

use crate::error::CoreError;

/// A half-open range `[offset, offset + len)` of changed bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    /// First changed byte.
    pub offset: usize,
    /// Number of changed bytes.
    pub len: usize,
}

impl Span {
    /// One past the last changed byte.
    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// An owned change span: the bytes found at `[byte_offset, byte_offset + data.len())`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ByteDiff {
    /// Offset of the first byte within the region.
    pub byte_offset: u64,
    /// Payload. Its length is the span's byte count.
    pub data: Vec<u8>,
}

impl ByteDiff {
    /// Create a diff from an offset and an owned payload.
    pub fn new(byte_offset: u64, data: Vec<u8>) -> Self {
        Self { byte_offset, data }
    }

    /// Number of bytes covered.
    pub fn byte_count(&self) -> u64 {
        self.data.len() as u64
    }

    /// One past the last covered byte.
    pub fn end(&self) -> u64 {
        self.byte_offset.saturating_add(self.byte_count())
    }

    /// Borrow this diff as a record for the recorder.
    pub fn as_record(&self) -> DiffRecord<'_> {
        DiffRecord {
            byte_offset: self.byte_offset,
            data: &self.data,
        }
    }
}

/// A borrowed change span, as handed to a recorder.
///
/// The payload only has to outlive the call; recorders copy it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiffRecord<'a> {
    /// Offset of the first byte within the region.
    pub byte_offset: u64,
    /// Payload bytes.
    pub data: &'a [u8],
}

impl<'a> DiffRecord<'a> {
    /// Create a record.
    pub fn new(byte_offset: u64, data: &'a [u8]) -> Self {
        Self { byte_offset, data }
    }

    /// Copy the payload into an owned diff.
    pub fn to_owned_diff(&self) -> ByteDiff {
        ByteDiff::new(self.byte_offset, self.data.to_vec())
    }
}

/// Anything with an offset and a byte count, for diff list validation.
pub trait DiffSpan {
    /// Offset of the first byte.
    fn span_offset(&self) -> u64;
    /// Number of bytes covered.
    fn span_count(&self) -> u64;
}

impl DiffSpan for ByteDiff {
    fn span_offset(&self) -> u64 {
        self.byte_offset
    }
    fn span_count(&self) -> u64 {
        self.byte_count()
    }
}

impl DiffSpan for DiffRecord<'_> {
    fn span_offset(&self) -> u64 {
        self.byte_offset
    }
    fn span_count(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Find the spans where `old` and `new` differ.
///
/// Returns an empty list when the buffers are equal and a single
/// full-length span when every byte differs.
pub fn changed_spans(old: &[u8], new: &[u8]) -> Result<Vec<Span>, CoreError> {
    if old.len() != new.len() {
        return Err(CoreError::LengthMismatch {
            expected: old.len(),
            actual: new.len(),
        });
    }

    let mut spans = Vec::new();
    let mut span_start: Option<usize> = None;
    for (index, (a, b)) in old.iter().zip(new.iter()).enumerate() {
        match (a != b, span_start) {
            (true, None) => span_start = Some(index),
            (false, Some(start)) => {
                spans.push(Span {
                    offset: start,
                    len: index - start,
                });
                span_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = span_start {
        spans.push(Span {
            offset: start,
            len: old.len() - start,
        });
    }
    Ok(spans)
}

/// Forward diffs from `old` to `new`, carrying the new bytes.
///
/// Folding the result onto `old` yields `new`.
pub fn compute_diff(old: &[u8], new: &[u8]) -> Result<Vec<ByteDiff>, CoreError> {
    Ok(changed_spans(old, new)?
        .into_iter()
        .map(|s| ByteDiff::new(s.offset as u64, new[s.offset..s.end()].to_vec()))
        .collect())
}

/// Rollback diffs from `old` to `new`, carrying the old bytes.
///
/// Folding the result onto `new` yields `old`.
pub fn compute_rollback(old: &[u8], new: &[u8]) -> Result<Vec<ByteDiff>, CoreError> {
    Ok(changed_spans(old, new)?
        .into_iter()
        .map(|s| ByteDiff::new(s.offset as u64, old[s.offset..s.end()].to_vec()))
        .collect())
}

/// A single diff covering the whole buffer.
pub fn full_capture(buffer: &[u8]) -> ByteDiff {
    ByteDiff::new(0, buffer.to_vec())
}

/// Overwrite `buffer` with each diff's payload, in order.
///
/// Stops at the first span that falls outside the buffer; diffs before
/// it have already been written.
pub fn apply_diffs(buffer: &mut [u8], diffs: &[ByteDiff]) -> Result<(), CoreError> {
    let region_bytes = buffer.len() as u64;
    for diff in diffs {
        let end = diff
            .byte_offset
            .checked_add(diff.byte_count())
            .filter(|&end| end <= region_bytes)
            .ok_or(CoreError::DiffOutOfBounds {
                byte_offset: diff.byte_offset,
                byte_count: diff.byte_count(),
                region_bytes,
            })?;
        buffer[diff.byte_offset as usize..end as usize].copy_from_slice(&diff.data);
    }
    Ok(())
}

/// Check that a diff list could have come from the diff engine for a
/// region of `region_bytes` bytes.
///
/// Every span must be non-empty and in bounds, and spans must be in
/// strictly increasing offset order with at least one unchanged byte
/// between neighbours.
pub fn validate_diff_list<D: DiffSpan>(diffs: &[D], region_bytes: u64) -> Result<(), CoreError> {
    let mut previous_end: Option<u64> = None;
    for (index, diff) in diffs.iter().enumerate() {
        let (offset, count) = (diff.span_offset(), diff.span_count());
        if count == 0 {
            return Err(CoreError::InvalidDiffList {
                index,
                reason: "empty span".into(),
            });
        }
        let end = offset
            .checked_add(count)
            .filter(|&end| end <= region_bytes)
            .ok_or(CoreError::DiffOutOfBounds {
                byte_offset: offset,
                byte_count: count,
                region_bytes,
            })?;
        if let Some(prev) = previous_end {
            if offset <= prev {
                return Err(CoreError::InvalidDiffList {
                    index,
                    reason: format!(
                        "span at {offset} overlaps or touches previous span ending at {prev}"
                    ),
                });
            }
        }
        previous_end = Some(end);
    }
    Ok(())
}
