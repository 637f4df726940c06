//! Core types for the Snort emulator replay system.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the pieces every other Snort crate agrees on: the element data-type
//! table, memory region descriptors and their registry, and the byte
//! diff engine that turns two snapshots of a region into change spans.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod diff;
pub mod dtype;
pub mod error;
pub mod region;

pub use diff::{
    apply_diffs, changed_spans, compute_diff, compute_rollback, full_capture,
    validate_diff_list, ByteDiff, DiffRecord, DiffSpan, Span,
};
pub use dtype::{DataType, DTYPE_TABLE_VERSION};
pub use error::CoreError;
pub use region::{RegionDescriptor, RegionMismatch, RegionRegistry, MAX_LABEL_LEN};
