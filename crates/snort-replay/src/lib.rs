//! Deterministic replay recording and playback for Snort emulators.
//!
//! Records how emulated memory regions change instruction by instruction,
//! writes the result as a compact binary file, and reconstructs or
//! compares recorded state afterwards.
//!
//! # Architecture
//!
//! - [`ReplayRecorder`] accumulates per-region diff lists and writes the file on close
//! - [`ReplayFile`] loads and validates a file for random access
//! - [`StateCursor`] reconstructs region contents at any instruction
//! - [`validate_memory`] finds the first instruction where two recordings disagree
//! - [`FrameCapture`] turns live region buffers into recorder input
//! - [`ReplayFs`] exposes all of the above through integer handles and status codes
//!
//! # Format
//!
//! ```text
//! [MAGIC "SNORTRPL"] [instructionOffset u64] [instructionCount u64] [regionCount u64]
//! [Region descriptor 1] ... [Region descriptor R]
//! [Instruction 1: R diff lists] ... [Instruction N: R diff lists]
//! [MAGIC "SNORTRPL"]
//! ```
//!
//! Diffs carry the new bytes; reconstruction folds them forward over
//! zero-initialized buffers.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod capture;
pub mod codec;
pub mod compare;
pub mod config;
pub mod error;
pub mod fs;
pub mod handle;
pub mod reader;
pub mod reconstruct;
pub mod recorder;
pub mod status;
pub mod types;

pub use capture::{FrameCapture, FrameOutcome};
pub use compare::{
    check_compatible, first_divergence, validate_memory, DivergenceReport, Incompatibility,
    RegionDivergence,
};
pub use config::{CaptureConfig, RecorderConfig};
pub use error::ReplayError;
pub use fs::{RecorderHandle, ReplayFs, ReplayHandle};
pub use handle::{HandleTable, RawHandle};
pub use reader::ReplayFile;
pub use reconstruct::StateCursor;
pub use recorder::{RecordOutcome, RecordingSummary, ReplayRecorder};
pub use status::ReplayStatus;
pub use types::{InstructionRecord, RegionDiffs, ReplayData};

/// Magic bytes at the start and end of every replay file.
pub const MAGIC: [u8; 8] = *b"SNORTRPL";
