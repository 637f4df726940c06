//! Test fixtures and synthetic workloads for Snort development.
//!
//! Provides the standard two-region layout, the three-instruction
//! reference recording used across the replay tests, and a seeded
//! [`FrameGenerator`] for property-style end-to-end runs.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{
    scenario_frames, scenario_region_states, two_region_registry, two_regions, FrameGenerator,
    SCENARIO_FINAL_RAM, SCENARIO_FINAL_REGISTERS,
};

use std::path::PathBuf;

use tempfile::TempDir;

/// A fresh temporary directory and a replay path inside it.
///
/// Keep the `TempDir` alive for as long as the file is needed.
pub fn scratch_replay(name: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join(name);
    (dir, path)
}
