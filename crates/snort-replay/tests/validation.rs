//! Cross-file validation and capture-driven end-to-end runs.

use snort_core::{ByteDiff, RegionDescriptor, RegionMismatch};
use snort_replay::{
    first_divergence, validate_memory, CaptureConfig, FrameCapture, FrameOutcome,
    Incompatibility, RecorderConfig, ReplayError, ReplayFile, ReplayFs, ReplayRecorder,
    ReplayStatus,
};
use snort_test_utils::{
    scenario_frames, scratch_replay, two_region_registry, two_regions, FrameGenerator,
};
use test_log::test;

fn record_frames(
    path: &std::path::Path,
    regions: Vec<RegionDescriptor>,
    frames: Vec<Vec<Vec<ByteDiff>>>,
) -> ReplayFile {
    let mut recorder = ReplayRecorder::open(path, 0, regions, RecorderConfig::default()).unwrap();
    for frame in frames {
        recorder.record_frame(frame).unwrap();
    }
    recorder.close().unwrap();
    ReplayFile::open(path).unwrap()
}

#[test]
fn identical_recordings_pass() {
    let (dir, a) = scratch_replay("a.rpl");
    let b = dir.path().join("b.rpl");
    let left = record_frames(&a, two_regions(), scenario_frames());
    let right = record_frames(&b, two_regions(), scenario_frames());
    assert_eq!(validate_memory(&left, &right).unwrap(), None);
}

#[test]
fn divergent_recordings_report_first_instruction() {
    let (dir, a) = scratch_replay("a.rpl");
    let b = dir.path().join("b.rpl");
    let mut frames = scenario_frames();
    frames[2][1] = vec![ByteDiff::new(0, b"RL".to_vec())];
    let left = record_frames(&a, two_regions(), scenario_frames());
    let right = record_frames(&b, two_regions(), frames);

    assert_eq!(validate_memory(&left, &right).unwrap(), Some(2));
    let report = first_divergence(&left, &right).unwrap().unwrap();
    assert_eq!(report.regions.len(), 1);
    let region = &report.regions[0];
    assert_eq!(region.label, "region-ram");
    assert_eq!(region.byte_offset, 0);
    assert_eq!((region.left, region.right), (b'r', b'R'));
    assert_eq!(region.differing_bytes, 2);
}

#[test]
fn element_count_mismatch_fails_before_comparing() {
    let (dir, a) = scratch_replay("a.rpl");
    let b = dir.path().join("b.rpl");
    let mut regions = two_regions();
    regions[1].element_count = 4;
    let left = record_frames(&a, two_regions(), scenario_frames());
    let right = record_frames(&b, regions, scenario_frames());

    let err = validate_memory(&left, &right).unwrap_err();
    assert!(matches!(
        err,
        ReplayError::Incompatible(Incompatibility::Regions(RegionMismatch::ElementCount {
            index: 1,
            left: 2,
            right: 4,
        }))
    ));
}

#[test]
fn capture_reconstructs_every_frame() {
    let (_dir, path) = scratch_replay("generated.rpl");
    let registry = two_region_registry();
    let mut generator = FrameGenerator::new(&registry, 0x5eed, 3);
    let mut capture = FrameCapture::new(registry, CaptureConfig::default()).unwrap();

    // Run a few frames before recording so the file starts mid-execution.
    for _ in 0..5 {
        generator.next_frame();
        capture.end_frame(&generator.slices()).unwrap();
    }
    capture.start_recording(&path).unwrap();

    let mut expected = Vec::new();
    for _ in 0..64 {
        generator.next_frame();
        let outcome = capture.end_frame(&generator.slices()).unwrap();
        assert_eq!(outcome, FrameOutcome::Recorded);
        expected.push(generator.slices().iter().map(|s| s.to_vec()).collect::<Vec<_>>());
    }
    capture.stop_recording().unwrap();

    let file = ReplayFile::open(&path).unwrap();
    assert_eq!(file.instruction_offset(), 5);
    assert_eq!(file.instruction_count(), 64);

    let mut cursor = file.cursor().unwrap();
    for state in &expected {
        cursor.step_forward().unwrap();
        assert_eq!(cursor.regions(), state.as_slice());
    }
    assert_eq!(file.reconstruct(63).unwrap(), expected[63]);
}

#[test]
fn two_captures_of_the_same_run_validate() {
    let (dir, a) = scratch_replay("a.rpl");
    let b = dir.path().join("b.rpl");

    for path in [&a, &b] {
        let registry = two_region_registry();
        let mut generator = FrameGenerator::new(&registry, 99, 2);
        let mut capture = FrameCapture::new(registry, CaptureConfig::default()).unwrap();
        capture.start_recording(path).unwrap();
        for _ in 0..32 {
            generator.next_frame();
            capture.end_frame(&generator.slices()).unwrap();
        }
        capture.stop_recording().unwrap();
    }

    let mut fs = ReplayFs::new();
    let left = fs.replay_open(&a).unwrap();
    let right = fs.replay_open(&b).unwrap();
    assert_eq!(fs.replay_validate_memory(left, right), Ok(None));
    assert_eq!(fs.replay_close(left), ReplayStatus::Ok);
    assert_eq!(
        fs.replay_validate_memory(left, right),
        Err(ReplayStatus::InvalidHandle)
    );
}

#[test]
fn incompatible_handles_report_status() {
    let (dir, a) = scratch_replay("a.rpl");
    let b = dir.path().join("b.rpl");
    record_frames(&a, two_regions(), scenario_frames());
    let mut shorter = scenario_frames();
    shorter.pop();
    record_frames(&b, two_regions(), shorter);

    let mut fs = ReplayFs::new();
    let left = fs.replay_open(&a).unwrap();
    let right = fs.replay_open(&b).unwrap();
    assert_eq!(
        fs.replay_validate_memory(left, right),
        Err(ReplayStatus::Incompatible)
    );
}
