//! Tests for the durable progress store
//!
//! These tests verify:
//! - Idempotent recording and read-back
//! - Survival across process restarts (store reconstruction)
//! - Candidate-location fallback and forward migration
//! - Best-effort recovery from corrupted marker files

use std::fs;

use alie::progress::{ProgressStore, AUDIT_FILE, MARKER_FILE};
use alie::steps::StepId;

// =============================================================================
// Round-trip and restart behavior
// =============================================================================

#[test]
fn test_round_trip_across_restart() {
    let dir = tempfile::tempdir().expect("tempdir");

    {
        let store = ProgressStore::at(dir.path());
        store.record_completed(StepId::BaseInstall).expect("record");
        store.record_completed(StepId::SystemSetup).expect("record");
        store.record_completed(StepId::PostInstall).expect("record");
    }

    // A fresh store over the same directory simulates a new process
    let reopened = ProgressStore::at(dir.path());
    assert_eq!(reopened.highest_completed_step(), 3);
    assert!(reopened.is_completed(StepId::BaseInstall));
    assert!(reopened.is_completed(StepId::SystemSetup));
    assert!(reopened.is_completed(StepId::PostInstall));
    assert!(!reopened.is_completed(StepId::AurHelper));
}

#[test]
fn test_repeated_records_leave_store_unchanged() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ProgressStore::at(dir.path());

    store.record_completed(StepId::BaseInstall).expect("record");
    let before = fs::read_to_string(dir.path().join(MARKER_FILE)).expect("marker");

    for _ in 0..5 {
        store.record_completed(StepId::BaseInstall).expect("record");
    }
    let after = fs::read_to_string(dir.path().join(MARKER_FILE)).expect("marker");

    assert_eq!(before, after);
    assert!(store.is_completed(StepId::BaseInstall));
}

#[test]
fn test_recording_out_of_order_still_reports_highest() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ProgressStore::at(dir.path());

    store.record_completed(StepId::PostInstall).expect("record");
    store.record_completed(StepId::BaseInstall).expect("record");

    assert_eq!(store.highest_completed_step(), 3);
}

// =============================================================================
// Reset
// =============================================================================

#[test]
fn test_reset_forgets_all_previously_completed_steps() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ProgressStore::at(dir.path());

    store.record_completed(StepId::BaseInstall).expect("record");
    store.record_completed(StepId::SystemSetup).expect("record");

    store.reset().expect("reset");

    for id in [StepId::BaseInstall, StepId::SystemSetup] {
        assert!(!store.is_completed(id));
    }
    assert_eq!(store.highest_completed_step(), 0);
}

// =============================================================================
// Candidate locations
// =============================================================================

#[test]
fn test_reading_prefers_the_most_current_location() {
    let root = tempfile::tempdir().expect("tempdir");
    let target = root.path().join("target");
    let temp = root.path().join("temp");
    fs::create_dir(&target).expect("mkdir");
    fs::create_dir(&temp).expect("mkdir");

    // Stale record in the temporary location, newer one under the target root
    fs::write(temp.join(MARKER_FILE), "base-install\n").expect("write");
    fs::write(target.join(MARKER_FILE), "base-install\nsystem-setup\n").expect("write");

    let store = ProgressStore::new(vec![target, temp.clone()], vec![temp]);
    assert_eq!(store.highest_completed_step(), 2);
}

#[test]
fn test_migration_carries_earlier_records_forward() {
    let root = tempfile::tempdir().expect("tempdir");
    let target = root.path().join("target");
    let temp = root.path().join("temp");
    fs::create_dir(&temp).expect("mkdir");

    let store = ProgressStore::new(
        vec![target.clone(), temp.clone()],
        vec![target.clone(), temp.clone()],
    );

    // Before the target root exists, the record lands in the temp location
    store.record_completed(StepId::BaseInstall).expect("record");
    assert!(temp.join(MARKER_FILE).is_file());
    assert!(!target.exists());

    // Once the target root appears, the next record migrates history into it
    fs::create_dir(&target).expect("mkdir");
    store.record_completed(StepId::SystemSetup).expect("record");

    let reopened = ProgressStore::new(vec![target, temp], Vec::new());
    assert_eq!(reopened.highest_completed_step(), 2);
    assert!(reopened.is_completed(StepId::BaseInstall));
}

// =============================================================================
// Corruption handling
// =============================================================================

#[test]
fn test_corrupted_marker_lines_do_not_crash_the_scan() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(
        dir.path().join(MARKER_FILE),
        "base-install\n\u{0}\u{1}binary junk\nsystem-setup\nnot-a-step\n",
    )
    .expect("write");

    let store = ProgressStore::at(dir.path());
    assert_eq!(
        store.completed(),
        vec![StepId::BaseInstall, StepId::SystemSetup]
    );
}

#[test]
fn test_partially_written_last_line_is_skipped() {
    let dir = tempfile::tempdir().expect("tempdir");
    // Simulates a crash mid-append: the last line is truncated
    fs::write(dir.path().join(MARKER_FILE), "base-install\nsystem-set").expect("write");

    let store = ProgressStore::at(dir.path());
    assert_eq!(store.completed(), vec![StepId::BaseInstall]);
    assert_eq!(store.highest_completed_step(), 1);
}

#[test]
fn test_audit_log_survives_marker_corruption() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ProgressStore::at(dir.path());

    store.record_completed(StepId::BaseInstall).expect("record");
    fs::write(dir.path().join(MARKER_FILE), "garbage\n").expect("write");
    store.record_completed(StepId::SystemSetup).expect("record");

    let audit = fs::read_to_string(dir.path().join(AUDIT_FILE)).expect("audit");
    assert_eq!(audit.lines().count(), 2);
}
