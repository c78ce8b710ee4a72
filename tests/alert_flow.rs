//! End-to-end alert pipeline: polls against an in-memory backend, dismissal
//! persistence across engine reconstruction, and recovery/reappearance.

use std::sync::Arc;

use chrono::Utc;
use drive_dash::alert::{AlertEngine, DismissalLedger, Severity, ThresholdStore};
use drive_dash::backend::memory::MemoryBackend;
use drive_dash::backend::{DriveKind, DriveSnapshot};
use drive_dash::store::memory::MemoryStore;

fn snapshot(id: &str, usage: f64) -> DriveSnapshot {
    let used = (usage * 10.0) as u64;
    DriveSnapshot {
        id: id.to_string(),
        label: format!("Drive {id}"),
        total_size: 1000,
        used_space: used,
        free_space: 1000 - used,
        usage_percentage: usage,
        kind: DriveKind::Local,
    }
}

fn build_engine(store: Arc<MemoryStore>) -> AlertEngine {
    let thresholds = ThresholdStore::load(store.clone(), 80.0).unwrap();
    let dismissals = DismissalLedger::load(store).unwrap();
    AlertEngine::new(thresholds, dismissals, 10.0)
}

#[test]
fn multi_poll_session_raises_and_holds_alerts() {
    let store = Arc::new(MemoryStore::new());
    let backend = MemoryBackend::new(vec![snapshot("C", 60.0), snapshot("data", 40.0)]);
    let mut engine = build_engine(store);

    let report = engine.poll(&backend, Utc::now()).unwrap();
    assert!(report.raised.is_empty());

    // C jumps across both boundaries in one poll.
    backend.set_drives(vec![snapshot("C", 82.0), snapshot("data", 40.0)]);
    let report = engine.poll(&backend, Utc::now()).unwrap();
    assert_eq!(report.raised, vec!["C-82.0"]);
    assert_eq!(report.warning_crossings, vec!["C"]);
    assert_eq!(report.critical_crossings, vec!["C"]);
    assert_eq!(engine.active()[0].severity, Severity::Critical);

    // data creeps into the warning band only.
    backend.set_drives(vec![snapshot("C", 82.0), snapshot("data", 71.0)]);
    let report = engine.poll(&backend, Utc::now()).unwrap();
    assert_eq!(report.raised, vec!["data-71.0"]);
    let data_alert = engine
        .active()
        .iter()
        .find(|alert| alert.drive_id == "data")
        .unwrap();
    assert_eq!(data_alert.severity, Severity::Warning);

    // Steady state: nothing new, nothing expires.
    for _ in 0..5 {
        let report = engine.poll(&backend, Utc::now()).unwrap();
        assert!(report.raised.is_empty());
    }
    assert_eq!(engine.active().len(), 2);
}

#[test]
fn dismissal_survives_engine_restart() {
    let store = Arc::new(MemoryStore::new());
    let backend = MemoryBackend::new(vec![snapshot("C", 85.0)]);

    {
        let mut engine = build_engine(store.clone());
        engine.poll(&backend, Utc::now()).unwrap();
        engine.dismiss("C-85.0").unwrap();
        assert!(engine.active().is_empty());
    }

    // A fresh engine over the same store starts with an empty previous-usage
    // map, so 85% reads as a crossing, but the persisted dismissal wins.
    let mut engine = build_engine(store);
    let report = engine.poll(&backend, Utc::now()).unwrap();
    assert!(report.raised.is_empty());
    assert!(engine.active().is_empty());
}

#[test]
fn recovery_prunes_the_dismissal_and_realerts_on_recross() {
    let store = Arc::new(MemoryStore::new());
    let backend = MemoryBackend::new(vec![snapshot("C", 85.0)]);
    let mut engine = build_engine(store);

    engine.poll(&backend, Utc::now()).unwrap();
    engine.dismiss("C-85.0").unwrap();

    // Dip inside the band: dismissal stays, nothing raised.
    backend.set_drives(vec![snapshot("C", 75.0)]);
    let report = engine.poll(&backend, Utc::now()).unwrap();
    assert_eq!(report.pruned_dismissals, 0);

    backend.set_drives(vec![snapshot("C", 85.0)]);
    let report = engine.poll(&backend, Utc::now()).unwrap();
    assert!(report.raised.is_empty());

    // Full recovery below threshold - 10 clears the dismissal.
    backend.set_drives(vec![snapshot("C", 65.0)]);
    let report = engine.poll(&backend, Utc::now()).unwrap();
    assert_eq!(report.pruned_dismissals, 1);

    backend.set_drives(vec![snapshot("C", 85.0)]);
    let report = engine.poll(&backend, Utc::now()).unwrap();
    assert_eq!(report.raised, vec!["C-85.0"]);
}

#[test]
fn failed_poll_is_transient_and_state_is_preserved() {
    let store = Arc::new(MemoryStore::new());
    let backend = MemoryBackend::new(vec![snapshot("C", 85.0)]);
    let mut engine = build_engine(store);

    engine.poll(&backend, Utc::now()).unwrap();
    assert_eq!(engine.active().len(), 1);

    backend.fail_next_drive_listing();
    let err = engine.poll(&backend, Utc::now()).unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(engine.active().len(), 1);

    // Next tick succeeds again; 85 -> 85 is not a crossing.
    let report = engine.poll(&backend, Utc::now()).unwrap();
    assert!(report.raised.is_empty());
}

#[test]
fn disappearing_drive_prunes_its_dismissal() {
    let store = Arc::new(MemoryStore::new());
    let backend = MemoryBackend::new(vec![snapshot("C", 85.0), snapshot("usb", 92.0)]);
    let mut engine = build_engine(store);

    engine.poll(&backend, Utc::now()).unwrap();
    engine.dismiss("usb-92.0").unwrap();

    // The removable drive is unplugged: recovered by absence.
    backend.set_drives(vec![snapshot("C", 85.0)]);
    let report = engine.poll(&backend, Utc::now()).unwrap();
    assert_eq!(report.pruned_dismissals, 1);
}

#[test]
fn threshold_edits_apply_to_subsequent_polls() {
    let store = Arc::new(MemoryStore::new());
    let backend = MemoryBackend::new(vec![snapshot("C", 55.0)]);
    let mut engine = build_engine(store);

    engine.poll(&backend, Utc::now()).unwrap();
    assert!(engine.active().is_empty());

    let mut draft = engine.thresholds().draft();
    draft.stage("C", 50.0);
    engine.thresholds_mut().commit(draft).unwrap();

    // Usage has to cross, and previous usage is already 55, so dip first.
    backend.set_drives(vec![snapshot("C", 30.0)]);
    engine.poll(&backend, Utc::now()).unwrap();
    backend.set_drives(vec![snapshot("C", 55.0)]);
    let report = engine.poll(&backend, Utc::now()).unwrap();
    assert_eq!(report.raised, vec!["C-55.0"]);
    assert_eq!(engine.active()[0].severity, Severity::Critical);
}
