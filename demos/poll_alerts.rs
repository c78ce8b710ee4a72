//! Poll a scripted backend and print the alerts each cycle produces.
//!
//! Usage:
//!   cargo run --example poll_alerts
//!
//! Demonstrates library-only usage: in-memory store and backend, threshold
//! defaults, crossing detection, dismissal hysteresis.

use std::sync::Arc;

use drive_dash::alert::{AlertEngine, DismissalLedger, ThresholdStore};
use drive_dash::backend::memory::MemoryBackend;
use drive_dash::backend::{DriveKind, DriveSnapshot};
use drive_dash::format::format_bytes;
use drive_dash::store::memory::MemoryStore;

fn snapshot(id: &str, usage: f64) -> DriveSnapshot {
    let total: u64 = 500 * 1024 * 1024 * 1024;
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    let used = (total as f64 * usage / 100.0) as u64;
    DriveSnapshot {
        id: id.to_string(),
        label: format!("Drive {id}"),
        total_size: total,
        used_space: used,
        free_space: total - used,
        usage_percentage: usage,
        kind: DriveKind::Local,
    }
}

fn main() {
    let store = Arc::new(MemoryStore::new());
    let thresholds = ThresholdStore::load(store.clone(), 80.0).expect("load thresholds");
    let dismissals = DismissalLedger::load(store).expect("load dismissals");
    let mut engine = AlertEngine::new(thresholds, dismissals, 10.0);

    let backend = MemoryBackend::new(Vec::new());

    // A usage trajectory that climbs through the warning band, gets
    // dismissed, recovers, and crosses again.
    let trajectory = [60.0, 72.0, 82.0, 82.0, 65.0, 83.0];

    for (cycle, usage) in trajectory.into_iter().enumerate() {
        backend.set_drives(vec![snapshot("C", usage)]);
        let report = engine
            .poll(&backend, chrono::Utc::now())
            .expect("poll backend");

        println!("cycle {cycle}: C at {usage:.1}%");
        for id in &report.raised {
            let alert = engine
                .active()
                .iter()
                .find(|alert| &alert.id == id)
                .expect("raised alert is active");
            println!(
                "  raised {} [{}] {} free",
                alert.id,
                alert.severity,
                format_bytes(snapshot("C", usage).free_space)
            );
        }
        if report.pruned_dismissals > 0 {
            println!("  pruned {} dismissal(s)", report.pruned_dismissals);
        }

        // Simulate the user dismissing the critical alert of cycle 2.
        if cycle == 2 {
            engine.dismiss("C-82.0").expect("dismiss alert");
            println!("  dismissed C-82.0");
        }
    }

    println!("active alerts at exit: {}", engine.active().len());
}
