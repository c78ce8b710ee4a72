//! Persisted dismissal ledger with hysteresis-based self-pruning.
//!
//! Dismissed alert ids live under the `dismissedAlerts` key as a JSON array.
//! The ledger's only pruning rule runs on every poll: an id is dropped once
//! its drive's usage has fallen below `threshold − hysteresis` (the drive
//! recovered) or the drive is no longer present in the snapshot set
//! (recovered by absence). That rule is what keeps the ledger bounded.

use std::collections::BTreeSet;

use crate::backend::DriveSnapshot;
use crate::core::errors::Result;
use crate::store::{warn_corrupt_key, KEY_DISMISSED_ALERTS, SharedStore};

use super::thresholds::ThresholdStore;
use super::types::drive_of_alert_id;

/// Owner of the persisted dismissed-alert id set.
pub struct DismissalLedger {
    store: SharedStore,
    ids: BTreeSet<String>,
}

impl DismissalLedger {
    /// Load the persisted set, tolerating an absent or corrupt key.
    pub fn load(store: SharedStore) -> Result<Self> {
        let ids = match store.get(KEY_DISMISSED_ALERTS)? {
            Some(raw) => match serde_json::from_str::<BTreeSet<String>>(&raw) {
                Ok(parsed) => parsed,
                Err(err) => {
                    warn_corrupt_key(KEY_DISMISSED_ALERTS, &err);
                    BTreeSet::new()
                }
            },
            None => BTreeSet::new(),
        };
        Ok(Self { store, ids })
    }

    /// Whether an alert id has been dismissed by the user.
    #[must_use]
    pub fn is_dismissed(&self, alert_id: &str) -> bool {
        self.ids.contains(alert_id)
    }

    /// Record a dismissal and persist the set.
    pub fn dismiss(&mut self, alert_id: &str) -> Result<()> {
        if self.ids.insert(alert_id.to_string()) {
            self.persist()?;
        }
        Ok(())
    }

    /// Drop ids whose drive has recovered. Returns how many were pruned;
    /// persists only when the set changed.
    pub fn reconcile(
        &mut self,
        snapshots: &[DriveSnapshot],
        thresholds: &ThresholdStore,
        hysteresis_pct: f64,
    ) -> Result<usize> {
        let before = self.ids.len();
        self.ids.retain(|id| {
            let Some(drive_id) = drive_of_alert_id(id) else {
                // Malformed id: treat as recovered so it cannot pin the
                // ledger forever.
                return false;
            };
            snapshots
                .iter()
                .find(|snapshot| snapshot.id == drive_id)
                .is_some_and(|snapshot| {
                    snapshot.usage_percentage >= thresholds.get(drive_id) - hysteresis_pct
                })
        });
        let pruned = before - self.ids.len();
        if pruned > 0 {
            self.persist()?;
        }
        Ok(pruned)
    }

    /// Number of dismissed ids currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the ledger is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn persist(&self) -> Result<()> {
        let raw = serde_json::to_string(&self.ids)?;
        self.store.set(KEY_DISMISSED_ALERTS, &raw)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backend::DriveKind;
    use crate::store::memory::MemoryStore;
    use crate::store::KeyValueStore;

    fn snapshot(id: &str, usage: f64) -> DriveSnapshot {
        DriveSnapshot {
            id: id.to_string(),
            label: format!("Drive {id}"),
            total_size: 1000,
            used_space: 0,
            free_space: 1000,
            usage_percentage: usage,
            kind: DriveKind::Local,
        }
    }

    fn fixture() -> (Arc<MemoryStore>, ThresholdStore, DismissalLedger) {
        let store = Arc::new(MemoryStore::new());
        let thresholds = ThresholdStore::load(store.clone(), 80.0).unwrap();
        let ledger = DismissalLedger::load(store.clone()).unwrap();
        (store, thresholds, ledger)
    }

    #[test]
    fn dismiss_persists_and_is_idempotent() {
        let (store, _thresholds, mut ledger) = fixture();
        ledger.dismiss("C-82.0").unwrap();
        assert!(ledger.is_dismissed("C-82.0"));
        assert_eq!(store.write_count(), 1);
        ledger.dismiss("C-82.0").unwrap();
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn reconcile_keeps_ids_inside_the_band() {
        let (_store, thresholds, mut ledger) = fixture();
        ledger.dismiss("C-82.0").unwrap();
        // 75 >= 80 - 10, still inside the band: dismissal stays.
        let pruned = ledger
            .reconcile(&[snapshot("C", 75.0)], &thresholds, 10.0)
            .unwrap();
        assert_eq!(pruned, 0);
        assert!(ledger.is_dismissed("C-82.0"));
    }

    #[test]
    fn reconcile_prunes_recovered_drive() {
        let (_store, thresholds, mut ledger) = fixture();
        ledger.dismiss("C-82.0").unwrap();
        let pruned = ledger
            .reconcile(&[snapshot("C", 65.0)], &thresholds, 10.0)
            .unwrap();
        assert_eq!(pruned, 1);
        assert!(!ledger.is_dismissed("C-82.0"));
    }

    #[test]
    fn reconcile_prunes_absent_drive() {
        let (_store, thresholds, mut ledger) = fixture();
        ledger.dismiss("D-91.0").unwrap();
        let pruned = ledger.reconcile(&[snapshot("C", 85.0)], &thresholds, 10.0).unwrap();
        assert_eq!(pruned, 1);
        assert!(ledger.is_empty());
    }

    #[test]
    fn reconcile_resolves_dashed_drive_ids() {
        let (_store, mut thresholds, mut ledger) = fixture();
        thresholds.ensure_defaults(["usb-backup"]).unwrap();
        ledger.dismiss("usb-backup-91.5").unwrap();
        // Drive present and above the band: the id must survive, which only
        // works if the id parser splits at the last dash.
        let pruned = ledger
            .reconcile(&[snapshot("usb-backup", 92.0)], &thresholds, 10.0)
            .unwrap();
        assert_eq!(pruned, 0);
        assert!(ledger.is_dismissed("usb-backup-91.5"));
    }

    #[test]
    fn reconcile_without_changes_skips_persist() {
        let (store, thresholds, mut ledger) = fixture();
        ledger.dismiss("C-82.0").unwrap();
        let writes_before = store.write_count();
        ledger
            .reconcile(&[snapshot("C", 85.0)], &thresholds, 10.0)
            .unwrap();
        assert_eq!(store.write_count(), writes_before);
    }

    #[test]
    fn ledger_survives_reload() {
        let store = Arc::new(MemoryStore::new());
        {
            let mut ledger = DismissalLedger::load(store.clone()).unwrap();
            ledger.dismiss("C-82.0").unwrap();
        }
        let ledger = DismissalLedger::load(store).unwrap();
        assert!(ledger.is_dismissed("C-82.0"));
    }

    #[test]
    fn corrupt_persisted_set_falls_back_to_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set(KEY_DISMISSED_ALERTS, "{broken").unwrap();
        let ledger = DismissalLedger::load(store).unwrap();
        assert!(ledger.is_empty());
    }
}
