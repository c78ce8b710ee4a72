//! Crossing detection over successive drive snapshots.
//!
//! The engine owns everything that survives between polls: the previous
//! usage map, the live alert list, and the two persisted collaborators
//! ([`ThresholdStore`], [`DismissalLedger`]). Each poll runs to completion
//! before the next one is dispatched; an overlapping poll is dropped by the
//! caller, never interleaved.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::backend::{DriveSnapshot, StorageBackend};
use crate::core::errors::Result;

use super::dismissals::DismissalLedger;
use super::thresholds::ThresholdStore;
use super::types::{alert_id, Alert, Severity};

/// Outcome of one poll cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// Ids of alerts raised this cycle, in drive order.
    pub raised: Vec<String>,
    /// Drives whose usage crossed the warning boundary this cycle.
    pub warning_crossings: Vec<String>,
    /// Drives whose usage crossed the critical boundary this cycle.
    pub critical_crossings: Vec<String>,
    /// Dismissal ids dropped because their drive recovered.
    pub pruned_dismissals: usize,
}

/// Stateful alert engine fed by periodic drive snapshots.
pub struct AlertEngine {
    thresholds: ThresholdStore,
    dismissals: DismissalLedger,
    hysteresis_pct: f64,
    previous_usage: HashMap<String, f64>,
    active: Vec<Alert>,
}

impl AlertEngine {
    #[must_use]
    pub fn new(
        thresholds: ThresholdStore,
        dismissals: DismissalLedger,
        hysteresis_pct: f64,
    ) -> Self {
        Self {
            thresholds,
            dismissals,
            hysteresis_pct,
            previous_usage: HashMap::new(),
            active: Vec::new(),
        }
    }

    /// Fetch a snapshot set from the backend and feed it through
    /// [`observe`](Self::observe).
    ///
    /// A failed fetch leaves all engine state untouched; the caller retries
    /// on its next tick with no backoff.
    pub fn poll(&mut self, backend: &dyn StorageBackend, now: DateTime<Utc>) -> Result<TickReport> {
        let snapshots = backend.list_drives()?;
        self.observe(&snapshots, now)
    }

    /// Process one snapshot set: reconcile persisted state, detect
    /// crossings, then replace the previous-usage map wholesale.
    pub fn observe(
        &mut self,
        snapshots: &[DriveSnapshot],
        now: DateTime<Utc>,
    ) -> Result<TickReport> {
        self.thresholds
            .ensure_defaults(snapshots.iter().map(|s| s.id.as_str()))?;
        let pruned = self
            .dismissals
            .reconcile(snapshots, &self.thresholds, self.hysteresis_pct)?;

        let mut report = TickReport {
            pruned_dismissals: pruned,
            ..TickReport::default()
        };

        for snapshot in snapshots {
            let threshold = self.thresholds.get(&snapshot.id);
            let prev = self
                .previous_usage
                .get(&snapshot.id)
                .copied()
                .unwrap_or(0.0);
            let curr = snapshot.usage_percentage;

            let crosses_warning =
                prev < threshold - self.hysteresis_pct && curr >= threshold - self.hysteresis_pct;
            let crosses_critical = prev < threshold && curr >= threshold;
            if crosses_warning {
                report.warning_crossings.push(snapshot.id.clone());
            }
            if crosses_critical {
                report.critical_crossings.push(snapshot.id.clone());
            }
            if !(crosses_warning || crosses_critical) {
                continue;
            }

            let id = alert_id(&snapshot.id, curr);
            if self.dismissals.is_dismissed(&id) {
                continue;
            }
            if self.active.iter().any(|alert| alert.id == id) {
                continue;
            }
            let severity = if curr >= threshold {
                Severity::Critical
            } else {
                Severity::Warning
            };
            self.active.push(Alert {
                id: id.clone(),
                drive_id: snapshot.id.clone(),
                drive_name: snapshot.label.clone(),
                usage_percentage: curr,
                severity,
                timestamp: now,
                threshold,
            });
            report.raised.push(id);
        }

        self.previous_usage = snapshots
            .iter()
            .map(|s| (s.id.clone(), s.usage_percentage))
            .collect();
        Ok(report)
    }

    /// Dismiss an active alert: removes it from the live list and records
    /// the id so it stays suppressed until the drive recovers.
    pub fn dismiss(&mut self, alert_id: &str) -> Result<()> {
        self.dismissals.dismiss(alert_id)?;
        self.active.retain(|alert| alert.id != alert_id);
        Ok(())
    }

    /// Live alerts, never auto-expired by time.
    #[must_use]
    pub fn active(&self) -> &[Alert] {
        &self.active
    }

    /// Threshold collaborator, for the editing surface.
    #[must_use]
    pub fn thresholds(&self) -> &ThresholdStore {
        &self.thresholds
    }

    /// Mutable threshold collaborator, for committing drafts.
    pub fn thresholds_mut(&mut self) -> &mut ThresholdStore {
        &mut self.thresholds
    }
}
