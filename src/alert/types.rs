//! Alert entity and the deterministic alert-identity rule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Alert severity. `Critical` when usage is at or above the drive's
/// threshold, `Warning` when it is inside the hysteresis band below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// A raised usage alert. Process-local: only the dismissal ids survive a
/// restart, through the [`DismissalLedger`](super::dismissals::DismissalLedger).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub drive_id: String,
    pub drive_name: String,
    pub usage_percentage: f64,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub threshold: f64,
}

/// Deterministic alert identity: drive id plus the usage percentage rounded
/// to one decimal.
///
/// Known limitation: two distinct crossings that land on the same rounded
/// percentage collide and are treated as one alert.
#[must_use]
pub fn alert_id(drive_id: &str, usage_percentage: f64) -> String {
    format!("{drive_id}-{usage_percentage:.1}")
}

/// Recover the drive id from an alert id.
///
/// The percentage suffix never contains `-`, so splitting at the last dash is
/// correct even for drive ids that contain dashes themselves.
#[must_use]
pub fn drive_of_alert_id(alert_id: &str) -> Option<&str> {
    alert_id.rsplit_once('-').map(|(drive, _)| drive)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_rounds_to_one_decimal() {
        assert_eq!(alert_id("C", 82.04), "C-82.0");
        assert_eq!(alert_id("C", 82.05), "C-82.1");
        assert_eq!(alert_id("C", 82.0), "C-82.0");
    }

    #[test]
    fn identity_collides_on_equal_rounding() {
        // Accepted quirk: same rounded value, same alert.
        assert_eq!(alert_id("C", 82.01), alert_id("C", 81.96));
    }

    #[test]
    fn drive_recovery_handles_dashed_ids() {
        assert_eq!(drive_of_alert_id("C-82.0"), Some("C"));
        assert_eq!(drive_of_alert_id("usb-backup-91.5"), Some("usb-backup"));
        assert_eq!(drive_of_alert_id("nodash"), None);
    }

    #[test]
    fn severity_orders_warning_below_critical() {
        assert!(Severity::Warning < Severity::Critical);
    }
}
