//! Usage-threshold alert pipeline.
//!
//! Three collaborators split the state: [`thresholds::ThresholdStore`] owns
//! the per-drive percentages, [`dismissals::DismissalLedger`] owns the
//! persisted dismissed-id set, and [`engine::AlertEngine`] owns everything
//! process-local (previous usage, live alerts) and drives the other two on
//! each poll.

pub mod dismissals;
pub mod engine;
pub mod thresholds;
pub mod types;

pub use dismissals::DismissalLedger;
pub use engine::{AlertEngine, TickReport};
pub use thresholds::{ThresholdDraft, ThresholdStore};
pub use types::{alert_id, drive_of_alert_id, Alert, Severity};
