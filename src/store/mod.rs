//! Flat string-keyed persistence used by thresholds and dismissals.
//!
//! The dashboard persists two keys (the browser build used local storage).
//! Each key is independently owned; there are no cross-key transactions, so a
//! crash between two writes can leave the keys mutually inconsistent; this
//! layer does not try to fix that.

use std::fmt;
use std::sync::Arc;

use crate::core::errors::Result;

pub mod file;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

/// Persisted key holding the per-drive threshold mapping (JSON object).
pub const KEY_USAGE_THRESHOLDS: &str = "usageThresholds";

/// Persisted key holding dismissed alert ids (JSON array).
pub const KEY_DISMISSED_ALERTS: &str = "dismissedAlerts";

/// Flat string-keyed store with get/set/remove.
///
/// Durability contract: a completed `set` survives a process restart. Nothing
/// stronger is modeled.
pub trait KeyValueStore: Send + Sync {
    /// Read a key; `None` when absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a key, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key; absent keys are not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Shared store handle as held by the alert components.
pub type SharedStore = Arc<dyn KeyValueStore>;

/// Report a corrupt persisted value that a loader is about to discard.
/// Loaders recover with an empty value, so this stderr line is the only
/// trace the bad data leaves.
pub(crate) fn warn_corrupt_key(key: &str, err: &dyn fmt::Display) {
    eprintln!("[DDS-STORE] warning: discarding corrupt {key}: {err}");
}
