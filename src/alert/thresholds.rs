//! Per-drive alert thresholds with staged editing and atomic commit.
//!
//! Thresholds live under the `usageThresholds` key as a JSON object
//! (driveId → percentage). A drive with no entry uses the configured
//! default. Edits are staged on a [`ThresholdDraft`] and only land on the
//! persisted mapping through [`ThresholdStore::commit`] — one invalid field
//! blocks the whole commit, so a partial threshold state never persists.
//!
//! Load errors fall back to an empty mapping (never panic, never block
//! startup); the next successful persist rewrites the key.

use std::collections::BTreeMap;

use crate::core::errors::{DdsError, Result};
use crate::store::{warn_corrupt_key, KEY_USAGE_THRESHOLDS, SharedStore};

/// Owner of the persisted threshold mapping.
pub struct ThresholdStore {
    store: SharedStore,
    default_pct: f64,
    values: BTreeMap<String, f64>,
}

/// Staged, uncommitted copy of the threshold mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThresholdDraft {
    values: BTreeMap<String, f64>,
}

impl ThresholdDraft {
    /// Stage a new value for one drive without persisting anything.
    pub fn stage(&mut self, drive_id: &str, value: f64) {
        self.values.insert(drive_id.to_string(), value);
    }

    /// Currently staged value for a drive, if any.
    #[must_use]
    pub fn get(&self, drive_id: &str) -> Option<f64> {
        self.values.get(drive_id).copied()
    }
}

impl ThresholdStore {
    /// Load the persisted mapping, tolerating an absent or corrupt key.
    pub fn load(store: SharedStore, default_pct: f64) -> Result<Self> {
        let values = match store.get(KEY_USAGE_THRESHOLDS)? {
            Some(raw) => match serde_json::from_str::<BTreeMap<String, f64>>(&raw) {
                Ok(parsed) => parsed,
                Err(err) => {
                    warn_corrupt_key(KEY_USAGE_THRESHOLDS, &err);
                    BTreeMap::new()
                }
            },
            None => BTreeMap::new(),
        };
        Ok(Self {
            store,
            default_pct,
            values,
        })
    }

    /// Effective threshold for a drive: stored value or the default.
    #[must_use]
    pub fn get(&self, drive_id: &str) -> f64 {
        self.values
            .get(drive_id)
            .copied()
            .unwrap_or(self.default_pct)
    }

    /// Insert the default for every drive not yet present. Persists only
    /// when at least one insertion happened, to avoid redundant writes.
    pub fn ensure_defaults<'a, I>(&mut self, drive_ids: I) -> Result<bool>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut changed = false;
        for id in drive_ids {
            if !self.values.contains_key(id) {
                self.values.insert(id.to_string(), self.default_pct);
                changed = true;
            }
        }
        if changed {
            self.persist()?;
        }
        Ok(changed)
    }

    /// Begin an editing session: the draft starts from the current mapping.
    #[must_use]
    pub fn draft(&self) -> ThresholdDraft {
        ThresholdDraft {
            values: self.values.clone(),
        }
    }

    /// Atomically replace the mapping with a validated draft.
    ///
    /// Fails with `InvalidThreshold` on the first value outside `[0, 100]`
    /// or not a number; the persisted mapping is left untouched in that case.
    pub fn commit(&mut self, draft: ThresholdDraft) -> Result<()> {
        for (drive, value) in &draft.values {
            if !value.is_finite() || !(0.0..=100.0).contains(value) {
                return Err(DdsError::InvalidThreshold {
                    drive: drive.clone(),
                    value: *value,
                });
            }
        }
        self.values = draft.values;
        self.persist()
    }

    /// Read-only view over all stored thresholds.
    #[must_use]
    pub fn entries(&self) -> &BTreeMap<String, f64> {
        &self.values
    }

    fn persist(&self) -> Result<()> {
        let raw = serde_json::to_string(&self.values)?;
        self.store.set(KEY_USAGE_THRESHOLDS, &raw)
    }
}
