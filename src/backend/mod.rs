//! Storage-backend collaborator contract and snapshot types.
//!
//! The dashboard core never speaks HTTP itself; it drives a [`StorageBackend`]
//! implementation. Snapshot types serialize with the dashboard's camelCase
//! wire names so a JSON transport can map them directly.

use serde::{Deserialize, Serialize};

use crate::core::errors::Result;

pub mod memory;

/// Kind of logical drive reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriveKind {
    Local,
    Removable,
    Network,
}

/// Point-in-time usage snapshot of a logical drive.
///
/// Snapshots are superseded wholesale on every poll; there are no partial
/// updates and no identity beyond `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveSnapshot {
    pub id: String,
    pub label: String,
    pub total_size: u64,
    pub used_space: u64,
    pub free_space: u64,
    pub usage_percentage: f64,
    #[serde(rename = "type")]
    pub kind: DriveKind,
}

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Folder,
}

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

/// A file or folder selected for a move operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSystemItem {
    pub name: String,
    pub path: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

/// Remote storage service the dashboard talks to.
///
/// Every call is a suspension point for the single-threaded core: it runs to
/// completion or fails with a transport-level error. Implementations must not
/// retry internally; retry policy belongs to the caller (the poll loop
/// retries unconditionally on its next tick).
pub trait StorageBackend: Send + Sync {
    /// List all logical drives with current usage.
    fn list_drives(&self) -> Result<Vec<DriveSnapshot>>;

    /// List the entries of a directory given a virtual path such as
    /// `"C/docs/"`.
    fn list_directory(&self, path: &str) -> Result<Vec<DirEntry>>;

    /// Move a single item. Returns `true` when the backend reports success.
    fn move_item(&self, source: &str, destination: &str) -> Result<bool>;

    /// Delete a single item.
    fn delete_item(&self, path: &str) -> Result<bool>;

    /// Archive a folder in place; returns the virtual path of the archive.
    fn zip_folder(&self, path: &str) -> Result<String>;

    /// Fetch the raw bytes of a file.
    fn download_item(&self, path: &str) -> Result<Vec<u8>>;
}

impl DriveSnapshot {
    /// Usage percentage recomputed from raw byte counters.
    ///
    /// Backends normally report `usage_percentage` directly; this is the
    /// fallback for backends that only know byte totals.
    #[must_use]
    pub fn usage_from_bytes(total_size: u64, used_space: u64) -> f64 {
        if total_size == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        {
            (used_space as f64 * 100.0) / total_size as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_uses_dashboard_wire_names() {
        let snapshot = DriveSnapshot {
            id: "C".to_string(),
            label: "Local Disk (C:)".to_string(),
            total_size: 1000,
            used_space: 820,
            free_space: 180,
            usage_percentage: 82.0,
            kind: DriveKind::Local,
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["totalSize"], 1000);
        assert_eq!(json["usedSpace"], 820);
        assert_eq!(json["freeSpace"], 180);
        assert_eq!(json["usagePercentage"], 82.0);
        assert_eq!(json["type"], "local");
    }

    #[test]
    fn dir_entry_kind_round_trips() {
        let entry = DirEntry {
            name: "docs".to_string(),
            size: 0,
            kind: EntryKind::Folder,
        };
        let json = serde_json::to_string(&entry).unwrap();
        let parsed: DirEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.kind, EntryKind::Folder);
    }

    #[test]
    fn usage_from_bytes_handles_zero_total() {
        assert!(DriveSnapshot::usage_from_bytes(0, 0).abs() < f64::EPSILON);
        assert!((DriveSnapshot::usage_from_bytes(200, 50) - 25.0).abs() < f64::EPSILON);
    }
}
