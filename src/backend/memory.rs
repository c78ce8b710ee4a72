//! In-memory storage backend for deterministic tests and demos.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::core::errors::{DdsError, Result};
use crate::core::vpath;

use super::{DirEntry, DriveSnapshot, EntryKind, StorageBackend};

/// Scripted backend: a fixed drive list plus a directory tree keyed by
/// normalized folder path (trailing separator included, e.g. `"C/docs/"`).
///
/// Failure injection mirrors how the remote service fails: a flagged drive
/// listing fails once, a listed path can be marked permanently unreachable.
#[derive(Default)]
pub struct MemoryBackend {
    drives: RwLock<Vec<DriveSnapshot>>,
    directories: RwLock<HashMap<String, Vec<DirEntry>>>,
    unreachable_paths: RwLock<Vec<String>>,
    fail_next_drive_listing: RwLock<bool>,
    list_directory_calls: AtomicUsize,
    list_drives_calls: AtomicUsize,
}

impl MemoryBackend {
    #[must_use]
    pub fn new(drives: Vec<DriveSnapshot>) -> Self {
        Self {
            drives: RwLock::new(drives),
            ..Self::default()
        }
    }

    /// Replace the drive list, simulating usage changing between polls.
    pub fn set_drives(&self, drives: Vec<DriveSnapshot>) {
        *self.drives.write() = drives;
    }

    /// Register the entries of a folder path.
    pub fn insert_directory(&self, path: &str, entries: Vec<DirEntry>) {
        let key = vpath::with_trailing_sep(&vpath::normalize(path));
        self.directories.write().insert(key, entries);
    }

    /// Make the next `list_drives` call fail with a transport error.
    pub fn fail_next_drive_listing(&self) {
        *self.fail_next_drive_listing.write() = true;
    }

    /// Make every listing of `path` fail with a transport error.
    pub fn mark_unreachable(&self, path: &str) {
        self.unreachable_paths
            .write()
            .push(vpath::with_trailing_sep(&vpath::normalize(path)));
    }

    /// Number of `list_directory` calls served or failed so far.
    pub fn directory_listing_count(&self) -> usize {
        self.list_directory_calls.load(Ordering::SeqCst)
    }

    /// Number of `list_drives` calls served or failed so far.
    pub fn drive_listing_count(&self) -> usize {
        self.list_drives_calls.load(Ordering::SeqCst)
    }

    fn lookup(&self, path: &str) -> Result<Vec<DirEntry>> {
        let key = vpath::with_trailing_sep(&vpath::normalize(path));
        if self.unreachable_paths.read().contains(&key) {
            return Err(DdsError::transport(
                "list_directory",
                format!("simulated outage for {key}"),
            ));
        }
        self.directories
            .read()
            .get(&key)
            .cloned()
            .ok_or(DdsError::NotFound { path: key })
    }
}

impl StorageBackend for MemoryBackend {
    fn list_drives(&self) -> Result<Vec<DriveSnapshot>> {
        self.list_drives_calls.fetch_add(1, Ordering::SeqCst);
        let mut fail = self.fail_next_drive_listing.write();
        if *fail {
            *fail = false;
            return Err(DdsError::transport("list_drives", "simulated outage"));
        }
        Ok(self.drives.read().clone())
    }

    fn list_directory(&self, path: &str) -> Result<Vec<DirEntry>> {
        self.list_directory_calls.fetch_add(1, Ordering::SeqCst);
        self.lookup(path)
    }

    fn move_item(&self, source: &str, destination: &str) -> Result<bool> {
        // Moves only relocate the listing entry; nested listings are not
        // rewritten, which is enough for the dialog-level tests.
        let source_norm = vpath::normalize(source).trim_end_matches('/').to_string();
        let parent_key = match source_norm.rfind('/') {
            Some(idx) => vpath::with_trailing_sep(&source_norm[..idx]),
            None => return Ok(false),
        };
        let name = source_norm[parent_key.len()..].to_string();
        let mut directories = self.directories.write();
        let Some(entries) = directories.get_mut(&parent_key) else {
            return Err(DdsError::NotFound { path: parent_key });
        };
        let Some(pos) = entries.iter().position(|entry| entry.name == name) else {
            return Ok(false);
        };
        let moved = entries.remove(pos);
        let dest_key = vpath::with_trailing_sep(&vpath::normalize(destination));
        directories.entry(dest_key).or_default().push(moved);
        Ok(true)
    }

    fn delete_item(&self, path: &str) -> Result<bool> {
        let norm = vpath::normalize(path).trim_end_matches('/').to_string();
        let Some(idx) = norm.rfind('/') else {
            return Ok(false);
        };
        let parent_key = vpath::with_trailing_sep(&norm[..idx]);
        let name = &norm[idx + 1..];
        let mut directories = self.directories.write();
        let Some(entries) = directories.get_mut(&parent_key) else {
            return Err(DdsError::NotFound { path: parent_key });
        };
        let before = entries.len();
        entries.retain(|entry| entry.name != name);
        Ok(entries.len() < before)
    }

    fn zip_folder(&self, path: &str) -> Result<String> {
        let norm = vpath::normalize(path);
        let trimmed = norm.trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(DdsError::NotFound { path: norm });
        }
        Ok(format!("{trimmed}.zip"))
    }

    fn download_item(&self, path: &str) -> Result<Vec<u8>> {
        // Content is irrelevant to the core; return the path as bytes so
        // callers can assert which item was fetched.
        Ok(vpath::normalize(path).into_bytes())
    }
}
