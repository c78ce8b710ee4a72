//! Elm-style cursor over a remote directory tree.
//!
//! All navigator state lives in [`DestinationNavigator`]. User actions and
//! data completions arrive as method calls; side-effects are represented as
//! [`NavCommand`] values returned to the host, which owns the timer and the
//! actual backend calls.
//!
//! **Design invariant:** no I/O happens here. Every directory listing the
//! host issues carries the [`RequestToken`] the navigator handed out; a
//! token minted before a close or a newer navigation is stale and its
//! completion is ignored, so a discarded cursor can never be mutated by a
//! late response.

use std::time::Duration;

use crate::backend::{DirEntry, DriveSnapshot, EntryKind, FileSystemItem};
use crate::core::errors::{DdsError, Result};
use crate::core::vpath;

// ──────────────────── wire types ────────────────────

/// A folder shown as a candidate destination. Files are filtered out of
/// listings before they reach this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderEntry {
    pub name: String,
    pub path: String,
    pub size: u64,
}

/// The confirmed outcome of one navigation session, handed to the external
/// move executor. The core never retries it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    pub items: Vec<FileSystemItem>,
    pub destination_drive: String,
    pub destination_base_path: String,
}

/// Correlates an in-flight directory listing with the navigation that
/// requested it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken(u64);

// ──────────────────── state & commands ────────────────────

/// Lifecycle of the cursor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NavigatorState {
    /// Fresh dialog, nothing selected yet.
    #[default]
    NoDriveSelected,
    /// A directory listing is in flight.
    Loading,
    /// A listing arrived; `loaded_folders` is current for `current_path`.
    Browsing,
    /// The last listing failed; the user recovers by reselecting.
    Error(String),
}

/// Side-effects for the host to execute.
///
/// The navigator never performs I/O or owns a timer; the host runs the
/// listing call and the debounce clock and feeds completions back through
/// [`DestinationNavigator::directory_loaded`] and
/// [`DestinationNavigator::debounce_fired`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavCommand {
    /// No side-effect.
    None,
    /// Issue a directory listing and deliver the result with this token.
    LoadDirectory { token: RequestToken, path: String },
    /// Start (or restart) the double-activation timer.
    StartDebounce(Duration),
    /// Cancel the double-activation timer if it is running.
    CancelDebounce,
    /// Execute multiple commands in order.
    Batch(Vec<Self>),
}

// ──────────────────── navigator ────────────────────

/// Stateful cursor used to pick a move destination.
///
/// Constructed fresh for each move dialog and discarded on close or
/// confirm. `current_path` is always normalized with a trailing separator
/// whenever it denotes "inside this folder".
pub struct DestinationNavigator {
    drives: Vec<DriveSnapshot>,
    items: Vec<FileSystemItem>,
    debounce: Duration,
    state: NavigatorState,
    selected_drive: Option<String>,
    current_path: String,
    loaded_folders: Vec<FolderEntry>,
    /// Path of the entry whose debounce timer is running, if any.
    pending_activation: Option<String>,
    /// Bumped on every navigation and on close; listings carrying an older
    /// token are discarded on arrival.
    generation: u64,
    closed: bool,
}

impl DestinationNavigator {
    #[must_use]
    pub fn new(drives: Vec<DriveSnapshot>, items: Vec<FileSystemItem>, debounce: Duration) -> Self {
        Self {
            drives,
            items,
            debounce,
            state: NavigatorState::NoDriveSelected,
            selected_drive: None,
            current_path: String::new(),
            loaded_folders: Vec::new(),
            pending_activation: None,
            generation: 0,
            closed: false,
        }
    }

    #[must_use]
    pub fn state(&self) -> &NavigatorState {
        &self.state
    }

    #[must_use]
    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    #[must_use]
    pub fn loaded_folders(&self) -> &[FolderEntry] {
        &self.loaded_folders
    }

    /// Breadcrumb segments of the current path.
    #[must_use]
    pub fn breadcrumbs(&self) -> Vec<&str> {
        vpath::segments(&self.current_path)
    }

    // ── navigation actions ──

    /// Pick a destination drive: resets the path to the drive root and
    /// issues a listing for it.
    pub fn select_drive(&mut self, drive_id: &str) -> NavCommand {
        self.selected_drive = Some(drive_id.to_string());
        self.current_path = vpath::with_trailing_sep(drive_id);
        self.navigate_to(self.current_path.clone())
    }

    /// One activation of a listed folder.
    ///
    /// The first activation optimistically sets `current_path` to the
    /// folder and starts the debounce timer; nothing reloads. A second
    /// activation on the same entry before the timer fires cancels it and
    /// descends, issuing exactly one listing. An activation on a different
    /// entry while a timer runs restarts the debounce for the new entry.
    pub fn activate_folder(&mut self, entry: &FolderEntry) -> NavCommand {
        let path = vpath::with_trailing_sep(&vpath::normalize(&entry.path));
        if self.pending_activation.as_deref() == Some(path.as_str()) {
            self.pending_activation = None;
            let load = self.navigate_to(path);
            return batch(NavCommand::CancelDebounce, load);
        }
        let restarting = self.pending_activation.is_some();
        self.pending_activation = Some(path.clone());
        self.current_path = path;
        let start = NavCommand::StartDebounce(self.debounce);
        if restarting {
            batch(NavCommand::CancelDebounce, start)
        } else {
            start
        }
    }

    /// The debounce timer elapsed without a second activation. The path was
    /// already set by the first activation, so nothing further happens.
    pub fn debounce_fired(&mut self) -> NavCommand {
        self.pending_activation = None;
        NavCommand::None
    }

    /// Jump to breadcrumb `index`: keeps the first `index + 1` segments.
    pub fn go_to_breadcrumb(&mut self, index: usize) -> NavCommand {
        let target = vpath::truncate_to_segments(&self.current_path, index + 1);
        self.navigate_to(target)
    }

    /// Pop the last path segment. A drive root has no parent, so fewer than
    /// two segments means no-op.
    pub fn go_to_parent(&mut self) -> NavCommand {
        let count = vpath::segments(&self.current_path).len();
        if count < 2 {
            return NavCommand::None;
        }
        let target = vpath::truncate_to_segments(&self.current_path, count - 1);
        self.navigate_to(target)
    }

    fn navigate_to(&mut self, path: String) -> NavCommand {
        self.current_path = path.clone();
        self.pending_activation = None;
        self.state = NavigatorState::Loading;
        self.generation += 1;
        NavCommand::LoadDirectory {
            token: RequestToken(self.generation),
            path,
        }
    }

    // ── completions ──

    /// A directory listing finished. Stale tokens (superseded navigation or
    /// a closed dialog) are ignored entirely.
    pub fn directory_loaded(&mut self, token: RequestToken, result: Result<Vec<DirEntry>>) {
        if self.closed || token.0 != self.generation {
            return;
        }
        match result {
            Ok(entries) => {
                self.loaded_folders = entries
                    .into_iter()
                    .filter(|entry| entry.kind == EntryKind::Folder)
                    .map(|entry| FolderEntry {
                        path: vpath::join(self.current_path.trim_end_matches('/'), &entry.name),
                        name: entry.name,
                        size: entry.size,
                    })
                    .collect();
                self.state = NavigatorState::Browsing;
            }
            Err(err) => {
                self.loaded_folders.clear();
                self.state = NavigatorState::Error(err.to_string());
            }
        }
    }

    /// Close the dialog: cancels any pending debounce and invalidates every
    /// in-flight listing.
    pub fn close(&mut self) -> NavCommand {
        self.closed = true;
        self.generation += 1;
        let had_timer = self.pending_activation.take().is_some();
        if had_timer {
            NavCommand::CancelDebounce
        } else {
            NavCommand::None
        }
    }

    // ── confirmation ──

    /// Whether the current destination is acceptable: a drive is selected,
    /// a path is set, the drive has room for every item, and the
    /// destination is not the current location of any item.
    #[must_use]
    pub fn can_confirm(&self) -> bool {
        let Some(drive) = self.destination_drive() else {
            return false;
        };
        if self.current_path.is_empty() {
            return false;
        }
        let total: u64 = self.items.iter().map(|item| item.size).sum();
        if drive.free_space < total {
            return false;
        }
        !self
            .items
            .iter()
            .any(|item| vpath::same_location(&item.path, &self.current_path))
    }

    /// Build the move request. Fails with a precondition error instead of
    /// panicking when called while [`can_confirm`](Self::can_confirm) is
    /// false; no remote call is made in that case.
    pub fn confirm(&self) -> Result<MoveRequest> {
        let Some(drive_id) = self.selected_drive.clone() else {
            return Err(DdsError::Precondition {
                details: "no destination drive selected".to_string(),
            });
        };
        if !self.can_confirm() {
            return Err(DdsError::Precondition {
                details: format!("destination {:?} is not confirmable", self.current_path),
            });
        }
        let base = vpath::with_trailing_sep(&vpath::normalize(&self.current_path));
        Ok(MoveRequest {
            items: self.items.clone(),
            destination_drive: drive_id,
            destination_base_path: base,
        })
    }

    fn destination_drive(&self) -> Option<&DriveSnapshot> {
        let id = self.selected_drive.as_deref()?;
        self.drives.iter().find(|drive| drive.id == id)
    }
}

/// Collapse a command pair, dropping `None` halves.
fn batch(first: NavCommand, second: NavCommand) -> NavCommand {
    match (first, second) {
        (NavCommand::None, cmd) | (cmd, NavCommand::None) => cmd,
        (first, second) => NavCommand::Batch(vec![first, second]),
    }
}
