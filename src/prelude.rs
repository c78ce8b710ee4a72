//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use drive_dash::prelude::*;
//! ```

// Core
pub use crate::core::config::{Config, StoreBackend};
pub use crate::core::errors::{DdsError, Result};

// Backend
pub use crate::backend::{
    DirEntry, DriveKind, DriveSnapshot, EntryKind, FileSystemItem, StorageBackend,
};
pub use crate::platform::detect_backend;

// Alerts
pub use crate::alert::{Alert, AlertEngine, DismissalLedger, Severity, ThresholdStore, TickReport};

// Navigation
pub use crate::navigator::{
    DestinationNavigator, FolderEntry, MoveRequest, NavCommand, NavigatorState,
};

// Persistence
pub use crate::store::file::JsonFileStore;
pub use crate::store::memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use crate::store::sqlite::SqliteStore;
pub use crate::store::{KeyValueStore, SharedStore};
