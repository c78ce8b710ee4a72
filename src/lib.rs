#![forbid(unsafe_code)]

//! Drive Dash (ddash) — core engine for a storage-monitoring dashboard.
//!
//! Two pieces carry the real logic:
//! 1. **Alert engine** — detects when a drive's usage crosses a configurable
//!    danger band over successive polls, dedupes and dismisses alerts, and
//!    persists thresholds and dismissal history
//! 2. **Destination navigator** — a virtual-filesystem cursor used to pick a
//!    move target: path normalization, breadcrumb/parent navigation,
//!    single-vs-double-activation disambiguation, capacity validation
//!
//! Everything else (the storage backend, the key-value store, the CLI) is a
//! pluggable collaborator behind a trait.
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use drive_dash::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use drive_dash::core::config::Config;
//! use drive_dash::alert::engine::AlertEngine;
//! ```

pub mod prelude;

pub mod alert;
pub mod backend;
pub mod core;
pub mod format;
pub mod navigator;
pub mod notify;
pub mod platform;
pub mod store;
