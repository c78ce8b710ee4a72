//! Core types: errors, configuration, virtual-path utilities.

pub mod config;
pub mod errors;
pub mod vpath;
