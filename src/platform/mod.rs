//! Host-filesystem backend.
//!
//! The dashboard core is backend-agnostic; this module supplies the one
//! concrete [`StorageBackend`] that serves the local machine, mapping each
//! real mount point to a logical drive and virtual paths such as
//! `"root/var/log/"` onto the mounted tree.

use std::sync::Arc;

use crate::backend::StorageBackend;
#[cfg(not(unix))]
use crate::core::errors::DdsError;
use crate::core::errors::Result;

#[cfg(unix)]
pub mod local;

/// Pick the backend implementation for the current host.
pub fn detect_backend() -> Result<Arc<dyn StorageBackend>> {
    #[cfg(unix)]
    {
        Ok(Arc::new(local::LocalBackend::new()?))
    }
    #[cfg(not(unix))]
    {
        Err(DdsError::UnsupportedPlatform {
            details: "only unix hosts are currently implemented".to_string(),
        })
    }
}
