//! Log rotation policy

use std::time::Duration;

use crate::constants;

/// Rotation policy for one log stream.
///
/// Owned by the stream; the control endpoint mutates it through the
/// stream's setters, never directly.
#[derive(Debug, Clone)]
pub struct RotationPolicy {
    /// Maximum size of the active file in bytes; a write that would push
    /// past this triggers rotation first
    pub max_size_bytes: u64,
    /// Maximum lifetime of a backup file since creation
    pub max_age: Duration,
    /// Maximum number of backup files retained per stream
    pub max_files: usize,
    /// Gzip rotated backups
    pub compress: bool,
    /// Period of the maintenance pass (rollover check, expiry, eviction)
    pub maintenance_interval: Duration,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_size_bytes: constants::DEFAULT_LOG_MAX_SIZE,
            max_age: Duration::from_millis(constants::DEFAULT_LOG_MAX_AGE_MS),
            max_files: constants::DEFAULT_LOG_MAX_FILES,
            compress: false,
            maintenance_interval: Duration::from_millis(
                constants::DEFAULT_MAINTENANCE_INTERVAL_MS,
            ),
        }
    }
}
