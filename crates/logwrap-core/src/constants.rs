//! Constants and default values for logwrap

use std::path::{Path, PathBuf};

/// Control socket file name, one per working directory
pub const CONTROL_SOCKET_FILE: &str = ".logwrap.sock";

/// Default stdout log file name
pub const DEFAULT_OUT_FILE: &str = "output.log";

/// Default stderr log file name
pub const DEFAULT_ERR_FILE: &str = "error.log";

/// Default max size of the active log file in bytes (1MB)
pub const DEFAULT_LOG_MAX_SIZE: u64 = 1024 * 1024;

/// Default max number of retained backup files
pub const DEFAULT_LOG_MAX_FILES: usize = 100;

/// Default max backup age in milliseconds (30 days)
pub const DEFAULT_LOG_MAX_AGE_MS: u64 = 30 * 24 * 60 * 60 * 1000;

/// Default maintenance interval in milliseconds (10 minutes)
pub const DEFAULT_MAINTENANCE_INTERVAL_MS: u64 = 10 * 60 * 1000;

/// Derive the control endpoint address for a working directory.
///
/// Both the listener and the client must resolve the same address from
/// the same working directory.
#[cfg(unix)]
pub fn control_socket_path(work_dir: &Path) -> PathBuf {
    work_dir.join(CONTROL_SOCKET_FILE)
}

#[cfg(windows)]
pub fn control_socket_path(work_dir: &Path) -> PathBuf {
    PathBuf::from(format!(
        r"\\.\pipe\{}\{}",
        work_dir.display(),
        CONTROL_SOCKET_FILE
    ))
}
