//! Error types for logwrap

use std::path::PathBuf;

/// Logwrap error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No running instance at this working directory")]
    NotRunning,

    #[error("Another instance is already running in {0}")]
    AlreadyRunning(PathBuf),

    #[error("Failed to spawn child process: {0}")]
    SpawnFailed(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("IPC error: {0}")]
    IpcError(String),

    #[error("IPC connection failed: {0}")]
    IpcConnectionFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for logwrap
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::ConfigError(msg.into())
    }

    pub fn ipc<S: Into<String>>(msg: S) -> Self {
        Error::IpcError(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::SpawnFailed("no such file".to_string());
        assert_eq!(
            err.to_string(),
            "Failed to spawn child process: no such file"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::IoError(_)));
    }
}
