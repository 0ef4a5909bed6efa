//! Control client - one request, one response, then close

use logwrap_core::{constants, Error, Result};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tracing::debug;

use crate::protocol::{Request, Response};

/// Control client for a second invocation targeting a running instance
pub struct ControlClient {
    socket_path: PathBuf,
}

impl ControlClient {
    /// Resolve the control address from the working directory, using the
    /// same derivation as the listener.
    pub fn new(work_dir: &Path) -> Self {
        Self {
            socket_path: constants::control_socket_path(work_dir),
        }
    }

    /// Connect to the running instance.
    ///
    /// A missing socket or a refused connection means no instance is
    /// running at this working directory, surfaced as `Error::NotRunning`.
    pub async fn connect(&self) -> Result<UnixStream> {
        if !self.socket_path.exists() {
            return Err(Error::NotRunning);
        }

        UnixStream::connect(&self.socket_path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound | std::io::ErrorKind::ConnectionRefused => {
                    Error::NotRunning
                }
                _ => Error::IpcConnectionFailed(e.to_string()),
            })
    }

    /// Send one request line and read one response line
    pub async fn send(&self, request: &Request) -> Result<Response> {
        let mut stream = self.connect().await?;

        let mut json = serde_json::to_string(request)?;
        json.push('\n');

        stream
            .write_all(json.as_bytes())
            .await
            .map_err(|e| Error::IpcError(format!("Write error: {}", e)))?;

        stream
            .flush()
            .await
            .map_err(|e| Error::IpcError(format!("Flush error: {}", e)))?;

        debug!("sent request: {:?}", request);

        let mut reader = BufReader::new(stream);
        let mut line = String::new();

        reader
            .read_line(&mut line)
            .await
            .map_err(|e| Error::IpcError(format!("Read error: {}", e)))?;

        let response: Response = serde_json::from_str(line.trim())
            .map_err(|e| Error::IpcError(format!("Invalid response: {}", e)))?;

        debug!("received response: {:?}", response);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::ControlServer;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_connect_without_listener_is_not_running() {
        let dir = tempdir().unwrap();

        let client = ControlClient::new(dir.path());
        let result = client.connect().await;

        assert!(matches!(result, Err(Error::NotRunning)));
    }

    #[tokio::test]
    async fn test_request_response_roundtrip() {
        let dir = tempdir().unwrap();
        let work_dir = dir.path().to_path_buf();

        let server = ControlServer::bind(&work_dir).await.unwrap();
        tokio::spawn(async move {
            let mut conn = server.accept().await.unwrap();
            let request = conn.read_request().await.unwrap().unwrap();
            let response = match request {
                Request::Get { .. } => Response::policy(10240, 30, 2_592_000_000),
                _ => Response::fail(),
            };
            conn.send_response(&response).await.unwrap();
        });

        let client = ControlClient::new(dir.path());
        let response = client
            .send(&Request::Get {
                work_dir: dir.path().to_path_buf(),
            })
            .await
            .unwrap();

        assert!(response.is_ok());
        assert_eq!(response.max_size, Some(10240));
        assert_eq!(response.logs, Some(30));
        assert_eq!(response.duration, Some(2_592_000_000));
    }
}
