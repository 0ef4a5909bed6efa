//! Control server - Unix socket listener for the supervisor

use logwrap_core::{constants, Error, Result};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, info};

use crate::protocol::{Request, Response};

/// Maximum control message size (64KB); requests are single JSON lines
const MAX_MESSAGE_SIZE: u64 = 64 * 1024;

/// Control server bound to the working directory's socket
pub struct ControlServer {
    socket_path: PathBuf,
    listener: UnixListener,
}

impl ControlServer {
    /// Bind the control socket for a working directory.
    ///
    /// A socket file with a live listener behind it means another instance
    /// owns this working directory; a dead one is stale and replaced.
    pub async fn bind(work_dir: &Path) -> Result<Self> {
        let socket_path = constants::control_socket_path(work_dir);

        if socket_path.exists() {
            match UnixStream::connect(&socket_path).await {
                Ok(_) => return Err(Error::AlreadyRunning(work_dir.to_path_buf())),
                Err(_) => {
                    info!("removing stale control socket {}", socket_path.display());
                    std::fs::remove_file(&socket_path)?;
                }
            }
        }

        let listener = UnixListener::bind(&socket_path)
            .map_err(|e| Error::IpcError(format!("Failed to bind socket: {}", e)))?;

        // Trust boundary is filesystem permissions on the socket
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&socket_path, std::fs::Permissions::from_mode(0o600))
                .map_err(|e| Error::IpcError(format!("Failed to set socket permissions: {}", e)))?;
        }

        info!("control server listening on {}", socket_path.display());

        Ok(Self {
            socket_path,
            listener,
        })
    }

    /// Accept a new control connection
    pub async fn accept(&self) -> Result<ControlConnection> {
        let (stream, _) = self
            .listener
            .accept()
            .await
            .map_err(|e| Error::IpcError(format!("Accept failed: {}", e)))?;

        debug!("accepted control connection");
        Ok(ControlConnection::new(stream))
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for ControlServer {
    fn drop(&mut self) {
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                error!("failed to remove control socket: {}", e);
            }
        }
    }
}

/// Single control connection
pub struct ControlConnection {
    stream: UnixStream,
}

impl ControlConnection {
    pub fn new(stream: UnixStream) -> Self {
        Self { stream }
    }

    /// Read one line and parse it as a request.
    ///
    /// `Ok(None)` means the peer closed the connection. A parse failure is
    /// an error but leaves the connection usable, so the caller can still
    /// answer with a FAIL response.
    pub async fn read_request(&mut self) -> Result<Option<Request>> {
        let limited_reader = (&mut self.stream).take(MAX_MESSAGE_SIZE);
        let mut reader = BufReader::new(limited_reader);
        let mut line = String::new();

        match reader.read_line(&mut line).await {
            Ok(0) => Ok(None),
            Ok(_) => {
                let request: Request = serde_json::from_str(line.trim())
                    .map_err(|e| Error::IpcError(format!("Invalid request: {}", e)))?;
                debug!("received request: {:?}", request);
                Ok(Some(request))
            }
            Err(e) => Err(Error::IpcError(format!("Read error: {}", e))),
        }
    }

    /// Send one response line
    pub async fn send_response(&mut self, response: &Response) -> Result<()> {
        let mut json = serde_json::to_string(response)?;
        json.push('\n');

        self.stream
            .write_all(json.as_bytes())
            .await
            .map_err(|e| Error::IpcError(format!("Write error: {}", e)))?;

        self.stream
            .flush()
            .await
            .map_err(|e| Error::IpcError(format!("Flush error: {}", e)))?;

        debug!("sent response: {:?}", response);
        Ok(())
    }
}
