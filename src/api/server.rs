//! Async Unix socket API server for the daemon.

use crate::api::protocol::{Request, Response};
use crate::error::{ClipdexError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Mutex;

/// Handler trait for processing API requests.
#[async_trait::async_trait]
pub trait RequestHandler: Send + Sync {
    /// Handle a request and return a response.
    async fn handle(&self, request: Request) -> Response;
}

/// State for managing server shutdown.
#[derive(Debug, Clone)]
struct ServerState {
    shutdown: Arc<Mutex<bool>>,
}

impl ServerState {
    fn new() -> Self {
        Self {
            shutdown: Arc::new(Mutex::new(false)),
        }
    }

    async fn is_shutdown(&self) -> bool {
        *self.shutdown.lock().await
    }

    async fn set_shutdown(&self) {
        *self.shutdown.lock().await = true;
    }
}

/// API server handling client requests over a Unix socket.
pub struct ApiServer {
    socket_path: PathBuf,
    state: ServerState,
}

impl ApiServer {
    /// Create a new API server bound to the specified socket path.
    pub fn new(socket_path: PathBuf) -> Result<Self> {
        Ok(Self {
            socket_path,
            state: ServerState::new(),
        })
    }

    /// Get the socket path this server is using.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Get the default socket path based on XDG_RUNTIME_DIR or fallback.
    pub fn default_socket_path() -> PathBuf {
        if let Ok(xdg_runtime) = std::env::var("XDG_RUNTIME_DIR") {
            PathBuf::from(xdg_runtime).join("clipdex.sock")
        } else {
            let uid = unsafe { libc::getuid() };
            PathBuf::from(format!("/tmp/clipdex-{}.sock", uid))
        }
    }

    /// Start the API server and handle incoming connections.
    ///
    /// Returns after a `Shutdown` request has been answered.
    pub async fn start<H>(&self, handler: H) -> Result<()>
    where
        H: RequestHandler + 'static,
    {
        // Clean up any existing socket file
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).map_err(|e| ClipdexError::ApiSocket {
                message: format!("Failed to remove existing socket: {}", e),
            })?;
        }

        let listener =
            UnixListener::bind(&self.socket_path).map_err(|e| ClipdexError::ApiSocket {
                message: format!("Failed to bind to socket: {}", e),
            })?;
        log::info!("listening on {}", self.socket_path.display());

        let handler = Arc::new(handler);

        loop {
            if self.state.is_shutdown().await {
                break;
            }

            // Accept connection with timeout to check for shutdown
            let accept_result =
                tokio::time::timeout(tokio::time::Duration::from_millis(100), listener.accept())
                    .await;

            match accept_result {
                Ok(Ok((stream, _))) => {
                    let handler = Arc::clone(&handler);
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_client(stream, handler, state).await {
                            log::warn!("error handling client: {}", e);
                        }
                    });
                }
                Ok(Err(e)) => {
                    return Err(ClipdexError::ApiConnection {
                        message: format!("Failed to accept connection: {}", e),
                    });
                }
                Err(_) => {
                    // Timeout - check shutdown flag again
                    continue;
                }
            }
        }

        Ok(())
    }

    /// Stop the API server and clean up the socket file.
    pub async fn stop(&self) -> Result<()> {
        self.state.set_shutdown().await;

        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).map_err(|e| ClipdexError::ApiSocket {
                message: format!("Failed to remove socket file: {}", e),
            })?;
        }

        Ok(())
    }
}

/// Handle a single client connection.
async fn handle_client<H>(stream: UnixStream, handler: Arc<H>, state: ServerState) -> Result<()>
where
    H: RequestHandler,
{
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    // Read request (one line JSON)
    reader
        .read_line(&mut line)
        .await
        .map_err(|e| ClipdexError::ApiConnection {
            message: format!("Failed to read from client: {}", e),
        })?;

    // Parse request
    let request = Request::from_json(line.trim()).map_err(|e| ClipdexError::ApiProtocol {
        message: format!("Failed to parse request: {}", e),
    })?;
    let is_shutdown = matches!(request, Request::Shutdown);

    // Handle request
    let response = handler.handle(request).await;

    // Send response
    let response_json = response.to_json().map_err(|e| ClipdexError::ApiProtocol {
        message: format!("Failed to serialize response: {}", e),
    })?;

    writer
        .write_all(response_json.as_bytes())
        .await
        .map_err(|e| ClipdexError::ApiConnection {
            message: format!("Failed to write to client: {}", e),
        })?;

    writer
        .write_all(b"\n")
        .await
        .map_err(|e| ClipdexError::ApiConnection {
            message: format!("Failed to write newline to client: {}", e),
        })?;

    writer
        .flush()
        .await
        .map_err(|e| ClipdexError::ApiConnection {
            message: format!("Failed to flush writer: {}", e),
        })?;

    // The shutdown flag flips only after the client got its answer.
    if is_shutdown {
        state.set_shutdown().await;
    }

    Ok(())
}
