//! API client for sending requests to the daemon.

use crate::api::protocol::{Request, Response};
use crate::error::{ClipdexError, Result};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

/// Send a request to the daemon via Unix socket.
///
/// # Errors
/// Returns `ClipdexError::ApiConnection` if connection fails
/// Returns `ClipdexError::ApiProtocol` if serialization/deserialization fails
pub async fn send_request(socket_path: &Path, request: Request) -> Result<Response> {
    let stream =
        UnixStream::connect(socket_path)
            .await
            .map_err(|e| ClipdexError::ApiConnection {
                message: format!("Failed to connect to daemon: {}", e),
            })?;

    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    let request_json = request.to_json().map_err(|e| ClipdexError::ApiProtocol {
        message: format!("Failed to serialize request: {}", e),
    })?;

    writer
        .write_all(request_json.as_bytes())
        .await
        .map_err(|e| ClipdexError::ApiConnection {
            message: format!("Failed to write request: {}", e),
        })?;

    writer
        .write_all(b"\n")
        .await
        .map_err(|e| ClipdexError::ApiConnection {
            message: format!("Failed to write newline: {}", e),
        })?;

    writer
        .flush()
        .await
        .map_err(|e| ClipdexError::ApiConnection {
            message: format!("Failed to flush writer: {}", e),
        })?;

    let mut response_line = String::new();
    reader
        .read_line(&mut response_line)
        .await
        .map_err(|e| ClipdexError::ApiConnection {
            message: format!("Failed to read response: {}", e),
        })?;

    let response =
        Response::from_json(response_line.trim()).map_err(|e| ClipdexError::ApiProtocol {
            message: format!("Failed to deserialize response: {}", e),
        })?;

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::server::{ApiServer, RequestHandler};
    use tempfile::TempDir;

    struct MockHandler;

    #[async_trait::async_trait]
    impl RequestHandler for MockHandler {
        async fn handle(&self, request: Request) -> Response {
            match request {
                Request::Status => Response::Status {
                    model_name: "test-model".to_string(),
                    model_ready: true,
                    jobs_total: 2,
                    jobs_active: 1,
                },
                Request::CancelAllJobs => Response::CancelledAll { cancelled: 1 },
                _ => Response::Ok,
            }
        }
    }

    async fn start_server(socket_path: std::path::PathBuf) {
        tokio::spawn(async move {
            let server = ApiServer::new(socket_path).unwrap();
            server.start(MockHandler).await
        });
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_send_request_status() {
        let temp_dir = TempDir::new().unwrap();
        let socket_path = temp_dir.path().join("test.sock");
        start_server(socket_path.clone()).await;

        let response = send_request(&socket_path, Request::Status).await.unwrap();

        match response {
            Response::Status {
                model_name,
                model_ready,
                jobs_total,
                jobs_active,
            } => {
                assert_eq!(model_name, "test-model");
                assert!(model_ready);
                assert_eq!(jobs_total, 2);
                assert_eq!(jobs_active, 1);
            }
            _ => panic!("Expected Status response, got: {:?}", response),
        }
    }

    #[tokio::test]
    async fn test_send_request_cancel_all() {
        let temp_dir = TempDir::new().unwrap();
        let socket_path = temp_dir.path().join("test.sock");
        start_server(socket_path.clone()).await;

        let response = send_request(&socket_path, Request::CancelAllJobs)
            .await
            .unwrap();
        assert_eq!(response, Response::CancelledAll { cancelled: 1 });
    }

    #[tokio::test]
    async fn test_send_request_connection_failed() {
        let temp_dir = TempDir::new().unwrap();
        let socket_path = temp_dir.path().join("nonexistent.sock");

        let result = send_request(&socket_path, Request::Status).await;

        assert!(result.is_err());
        match result.unwrap_err() {
            ClipdexError::ApiConnection { message } => {
                assert!(message.contains("Failed to connect to daemon"));
            }
            err => panic!("Expected ApiConnection error, got: {:?}", err),
        }
    }

    #[tokio::test]
    async fn test_multiple_sequential_requests() {
        let temp_dir = TempDir::new().unwrap();
        let socket_path = temp_dir.path().join("test.sock");
        start_server(socket_path.clone()).await;

        let requests = vec![Request::Status, Request::ListJobs, Request::ClearJobs];

        for request in requests {
            let response = send_request(&socket_path, request.clone()).await.unwrap();
            assert!(
                matches!(response, Response::Ok | Response::Status { .. }),
                "Unexpected response for {:?}: {:?}",
                request,
                response
            );
        }
    }
}
