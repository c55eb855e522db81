//! IPC client for communicating with the study timer daemon.
//!
//! This module provides:
//! - Unix Domain Socket client
//! - Request/response handling
//! - Connection retry logic
//! - Timeout handling

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::time::timeout;

use crate::paths::AppPaths;
use crate::types::{IpcRequest, IpcResponse, SessionKind};

// ============================================================================
// Constants
// ============================================================================

/// Connection timeout in seconds
const CONNECTION_TIMEOUT_SECS: u64 = 5;

/// Read/write timeout in seconds
const IO_TIMEOUT_SECS: u64 = 5;

/// Maximum response size in bytes (64KB)
const MAX_RESPONSE_SIZE: u64 = 65536;

/// Maximum retry attempts
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds (base delay, multiplied by attempt number)
const RETRY_DELAY_MS: u64 = 500;

// ============================================================================
// IpcClient
// ============================================================================

/// IPC client for daemon communication.
pub struct IpcClient {
    /// Socket path
    socket_path: PathBuf,
    /// Connection timeout
    timeout: Duration,
}

impl IpcClient {
    /// Creates a client for the daemon of the resolved data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be resolved.
    pub fn new() -> Result<Self> {
        let paths = AppPaths::resolve()?;
        Ok(Self::with_socket_path(paths.socket()))
    }

    /// Creates a new IPC client with a custom socket path.
    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            timeout: Duration::from_secs(CONNECTION_TIMEOUT_SECS),
        }
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Starts a session, optionally tagged with a task.
    pub async fn start(&self, task_id: Option<String>) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Start { task_id })
            .await
    }

    /// Sends a pause command to the daemon.
    pub async fn pause(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Pause).await
    }

    /// Sends a resume command to the daemon.
    pub async fn resume(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Resume).await
    }

    /// Sends a stop command to the daemon.
    pub async fn stop(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Stop).await
    }

    /// Sends a skip command to the daemon.
    pub async fn skip(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Skip).await
    }

    /// Sends a reset command to the daemon.
    pub async fn reset(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Reset).await
    }

    /// Selects the kind of the next session.
    pub async fn set_kind(&self, kind: SessionKind) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Kind { kind })
            .await
    }

    /// Sets the note of the last completed session.
    pub async fn note(&self, note: &str) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Note {
            note: note.to_string(),
        })
        .await
    }

    /// Sends a status query to the daemon.
    pub async fn status(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Status).await
    }

    /// Queries today's focus summary.
    pub async fn today(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Today).await
    }

    /// Sends a request, retrying transport failures.
    ///
    /// An error reply from the daemon is returned as an error without retrying.
    async fn send_request_with_retry(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let mut last_error = None;

        for attempt in 1..=MAX_RETRIES {
            match self.send_request(request).await {
                Ok(response) if response.is_error() => anyhow::bail!("{}", response.message),
                Ok(response) => return Ok(response),
                Err(e) => {
                    tracing::warn!("リクエスト失敗 (試行 {}/{}): {:#}", attempt, MAX_RETRIES, e);
                    last_error = Some(e);

                    if attempt < MAX_RETRIES {
                        let delay = Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt));
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("リクエストを送信できませんでした")))
    }

    /// Sends a single request and reads the reply.
    async fn send_request(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let mut stream = timeout(self.timeout, UnixStream::connect(&self.socket_path))
            .await
            .context("接続がタイムアウトしました")?
            .context("デーモンに接続できません。'exam-sprint daemon' を起動してください")?;

        let request_json =
            serde_json::to_vec(request).context("リクエストのシリアライズに失敗しました")?;

        timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            stream.write_all(&request_json),
        )
        .await
        .context("書き込みがタイムアウトしました")?
        .context("リクエストの送信に失敗しました")?;

        // End of request
        stream
            .shutdown()
            .await
            .context("シャットダウンに失敗しました")?;

        let mut buffer = Vec::new();
        timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            (&mut stream).take(MAX_RESPONSE_SIZE).read_to_end(&mut buffer),
        )
        .await
        .context("読み込みがタイムアウトしました")?
        .context("レスポンスの受信に失敗しました")?;

        if buffer.is_empty() {
            anyhow::bail!("デーモンからの応答がありませんでした");
        }

        serde_json::from_slice(&buffer).context("レスポンスのパースに失敗しました")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseData;
    use tokio::net::UnixListener;

    // ------------------------------------------------------------------------
    // Helper functions
    // ------------------------------------------------------------------------

    fn create_temp_socket_path() -> PathBuf {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sock");
        // Keep the directory so it's not deleted
        std::mem::forget(dir);
        path
    }

    /// Serves `connections` requests with `reply`, returning what was received.
    fn spawn_mock_server(
        socket_path: &Path,
        connections: usize,
        reply: IpcResponse,
    ) -> tokio::task::JoinHandle<Vec<IpcRequest>> {
        let listener = UnixListener::bind(socket_path).unwrap();
        tokio::spawn(async move {
            let mut received = Vec::new();
            for _ in 0..connections {
                let (mut stream, _) = listener.accept().await.unwrap();
                let mut buffer = Vec::new();
                stream.read_to_end(&mut buffer).await.unwrap();
                received.push(serde_json::from_slice(&buffer).unwrap());

                let json = serde_json::to_vec(&reply).unwrap();
                stream.write_all(&json).await.unwrap();
            }
            received
        })
    }

    // ------------------------------------------------------------------------
    // IpcClient Tests
    // ------------------------------------------------------------------------

    mod client_tests {
        use super::*;

        #[test]
        fn test_with_socket_path() {
            let path = PathBuf::from("/tmp/exam-sprint-test.sock");
            let client = IpcClient::with_socket_path(path.clone());
            assert_eq!(client.socket_path(), path.as_path());
        }

        #[tokio::test]
        async fn test_connection_failure() {
            let dir = tempfile::tempdir().unwrap();
            let client = IpcClient::with_socket_path(dir.path().join("missing.sock"));

            let result = client.status().await;
            assert!(result.is_err());
        }

        #[tokio::test]
        async fn test_status_request() {
            let socket_path = create_temp_socket_path();
            let reply = IpcResponse::success(
                "",
                Some(ResponseData {
                    state: Some("idle".to_string()),
                    remaining_seconds: Some(1500),
                    ..Default::default()
                }),
            );
            let server = spawn_mock_server(&socket_path, 1, reply);

            let client = IpcClient::with_socket_path(socket_path);
            let response = client.status().await.unwrap();

            let data = response.data.unwrap();
            assert_eq!(data.state.as_deref(), Some("idle"));
            assert_eq!(data.remaining_seconds, Some(1500));
            assert_eq!(server.await.unwrap(), vec![IpcRequest::Status]);
        }

        #[tokio::test]
        async fn test_start_sends_task() {
            let socket_path = create_temp_socket_path();
            let server = spawn_mock_server(
                &socket_path,
                1,
                IpcResponse::success("セッションを開始しました", None),
            );

            let client = IpcClient::with_socket_path(socket_path);
            let response = client.start(Some("statistics".to_string())).await.unwrap();

            assert_eq!(response.message, "セッションを開始しました");
            assert_eq!(
                server.await.unwrap(),
                vec![IpcRequest::Start {
                    task_id: Some("statistics".to_string())
                }]
            );
        }

        #[tokio::test]
        async fn test_each_command_sends_its_request() {
            let socket_path = create_temp_socket_path();
            let server = spawn_mock_server(&socket_path, 8, IpcResponse::success("OK", None));

            let client = IpcClient::with_socket_path(socket_path);
            client.pause().await.unwrap();
            client.resume().await.unwrap();
            client.stop().await.unwrap();
            client.skip().await.unwrap();
            client.reset().await.unwrap();
            client.set_kind(SessionKind::ShortBreak).await.unwrap();
            client.note("flashcards").await.unwrap();
            client.today().await.unwrap();

            assert_eq!(
                server.await.unwrap(),
                vec![
                    IpcRequest::Pause,
                    IpcRequest::Resume,
                    IpcRequest::Stop,
                    IpcRequest::Skip,
                    IpcRequest::Reset,
                    IpcRequest::Kind {
                        kind: SessionKind::ShortBreak
                    },
                    IpcRequest::Note {
                        note: "flashcards".to_string()
                    },
                    IpcRequest::Today,
                ]
            );
        }

        #[tokio::test]
        async fn test_error_response_is_not_retried() {
            let socket_path = create_temp_socket_path();
            let server = spawn_mock_server(
                &socket_path,
                1,
                IpcResponse::error("メモを付けられるセッションがありません"),
            );

            let client = IpcClient::with_socket_path(socket_path);
            let result = client.note("nothing").await;

            let error_msg = result.unwrap_err().to_string();
            assert!(
                error_msg.contains("セッションがありません"),
                "unexpected error: {}",
                error_msg
            );
            assert_eq!(server.await.unwrap().len(), 1);
        }

        #[tokio::test]
        async fn test_empty_reply_is_error() {
            let socket_path = create_temp_socket_path();
            let listener = UnixListener::bind(&socket_path).unwrap();
            let server = tokio::spawn(async move {
                for _ in 0..MAX_RETRIES {
                    let (stream, _) = listener.accept().await.unwrap();
                    drop(stream);
                }
            });

            let client = IpcClient::with_socket_path(socket_path);
            assert!(client.status().await.is_err());

            server.await.unwrap();
        }
    }
}
