//! IPC server for the study timer daemon.
//!
//! This module provides Unix Domain Socket IPC functionality:
//! - Server that listens on a Unix socket
//! - One JSON request and one JSON response per connection
//! - Dispatch of requests to the timer engine

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::time::{timeout, Duration};

use crate::store::{SessionHistoryStore, SettingsProvider};
use crate::types::{IpcRequest, IpcResponse, ResponseData};

use super::timer::TimerEngine;

// ============================================================================
// Constants
// ============================================================================

/// Maximum request size in bytes (4KB)
const MAX_REQUEST_SIZE: usize = 4096;

/// Read timeout in seconds
const READ_TIMEOUT_SECS: u64 = 5;

/// Reply for a command that had no effect in the current state.
const NO_CHANGE_MESSAGE: &str = "変更はありません";

// ============================================================================
// IpcError
// ============================================================================

/// IPC-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// Read error
    #[error("Failed to read request: {0}")]
    ReadError(String),

    /// Client closed the connection without sending anything
    #[error("Connection closed by client")]
    ConnectionClosed,

    /// Malformed request body
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Request too large
    #[error("Request too large (max {MAX_REQUEST_SIZE} bytes)")]
    RequestTooLarge,
}

// ============================================================================
// IpcServer
// ============================================================================

/// Unix Domain Socket IPC server.
pub struct IpcServer {
    /// Unix socket listener
    listener: UnixListener,
    /// Socket path (for cleanup)
    socket_path: PathBuf,
}

impl IpcServer {
    /// Creates a new IPC server bound to the specified socket path.
    ///
    /// A stale socket file left by a previous daemon is removed first.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub fn new(socket_path: &Path) -> Result<Self> {
        if socket_path.exists() {
            std::fs::remove_file(socket_path)
                .with_context(|| format!("Failed to remove stale socket: {:?}", socket_path))?;
        }

        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create socket directory: {:?}", parent))?;
        }

        let listener = UnixListener::bind(socket_path)
            .with_context(|| format!("Failed to bind Unix socket: {:?}", socket_path))?;

        Ok(Self {
            listener,
            socket_path: socket_path.to_path_buf(),
        })
    }

    /// Accepts an incoming client connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be accepted.
    pub async fn accept(&self) -> Result<UnixStream> {
        let (stream, _addr) = self
            .listener
            .accept()
            .await
            .context("Failed to accept connection")?;
        Ok(stream)
    }

    /// Reads one request, up to the client closing its write half.
    ///
    /// # Errors
    ///
    /// Returns an error on timeout, oversize input, or invalid JSON.
    pub async fn receive_request(stream: &mut UnixStream) -> Result<IpcRequest> {
        let mut buffer = Vec::new();
        let mut limited = (&mut *stream).take(MAX_REQUEST_SIZE as u64 + 1);

        match timeout(
            Duration::from_secs(READ_TIMEOUT_SECS),
            limited.read_to_end(&mut buffer),
        )
        .await
        {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(IpcError::ReadError(e.to_string()).into()),
            Err(_) => return Err(IpcError::Timeout.into()),
        }

        if buffer.is_empty() {
            return Err(IpcError::ConnectionClosed.into());
        }
        if buffer.len() > MAX_REQUEST_SIZE {
            return Err(IpcError::RequestTooLarge.into());
        }

        serde_json::from_slice(&buffer).map_err(|e| IpcError::InvalidRequest(e.to_string()).into())
    }

    /// Writes the response and closes the write half.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub async fn send_response(stream: &mut UnixStream, response: &IpcResponse) -> Result<()> {
        let json = serde_json::to_vec(response).context("Failed to serialize IPC response")?;

        stream
            .write_all(&json)
            .await
            .context("Failed to write response")?;
        stream.shutdown().await.context("Failed to close response")?;

        Ok(())
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

// ============================================================================
// Request dispatch
// ============================================================================

/// Applies `request` to the engine and builds the reply.
///
/// Commands that leave the state untouched still succeed, with a message
/// saying nothing changed. A status query while idle reports the countdown
/// for the current settings.
pub fn handle_request<S, H>(engine: &mut TimerEngine<S, H>, request: IpcRequest) -> IpcResponse
where
    S: SettingsProvider,
    H: SessionHistoryStore,
{
    let before = engine.get_state().clone();

    let message = match request {
        IpcRequest::Status => {
            engine.refresh_idle_countdown();
            return status_response(engine);
        }
        IpcRequest::Today => return today_response(engine),
        IpcRequest::Note { note } => {
            return if engine.update_session_note(&note) {
                IpcResponse::success("直近のセッションにメモを保存しました", None)
            } else {
                IpcResponse::error("メモを付けられるセッションがありません")
            };
        }
        IpcRequest::Start { task_id } => {
            engine.start(task_id);
            "セッションを開始しました".to_string()
        }
        IpcRequest::Pause => {
            engine.pause();
            "タイマーを一時停止しました".to_string()
        }
        IpcRequest::Resume => {
            engine.resume();
            "タイマーを再開しました".to_string()
        }
        IpcRequest::Stop => {
            engine.stop();
            "セッションを中止しました（記録されません）".to_string()
        }
        IpcRequest::Skip => {
            engine.skip();
            "休憩をスキップしました".to_string()
        }
        IpcRequest::Reset => {
            engine.reset();
            "タイマーをリセットしました".to_string()
        }
        IpcRequest::Kind { kind } => {
            engine.set_kind(kind);
            format!("次のセッションを {} に設定しました", kind)
        }
    };

    let state = engine.get_state();
    let data = Some(ResponseData::from_timer_state(state));
    if *state == before {
        IpcResponse::success(NO_CHANGE_MESSAGE, data)
    } else {
        IpcResponse::success(message, data)
    }
}

fn status_response<S, H>(engine: &TimerEngine<S, H>) -> IpcResponse
where
    S: SettingsProvider,
    H: SessionHistoryStore,
{
    let data = ResponseData::from_timer_state(engine.get_state());
    let data = match engine.today_summary() {
        Ok(summary) => data.with_summary(summary),
        Err(e) => {
            tracing::warn!("本日の集計を取得できません: {}", e);
            data
        }
    };
    IpcResponse::success("", Some(data))
}

fn today_response<S, H>(engine: &TimerEngine<S, H>) -> IpcResponse
where
    S: SettingsProvider,
    H: SessionHistoryStore,
{
    match engine.today_summary() {
        Ok(summary) => IpcResponse::success(
            "",
            Some(ResponseData::default().with_summary(summary)),
        ),
        Err(e) => IpcResponse::error(e.to_string()),
    }
}

// ============================================================================
// Tests
// ============================================================================
