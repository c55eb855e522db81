//! Daemon loop.
//!
//! A single task owns the timer engine. Connections are read in their own
//! tasks and forwarded here with a reply channel, so every engine mutation,
//! tick included, runs one at a time on this loop.

use std::future::Future;

use anyhow::{Context, Result};
use tokio::net::UnixStream;
use tokio::sync::{mpsc, oneshot};

use crate::paths::AppPaths;
use crate::store::{
    JsonHistoryStore, SessionHistoryStore, SettingsFile, SettingsProvider, SnapshotFile,
};
use crate::types::{IpcRequest, IpcResponse};

use super::ipc::{handle_request, IpcServer};
use super::timer::{TimerEngine, TimerEvent};

/// Requests waiting for the engine.
const REQUEST_QUEUE_SIZE: usize = 32;

/// A decoded request and where to send its reply.
struct PendingRequest {
    request: IpcRequest,
    reply: oneshot::Sender<IpcResponse>,
}

// ============================================================================
// serve
// ============================================================================

/// Runs the daemon until `shutdown` resolves, then returns the engine.
///
/// Each loop iteration handles exactly one of: a new connection, a queued
/// request, an engine tick, or an engine event.
pub async fn serve<S, H, F>(
    server: IpcServer,
    mut engine: TimerEngine<S, H>,
    mut events: mpsc::UnboundedReceiver<TimerEvent>,
    snapshot: Option<SnapshotFile>,
    shutdown: F,
) -> TimerEngine<S, H>
where
    S: SettingsProvider,
    H: SessionHistoryStore,
    F: Future<Output = ()>,
{
    let (request_tx, mut request_rx) = mpsc::channel::<PendingRequest>(REQUEST_QUEUE_SIZE);
    tokio::pin!(shutdown);

    tracing::info!("デーモンを起動しました: {:?}", server.socket_path());

    loop {
        tokio::select! {
            accepted = server.accept() => match accepted {
                Ok(stream) => {
                    tokio::spawn(handle_connection(stream, request_tx.clone()));
                }
                Err(e) => tracing::warn!("{:#}", e),
            },
            Some(pending) = request_rx.recv() => {
                tracing::debug!(request = ?pending.request, "handling request");
                let response = handle_request(&mut engine, pending.request);
                let _ = pending.reply.send(response);
            }
            _ = engine.next_tick() => engine.tick(),
            Some(event) = events.recv() => {
                on_event(&engine, &event, snapshot.as_ref());
            }
            _ = &mut shutdown => {
                tracing::info!("デーモンを終了します");
                break;
            }
        }
    }

    while let Ok(event) = events.try_recv() {
        on_event(&engine, &event, snapshot.as_ref());
    }

    engine
}

/// Reads one request, waits for the engine's reply, and writes it back.
async fn handle_connection(mut stream: UnixStream, requests: mpsc::Sender<PendingRequest>) {
    let response = match IpcServer::receive_request(&mut stream).await {
        Ok(request) => {
            let (reply, reply_rx) = oneshot::channel();
            if requests.send(PendingRequest { request, reply }).await.is_err() {
                return;
            }
            match reply_rx.await {
                Ok(response) => response,
                Err(_) => return,
            }
        }
        Err(e) => {
            tracing::debug!("invalid request: {:#}", e);
            IpcResponse::error(format!("不正なリクエストです: {}", e))
        }
    };

    if let Err(e) = IpcServer::send_response(&mut stream, &response).await {
        tracing::debug!("failed to reply: {:#}", e);
    }
}

/// Logs an engine event and persists the cycle position when it moved.
fn on_event<S, H>(engine: &TimerEngine<S, H>, event: &TimerEvent, snapshot: Option<&SnapshotFile>)
where
    S: SettingsProvider,
    H: SessionHistoryStore,
{
    match event {
        TimerEvent::Completed { record, next } => {
            tracing::info!(
                "{} セッションが完了しました。次は {} です",
                record.kind,
                next
            );
        }
        other => tracing::debug!(event = ?other, "timer event"),
    }

    let moves_cycle = matches!(
        event,
        TimerEvent::Completed { .. }
            | TimerEvent::Skipped { .. }
            | TimerEvent::KindChanged { .. }
            | TimerEvent::Reset
    );
    if !moves_cycle {
        return;
    }

    if let Some(file) = snapshot {
        if let Err(e) = file.save(&engine.get_state().snapshot()) {
            tracing::warn!("タイマー状態を保存できませんでした: {}", e);
        }
    }
}

// ============================================================================
// run
// ============================================================================

/// Engine backed by the files of a data directory.
type FileEngine = TimerEngine<SettingsFile, JsonHistoryStore>;

/// Builds the engine for the data directory `paths`.
///
/// An unparseable history file is set aside and the history starts empty.
/// The saved cycle position is restored when it can be read.
fn open_engine(
    paths: &AppPaths,
) -> Result<(FileEngine, mpsc::UnboundedReceiver<TimerEvent>, SnapshotFile)> {
    let settings = SettingsFile::new(paths.settings());
    let (history, _) = JsonHistoryStore::open_or_quarantine(paths.sessions())
        .context("セッション履歴を読み込めません")?;
    let snapshot = SnapshotFile::new(paths.state());

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let mut engine = TimerEngine::new(settings, history, event_tx);
    match snapshot.load() {
        Ok(Some(saved)) => engine.restore(saved),
        Ok(None) => {}
        Err(e) => tracing::warn!("保存されたタイマー状態を読み込めません: {}", e),
    }

    Ok((engine, event_rx, snapshot))
}

/// Starts the daemon for the data directory `paths` and runs it until
/// SIGINT or SIGTERM.
///
/// # Errors
///
/// Returns an error if another daemon is already listening, the history
/// cannot be read, or the socket cannot be bound.
pub async fn run(paths: &AppPaths) -> Result<()> {
    let socket_path = paths.socket();
    if UnixStream::connect(&socket_path).await.is_ok() {
        anyhow::bail!("デーモンは既に起動しています: {:?}", socket_path);
    }

    let (engine, event_rx, snapshot) = open_engine(paths)?;
    tracing::info!("データディレクトリ: {:?}", paths.root());

    let server = IpcServer::new(&socket_path)?;
    serve(server, engine, event_rx, Some(snapshot), shutdown_signal()).await;
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(terminate) => terminate,
        Err(e) => {
            tracing::warn!("SIGTERM を監視できません: {}", e);
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

// ============================================================================
// Tests
// ============================================================================
