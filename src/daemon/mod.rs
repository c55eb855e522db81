//! Daemon module for the study timer.
//!
//! This module contains the core daemon functionality:
//! - `timer`: Timer engine with state transitions and countdown logic
//! - `ipc`: Unix socket server and request dispatch
//! - `server`: The loop that owns the engine and serves clients

pub mod ipc;
pub mod server;
pub mod timer;

pub use ipc::{handle_request, IpcError, IpcServer};
pub use server::{run, serve};
pub use timer::{TimerEngine, TimerEvent};
