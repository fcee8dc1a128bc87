//! Softphone - embeddable SIP/WebRTC call controller
//!
//! The building blocks of a browser-style softphone widget:
//! - [`controller`]: call state machine driving a signaling backend
//! - [`signaling`]: backend trait seam and its event types
//! - [`storage`]: SQLite-backed credentials and last-dialed number
//! - [`sound`]: notification clips and audio sink seams
//!
//! A host wires a [`signaling::SignalingBackend`] implementation and
//! (optionally) audio sinks into a [`controller::CallController`], then
//! renders the [`controller::UiState`] it observes via
//! [`controller::CallController::subscribe`].

pub mod controller;
pub mod signaling;
pub mod sound;
pub mod storage;

pub use controller::{CallController, CallState, ConnectionStatus, UiEvent, UiState};
pub use signaling::{SignalingBackend, SignalingError};
pub use storage::{KvStore, SettingsStore, SipSettings};

use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber.
///
/// Honors `RUST_LOG`; defaults to debug output for this crate. Calling it
/// twice is harmless, the second call is ignored.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("softphone=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
