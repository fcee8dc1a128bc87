//! UI-observable state of the call controller.

use serde::Serialize;
use std::fmt;

/// Registration status of the signaling connection, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
    Registered,
    Unregistered,
    RegistrationFailed,
}

impl ConnectionStatus {
    /// The exact status label the view layer renders.
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Registered => "registered",
            ConnectionStatus::Unregistered => "unregistered",
            ConnectionStatus::RegistrationFailed => "registrationFailed",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the current call attempt stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallState {
    /// No call in any stage.
    Idle,
    /// We are dialing out and the remote side is being alerted.
    OutgoingRinging { target: String },
    /// An incoming call is waiting for an answer.
    IncomingRinging,
    /// An answered call is being set up.
    Connecting,
    /// The call is established.
    Active,
    /// The call just ended; transitions to `Idle` immediately after.
    Ended,
}

impl CallState {
    pub fn label(&self) -> &'static str {
        match self {
            CallState::Idle => "idle",
            CallState::OutgoingRinging { .. } => "outgoing-ringing",
            CallState::IncomingRinging => "incoming-ringing",
            CallState::Connecting => "connecting",
            CallState::Active => "active",
            CallState::Ended => "ended",
        }
    }
}

/// Snapshot of everything the view layer binds to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiState {
    pub connection_status: ConnectionStatus,
    pub show_incoming_call: bool,
    pub show_outgoing_call: bool,
    pub call_state: CallState,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            connection_status: ConnectionStatus::Disconnected,
            show_incoming_call: false,
            show_outgoing_call: false,
            call_state: CallState::Idle,
        }
    }
}

/// Change notifications broadcast to the host UI.
#[derive(Debug, Clone)]
pub enum UiEvent {
    ConnectionStatusChanged(ConnectionStatus),
    CallStateChanged(CallState),
    IncomingCallVisible(bool),
    OutgoingCallVisible(bool),
}
