//! Trait seam for the external signaling/media library.
//!
//! SIP registration, offer/answer negotiation and media transport are owned
//! by whichever library sits behind these traits; this crate only drives
//! them and reacts to their events.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;
use url::Url;
use uuid::Uuid;

use crate::signaling::events::{ConnectionEvent, SessionEvent};
use crate::storage::SipSettings;

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Error, Debug, Clone)]
pub enum SignalingError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("not connected to signaling service")]
    NotConnected,

    #[error("call setup failed: {0}")]
    CallSetupFailed(String),

    #[error("answer failed: {0}")]
    AnswerFailed(String),

    #[error("terminate failed: {0}")]
    TerminateFailed(String),
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Everything a backend needs to build a transport socket and register:
/// derived from the persisted [`SipSettings`].
#[derive(Debug, Clone)]
pub struct RegistrationConfig {
    pub socket_url: Url,
    pub identity: String,
    pub password: String,
}

impl RegistrationConfig {
    /// Builds a configuration from stored settings.
    ///
    /// The server address is only validated here, at connect time; the
    /// settings store itself accepts any string.
    pub fn from_settings(settings: &SipSettings) -> Result<Self, url::ParseError> {
        let socket_url = Url::parse(&settings.server_address)?;
        Ok(Self {
            socket_url,
            identity: settings.identity.clone(),
            password: settings.password.clone(),
        })
    }
}

/// Media constraints for an outgoing call. Voice calls are audio only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallOptions {
    pub audio: bool,
    pub video: bool,
}

impl CallOptions {
    pub fn audio_only() -> Self {
        Self {
            audio: true,
            video: false,
        }
    }
}

impl Default for CallOptions {
    fn default() -> Self {
        Self::audio_only()
    }
}

/// Which side initiated a call session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Incoming,
    Outgoing,
}

// ============================================================================
// BACKEND TRAITS
// ============================================================================

/// Entry point of the signaling library: turns a registration configuration
/// into a connection handle.
pub trait SignalingBackend: Send + Sync {
    fn create(&self, config: RegistrationConfig) -> Result<Arc<dyn Connection>, SignalingError>;
}

/// One registration with the signaling service.
///
/// Subscribe to [`events`](Connection::events) before calling
/// [`start`](Connection::start); registration events may fire immediately.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Event stream for this connection.
    fn events(&self) -> broadcast::Receiver<ConnectionEvent>;

    /// Opens the transport and begins registration.
    ///
    /// Registration outcome is reported through events, not the return
    /// value; an error here means the transport could not be built at all.
    async fn start(&self) -> Result<(), SignalingError>;

    /// Requests a new outgoing call session toward `target`.
    async fn call(
        &self,
        target: &str,
        options: CallOptions,
    ) -> Result<Arc<dyn CallSession>, SignalingError>;

    /// Unregisters and tears the transport down.
    async fn close(&self) -> Result<(), SignalingError>;

    fn is_registered(&self) -> bool;
}

/// One logical call, from invitation to termination.
#[async_trait]
pub trait CallSession: Send + Sync + fmt::Debug {
    fn id(&self) -> Uuid;

    fn direction(&self) -> Direction;

    /// Event stream for this session.
    fn events(&self) -> broadcast::Receiver<SessionEvent>;

    /// True while the session is being set up or is established.
    fn is_in_progress(&self) -> bool;

    /// Answers an incoming call.
    async fn answer(&self) -> Result<(), SignalingError>;

    /// Requests termination of the call.
    async fn terminate(&self) -> Result<(), SignalingError>;
}
