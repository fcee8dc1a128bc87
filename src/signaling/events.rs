//! Event types emitted by the signaling library seam.
//!
//! Connection-level and session-level events are tagged enums so the
//! controller dispatches over them with an exhaustive `match` instead of
//! a handler map keyed by event name.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::signaling::backend::{CallSession, Direction};

// ============================================================================
// CONNECTION EVENTS
// ============================================================================

/// Events emitted by a [`Connection`](crate::signaling::Connection) over its
/// lifetime: transport state, registration state and new call sessions.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// Transport is being established.
    Connecting,

    /// Transport is up.
    Connected,

    /// Transport was lost or closed.
    Disconnected,

    /// Registration with the signaling service succeeded.
    Registered,

    /// Registration was removed.
    Unregistered,

    /// Registration was rejected or could not complete.
    RegistrationFailed { cause: String },

    /// A new call session exists, either placed by us or offered to us.
    NewSession {
        session: Arc<dyn CallSession>,
        direction: Direction,
    },
}

// ============================================================================
// SESSION EVENTS
// ============================================================================

/// Events emitted by a single [`CallSession`](crate::signaling::CallSession).
///
/// Only `Confirmed`, `Ended`, `Failed` and `RemoteTrack` drive state in the
/// controller; everything else is logged and otherwise ignored.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The remote side is being alerted.
    Progress,

    /// The call was accepted but media is not confirmed yet.
    Accepted,

    /// The call is established end to end.
    Confirmed,

    /// The call ended after being established.
    Ended { cause: String },

    /// The call attempt failed before or after being established.
    Failed { cause: String },

    /// A remote media stream became available.
    RemoteTrack { stream: MediaStream },

    /// The remote side put the call on hold.
    Hold,

    /// The remote side resumed the call.
    Unhold,

    /// Local media was muted.
    Muted,

    /// Local media was unmuted.
    Unmuted,

    /// A DTMF digit was received.
    Dtmf { digit: char },

    /// The remote side renegotiated the session.
    Reinvite,

    /// The session was updated in place.
    Update,

    /// The call is being transferred.
    Refer,

    /// A transport candidate was gathered.
    IceCandidate,

    /// Local media capture could not be acquired.
    MediaAcquisitionFailed { cause: String },

    /// An offer/answer negotiation step failed.
    NegotiationFailed {
        stage: NegotiationStage,
        cause: String,
    },
}

/// The negotiation step a [`SessionEvent::NegotiationFailed`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationStage {
    CreateOffer,
    CreateAnswer,
    SetLocalDescription,
    SetRemoteDescription,
}

// ============================================================================
// MEDIA STREAM HANDLE
// ============================================================================

/// Opaque handle to a live remote media stream.
///
/// The payload is whatever the concrete backend produces; sinks that know
/// the backend downcast it, everything else treats the handle as an id.
#[derive(Clone)]
pub struct MediaStream {
    id: String,
    raw: Arc<dyn Any + Send + Sync>,
}

impl MediaStream {
    pub fn new(id: impl Into<String>, raw: impl Any + Send + Sync) -> Self {
        Self {
            id: id.into(),
            raw: Arc::new(raw),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Borrows the backend-specific payload, if it is of type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.raw.downcast_ref()
    }
}

impl fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaStream").field("id", &self.id).finish()
    }
}
