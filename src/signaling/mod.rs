//! Signaling seam - traits and events for the external SIP/WebRTC library.
//!
//! This module defines the contract the call controller programs against:
//! - a backend that creates connection handles from registration settings
//! - connection-lifecycle and call-session event enums
//! - opaque handles for sessions and remote media streams
//!

mod backend;
mod events;

#[cfg(test)]
pub mod mock;

pub use backend::{
    CallOptions, CallSession, Connection, Direction, RegistrationConfig, SignalingBackend,
    SignalingError,
};
pub use events::{ConnectionEvent, MediaStream, NegotiationStage, SessionEvent};
