//! Call Controller.
//!
//! Owns the signaling connection handle and the current call session,
//! drives the backend on user actions and folds its events into
//! UI-observable state. All library events are drained by pump tasks;
//! nothing here blocks waiting for a signaling response.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::state::{CallState, ConnectionStatus, UiEvent, UiState};
use crate::signaling::{
    CallOptions, CallSession, Connection, ConnectionEvent, Direction, MediaStream,
    RegistrationConfig, SessionEvent, SignalingBackend, SignalingError,
};
use crate::sound::{AudioSink, NullSink, RemoteAudioSink, SoundClip, SoundPlayer};
use crate::storage::{SettingsStore, StorageError};

/// How long a lazy connect waits for registration before giving up.
pub const REGISTRATION_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("signaling error: {0}")]
    Signaling(#[from] SignalingError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("invalid server address: {0}")]
    InvalidServerAddress(#[from] url::ParseError),

    #[error("registration failed: {0}")]
    RegistrationFailed(String),

    #[error("timed out waiting for registration")]
    RegistrationTimeout,
}

// ============================================================================
// SHARED STATE
// ============================================================================

/// The installed session and the task draining its events.
///
/// The pump handle is filled in after the slot becomes visible; `None`
/// only during installation or when the pump already removed the slot.
struct SessionSlot {
    session: Arc<dyn CallSession>,
    pump: Option<JoinHandle<()>>,
}

impl SessionSlot {
    fn abort_pump(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

/// State shared between the controller and its pump tasks.
struct Shared {
    ui: RwLock<UiState>,
    session: Mutex<Option<SessionSlot>>,
    sounds: SoundPlayer,
    remote_audio: Arc<dyn RemoteAudioSink>,
    remote_attached: AtomicBool,
    events: broadcast::Sender<UiEvent>,
}

impl Shared {
    fn set_status(&self, status: ConnectionStatus) {
        self.ui.write().connection_status = status;
        let _ = self.events.send(UiEvent::ConnectionStatusChanged(status));
    }

    fn set_call_state(&self, state: CallState) {
        self.ui.write().call_state = state.clone();
        let _ = self.events.send(UiEvent::CallStateChanged(state));
    }

    fn set_incoming_visible(&self, visible: bool) {
        self.ui.write().show_incoming_call = visible;
        let _ = self.events.send(UiEvent::IncomingCallVisible(visible));
    }

    fn set_outgoing_visible(&self, visible: bool) {
        self.ui.write().show_outgoing_call = visible;
        let _ = self.events.send(UiEvent::OutgoingCallVisible(visible));
    }

    fn clear_call_ui(&self) {
        self.set_incoming_visible(false);
        self.set_outgoing_visible(false);
        self.remote_audio.detach();
        self.remote_attached.store(false, Ordering::SeqCst);
    }

    /// Takes the current session, unless the slot was re-filled by a newer
    /// one in the meantime.
    fn take_session_if(&self, expected: &Arc<dyn CallSession>) -> Option<SessionSlot> {
        let mut guard = self.session.lock();
        match guard.take() {
            Some(slot) if Arc::ptr_eq(&slot.session, expected) => Some(slot),
            other => {
                *guard = other;
                None
            }
        }
    }
}

// ============================================================================
// EVENT PUMPS
// ============================================================================

fn spawn_connection_pump(
    shared: Arc<Shared>,
    mut rx: broadcast::Receiver<ConnectionEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => handle_connection_event(&shared, event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("connection event stream lagged by {}", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

fn handle_connection_event(shared: &Arc<Shared>, event: ConnectionEvent) {
    match event {
        ConnectionEvent::Connecting => shared.set_status(ConnectionStatus::Connecting),
        ConnectionEvent::Connected => shared.set_status(ConnectionStatus::Connected),
        ConnectionEvent::Disconnected => shared.set_status(ConnectionStatus::Disconnected),
        ConnectionEvent::Registered => shared.set_status(ConnectionStatus::Registered),
        ConnectionEvent::Unregistered => shared.set_status(ConnectionStatus::Unregistered),
        ConnectionEvent::RegistrationFailed { cause } => {
            tracing::warn!(%cause, "registration failed");
            shared.set_status(ConnectionStatus::RegistrationFailed);
        }
        ConnectionEvent::NewSession { session, direction } => match direction {
            Direction::Incoming => {
                tracing::info!(session = %session.id(), "incoming call");
                shared.sounds.play(SoundClip::Ringing, true);
                install_session(shared, session);
                shared.set_call_state(CallState::IncomingRinging);
                shared.set_incoming_visible(true);
            }
            Direction::Outgoing => {
                // handle was already captured from the call() return value
                tracing::debug!(session = %session.id(), "outgoing session announced");
            }
        },
    }
}

fn spawn_session_pump(
    shared: Arc<Shared>,
    session: Arc<dyn CallSession>,
    mut rx: broadcast::Receiver<SessionEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("session event stream lagged by {}", n);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            if handle_session_event(&shared, &session, event).await {
                break;
            }
        }
    })
}

/// Applies one session event; returns true when the session is over and the
/// pump should stop.
async fn handle_session_event(
    shared: &Arc<Shared>,
    session: &Arc<dyn CallSession>,
    event: SessionEvent,
) -> bool {
    match event {
        SessionEvent::Progress => {
            tracing::debug!(session = %session.id(), "call in progress");
            false
        }
        SessionEvent::Confirmed => {
            shared.sounds.play(SoundClip::Answered, false);
            shared.set_call_state(CallState::Active);
            false
        }
        SessionEvent::RemoteTrack { stream } => {
            route_remote(shared, stream);
            false
        }
        SessionEvent::Ended { cause } => {
            tracing::info!(session = %session.id(), %cause, "call ended");
            shared.sounds.play(SoundClip::Rejected, false);
            finish_call(shared, session).await;
            true
        }
        SessionEvent::Failed { cause } => {
            tracing::info!(session = %session.id(), %cause, "call failed");
            shared.sounds.stop();
            finish_call(shared, session).await;
            true
        }
        SessionEvent::MediaAcquisitionFailed { cause } => {
            tracing::warn!(session = %session.id(), %cause, "media acquisition failed");
            false
        }
        SessionEvent::NegotiationFailed { stage, cause } => {
            tracing::warn!(session = %session.id(), ?stage, %cause, "negotiation step failed");
            false
        }
        other => {
            tracing::debug!(session = %session.id(), event = ?other, "unhandled session event");
            false
        }
    }
}

/// Routes the first remote media stream to the remote audio sink; later
/// streams are ignored.
fn route_remote(shared: &Arc<Shared>, stream: MediaStream) {
    if shared.remote_attached.swap(true, Ordering::SeqCst) {
        tracing::debug!(stream = stream.id(), "additional remote stream ignored");
        return;
    }
    shared.remote_audio.attach(&stream);
}

/// Hang-up cleanup driven by a session event: clears banners, drops the
/// session slot and requests termination with the result discarded.
async fn finish_call(shared: &Arc<Shared>, session: &Arc<dyn CallSession>) {
    shared.clear_call_ui();

    if let Some(slot) = shared.take_session_if(session) {
        // this pump delivered the event; it stops itself, no abort needed
        drop(slot.pump);
        if let Err(e) = slot.session.terminate().await {
            tracing::debug!(session = %slot.session.id(), "terminate after call end failed: {}", e);
        }
    }

    shared.set_call_state(CallState::Ended);
    shared.set_call_state(CallState::Idle);
}

/// Puts a session into the slot, terminating and detaching any previous one.
///
/// The slot is filled before the pump is spawned; an event that ends the
/// session immediately still finds the slot and must never leave a dead
/// handle installed. The receiver is taken up front, so nothing emitted
/// in between is lost.
fn install_session(shared: &Arc<Shared>, session: Arc<dyn CallSession>) {
    shared.remote_attached.store(false, Ordering::SeqCst);

    let rx = session.events();
    let old = shared.session.lock().replace(SessionSlot {
        session: Arc::clone(&session),
        pump: None,
    });
    if let Some(old) = old {
        dispose_session(old);
    }

    let pump = spawn_session_pump(Arc::clone(shared), Arc::clone(&session), rx);
    let mut guard = shared.session.lock();
    match guard.as_mut() {
        Some(slot) if Arc::ptr_eq(&slot.session, &session) => slot.pump = Some(pump),
        // the session already ended and was removed; the pump stops itself
        _ => {}
    }
}

fn dispose_session(mut slot: SessionSlot) {
    slot.abort_pump();
    let session = slot.session;
    tokio::spawn(async move {
        if let Err(e) = session.terminate().await {
            tracing::debug!(session = %session.id(), "terminating replaced session failed: {}", e);
        }
    });
}

// ============================================================================
// CALL CONTROLLER
// ============================================================================

/// The softphone component: connect, place, answer and end calls.
pub struct CallController {
    backend: Arc<dyn SignalingBackend>,
    settings: SettingsStore,
    connection: RwLock<Option<Arc<dyn Connection>>>,
    conn_pump: Mutex<Option<JoinHandle<()>>>,
    shared: Arc<Shared>,
}

impl CallController {
    /// Controller without audio output; notification sounds are logged only.
    pub fn new(backend: Arc<dyn SignalingBackend>, settings: SettingsStore) -> Self {
        Self::with_audio(backend, settings, Arc::new(NullSink), Arc::new(NullSink))
    }

    pub fn with_audio(
        backend: Arc<dyn SignalingBackend>,
        settings: SettingsStore,
        sink: Arc<dyn AudioSink>,
        remote_audio: Arc<dyn RemoteAudioSink>,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            backend,
            settings,
            connection: RwLock::new(None),
            conn_pump: Mutex::new(None),
            shared: Arc::new(Shared {
                ui: RwLock::new(UiState::default()),
                session: Mutex::new(None),
                sounds: SoundPlayer::new(sink),
                remote_audio,
                remote_attached: AtomicBool::new(false),
                events,
            }),
        }
    }

    /// Change notifications for the host UI.
    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.shared.events.subscribe()
    }

    pub fn ui_state(&self) -> UiState {
        self.shared.ui.read().clone()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.shared.ui.read().connection_status
    }

    pub fn call_state(&self) -> CallState {
        self.shared.ui.read().call_state.clone()
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    /// What the notification player is currently playing, if anything.
    pub fn current_sound(&self) -> Option<(SoundClip, bool)> {
        self.shared.sounds.current()
    }

    /// Builds a connection from stored settings and starts registration.
    ///
    /// Returns once the transport is started; registration outcome arrives
    /// as `ConnectionStatus` changes.
    pub async fn connect(&self) -> Result<(), ControllerError> {
        self.open_connection().await.map(drop)
    }

    /// Like [`connect`](Self::connect), but waits (bounded by
    /// [`REGISTRATION_TIMEOUT`]) until registration succeeds or fails.
    pub async fn connect_and_wait(&self) -> Result<(), ControllerError> {
        let mut rx = self.open_connection().await?;

        let wait = tokio::time::timeout(REGISTRATION_TIMEOUT, async move {
            loop {
                match rx.recv().await {
                    Ok(ConnectionEvent::Registered) => return Ok(()),
                    Ok(ConnectionEvent::RegistrationFailed { cause }) => {
                        return Err(ControllerError::RegistrationFailed(cause));
                    }
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(ControllerError::RegistrationFailed(
                            "event stream closed".to_string(),
                        ));
                    }
                }
            }
        })
        .await;

        match wait {
            Ok(result) => result,
            Err(_) => Err(ControllerError::RegistrationTimeout),
        }
    }

    /// Places an outgoing audio call toward `destination`.
    ///
    /// An in-progress session is terminated first; without a connection, a
    /// lazy connect waits for registration before dialing. The destination
    /// is persisted as the last-dialed number.
    pub async fn outgoing_call(&self, destination: &str) -> Result<(), ControllerError> {
        let old = self.shared.session.lock().take();
        if let Some(mut slot) = old {
            slot.abort_pump();
            if let Err(e) = slot.session.terminate().await {
                tracing::debug!(
                    session = %slot.session.id(),
                    "terminating replaced session failed: {}", e
                );
            }
        }

        if self.connection.read().is_none() {
            self.connect_and_wait().await?;
        }
        let conn = self
            .connection
            .read()
            .as_ref()
            .map(Arc::clone)
            .ok_or(SignalingError::NotConnected)?;

        self.shared.set_call_state(CallState::OutgoingRinging {
            target: destination.to_string(),
        });
        self.shared.set_outgoing_visible(true);
        self.shared.sounds.play(SoundClip::Ringback, true);

        let session = conn.call(destination, CallOptions::audio_only()).await?;
        self.settings.set_outgoing_number(destination)?;
        install_session(&self.shared, session);
        Ok(())
    }

    /// Dials the stored last-dialed number.
    pub async fn redial(&self) -> Result<(), ControllerError> {
        let number = self.settings.outgoing_number()?;
        self.outgoing_call(&number).await
    }

    /// Ends the current call, if any. Idempotent; termination problems are
    /// logged and discarded.
    pub async fn hang_up(&self) {
        self.shared.clear_call_ui();

        let slot = self.shared.session.lock().take();
        if let Some(mut slot) = slot {
            slot.abort_pump();
            if let Err(e) = slot.session.terminate().await {
                tracing::debug!(session = %slot.session.id(), "terminate failed: {}", e);
            }
            self.shared.set_call_state(CallState::Ended);
        }

        self.shared.set_call_state(CallState::Idle);
    }

    /// Answers the current incoming call, if any, and silences the ringer.
    pub async fn accept_incoming_call(&self) {
        let session = self
            .shared
            .session
            .lock()
            .as_ref()
            .map(|slot| Arc::clone(&slot.session));

        if let Some(session) = session {
            self.shared.set_call_state(CallState::Connecting);
            if let Err(e) = session.answer().await {
                tracing::warn!(session = %session.id(), "answer failed: {}", e);
            }
        }

        self.shared.sounds.stop();
    }

    /// Explicit teardown: ends any call, closes the connection handle and
    /// reports `disconnected`.
    pub async fn shutdown(&self) {
        self.hang_up().await;

        if let Some(pump) = self.conn_pump.lock().take() {
            pump.abort();
        }

        let conn = self.connection.write().take();
        if let Some(conn) = conn {
            if let Err(e) = conn.close().await {
                tracing::debug!("connection close failed: {}", e);
            }
        }

        self.shared.set_status(ConnectionStatus::Disconnected);
    }

    /// Creates and starts a connection, replacing any previous one. The
    /// returned receiver was subscribed before registration started.
    async fn open_connection(
        &self,
    ) -> Result<broadcast::Receiver<ConnectionEvent>, ControllerError> {
        let settings = self.settings.load()?;
        let config = RegistrationConfig::from_settings(&settings)?;

        tracing::info!(server = %config.socket_url, identity = %config.identity, "connecting");
        let conn = self.backend.create(config)?;

        let wait_rx = conn.events();
        let pump = spawn_connection_pump(Arc::clone(&self.shared), conn.events());
        if let Some(old) = self.conn_pump.lock().replace(pump) {
            old.abort();
        }

        let old = self.connection.write().replace(Arc::clone(&conn));
        if let Some(old) = old {
            tokio::spawn(async move {
                if let Err(e) = old.close().await {
                    tracing::debug!("closing replaced connection failed: {}", e);
                }
            });
        }

        conn.start().await?;
        Ok(wait_rx)
    }
}

impl std::fmt::Debug for CallController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallController")
            .field("ui", &self.ui_state())
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================
