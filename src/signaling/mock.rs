//! Scriptable in-memory signaling backend for controller tests.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::{
    CallOptions, CallSession, Connection, ConnectionEvent, Direction, RegistrationConfig,
    SessionEvent, SignalingBackend, SignalingError,
};

// ============================================================================
// BACKEND
// ============================================================================

/// How a [`MockConnection`] resolves registration after `start()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// `Registered` is emitted.
    Succeed,
    /// `RegistrationFailed` is emitted.
    Fail,
    /// Neither outcome is ever emitted; the transport just sits there.
    Stall,
}

/// Backend that hands out [`MockConnection`]s and counts how often it was
/// asked for one.
pub struct MockBackend {
    registration: RegistrationOutcome,
    creates: AtomicUsize,
    last: Mutex<Option<Arc<MockConnection>>>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Self::with_registration(RegistrationOutcome::Succeed)
    }

    pub fn failing_registration() -> Arc<Self> {
        Self::with_registration(RegistrationOutcome::Fail)
    }

    pub fn stalled_registration() -> Arc<Self> {
        Self::with_registration(RegistrationOutcome::Stall)
    }

    fn with_registration(registration: RegistrationOutcome) -> Arc<Self> {
        Arc::new(Self {
            registration,
            creates: AtomicUsize::new(0),
            last: Mutex::new(None),
        })
    }

    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    /// The most recently created connection. Panics when none exists.
    pub fn connection(&self) -> Arc<MockConnection> {
        self.last.lock().clone().expect("no connection created yet")
    }
}

impl SignalingBackend for MockBackend {
    fn create(&self, config: RegistrationConfig) -> Result<Arc<dyn Connection>, SignalingError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        let conn = Arc::new(MockConnection::new(config, self.registration));
        *self.last.lock() = Some(Arc::clone(&conn));
        Ok(conn)
    }
}

// ============================================================================
// CONNECTION
// ============================================================================

pub struct MockConnection {
    pub config: RegistrationConfig,
    registration: RegistrationOutcome,
    event_tx: broadcast::Sender<ConnectionEvent>,
    calls: Mutex<Vec<Arc<MockSession>>>,
    registered: AtomicBool,
    closed: AtomicBool,
}

impl MockConnection {
    fn new(config: RegistrationConfig, registration: RegistrationOutcome) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            config,
            registration,
            event_tx,
            calls: Mutex::new(Vec::new()),
            registered: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    pub fn emit(&self, event: ConnectionEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Simulates an incoming call offer and returns its session.
    pub fn push_incoming(&self, from: &str) -> Arc<MockSession> {
        let session = Arc::new(MockSession::new(Direction::Incoming, from));
        self.emit(ConnectionEvent::NewSession {
            session: Arc::clone(&session) as Arc<dyn CallSession>,
            direction: Direction::Incoming,
        });
        session
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn last_session(&self) -> Option<Arc<MockSession>> {
        self.calls.lock().last().cloned()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.event_tx.subscribe()
    }

    async fn start(&self) -> Result<(), SignalingError> {
        self.emit(ConnectionEvent::Connecting);
        self.emit(ConnectionEvent::Connected);
        match self.registration {
            RegistrationOutcome::Succeed => {
                self.registered.store(true, Ordering::SeqCst);
                self.emit(ConnectionEvent::Registered);
            }
            RegistrationOutcome::Fail => {
                self.emit(ConnectionEvent::RegistrationFailed {
                    cause: "credentials rejected".to_string(),
                });
            }
            RegistrationOutcome::Stall => {}
        }
        Ok(())
    }

    async fn call(
        &self,
        target: &str,
        _options: CallOptions,
    ) -> Result<Arc<dyn CallSession>, SignalingError> {
        let session = Arc::new(MockSession::new(Direction::Outgoing, target));
        self.calls.lock().push(Arc::clone(&session));
        self.emit(ConnectionEvent::NewSession {
            session: Arc::clone(&session) as Arc<dyn CallSession>,
            direction: Direction::Outgoing,
        });
        Ok(session)
    }

    async fn close(&self) -> Result<(), SignalingError> {
        self.closed.store(true, Ordering::SeqCst);
        self.registered.store(false, Ordering::SeqCst);
        self.emit(ConnectionEvent::Disconnected);
        Ok(())
    }

    fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }
}

// ============================================================================
// SESSION
// ============================================================================

pub struct MockSession {
    id: Uuid,
    direction: Direction,
    peer: String,
    event_tx: broadcast::Sender<SessionEvent>,
    answers: AtomicUsize,
    terminations: AtomicUsize,
    in_progress: AtomicBool,
}

impl MockSession {
    fn new(direction: Direction, peer: &str) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            id: Uuid::new_v4(),
            direction,
            peer: peer.to_string(),
            event_tx,
            answers: AtomicUsize::new(0),
            terminations: AtomicUsize::new(0),
            in_progress: AtomicBool::new(true),
        }
    }

    pub fn emit(&self, event: SessionEvent) {
        let _ = self.event_tx.send(event);
    }

    pub fn answer_count(&self) -> usize {
        self.answers.load(Ordering::SeqCst)
    }

    pub fn terminate_count(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for MockSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockSession")
            .field("id", &self.id)
            .field("direction", &self.direction)
            .field("peer", &self.peer)
            .finish()
    }
}

#[async_trait]
impl CallSession for MockSession {
    fn id(&self) -> Uuid {
        self.id
    }

    fn direction(&self) -> Direction {
        self.direction
    }

    fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    fn is_in_progress(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }

    async fn answer(&self) -> Result<(), SignalingError> {
        self.answers.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn terminate(&self) -> Result<(), SignalingError> {
        // terminating twice mirrors a library that throws on dead sessions
        if !self.in_progress.swap(false, Ordering::SeqCst) {
            self.terminations.fetch_add(1, Ordering::SeqCst);
            return Err(SignalingError::TerminateFailed(
                "session already closed".to_string(),
            ));
        }
        self.terminations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
