//! Call Controller - user actions in, UI state out.

mod engine;
mod state;

pub use engine::{CallController, ControllerError, REGISTRATION_TIMEOUT};
pub use state::{CallState, ConnectionStatus, UiEvent, UiState};
