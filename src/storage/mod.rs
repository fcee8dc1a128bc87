//! Storage module - persistent key-value store and settings.
//!
//! This module persists what survives a restart:
//! - the signaling credentials (server address, identity, password)
//! - the last-dialed destination number
//!

mod kv;
mod settings;

pub use kv::{KvStore, StorageError};
pub use settings::{SettingsStore, SipSettings, OUTGOING_NUMBER_KEY, SETTINGS_KEY};
