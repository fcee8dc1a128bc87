//! Settings Store - signaling credentials and last-dialed number.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::kv::{KvStore, StorageError};

/// Storage key holding the serialized [`SipSettings`] blob.
///
/// Key spelling is part of the on-disk contract; existing widget data is
/// stored under these exact names.
pub const SETTINGS_KEY: &str = "sipSettings";

/// Storage key holding the last-dialed destination number.
pub const OUTGOING_NUMBER_KEY: &str = "outgoingPhoneNumber";

/// Signaling credentials as entered by the user.
///
/// Plain strings with no validation; the server address is only parsed
/// when a connection is attempted. Serialized as camelCase JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SipSettings {
    pub server_address: String,
    pub identity: String,
    pub password: String,
}

/// Reads and writes [`SipSettings`] and the last-dialed number under two
/// fixed keys of the key-value store.
pub struct SettingsStore {
    kv: Arc<KvStore>,
}

impl SettingsStore {
    pub fn new(kv: Arc<KvStore>) -> Self {
        Self { kv }
    }

    /// Loads the stored settings; absence yields empty defaults, a
    /// malformed blob is an error.
    pub fn load(&self) -> Result<SipSettings, StorageError> {
        match self.kv.get(SETTINGS_KEY)? {
            Some(blob) => Ok(serde_json::from_str(&blob)?),
            None => Ok(SipSettings::default()),
        }
    }

    /// Serializes and overwrites the stored settings.
    pub fn save(&self, settings: &SipSettings) -> Result<(), StorageError> {
        let blob = serde_json::to_string(settings)?;
        self.kv.set(SETTINGS_KEY, &blob)
    }

    /// Last-dialed destination number, empty string when never set.
    pub fn outgoing_number(&self) -> Result<String, StorageError> {
        Ok(self.kv.get(OUTGOING_NUMBER_KEY)?.unwrap_or_default())
    }

    /// Overwrites the last-dialed destination number.
    pub fn set_outgoing_number(&self, number: &str) -> Result<(), StorageError> {
        self.kv.set(OUTGOING_NUMBER_KEY, number)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SettingsStore {
        SettingsStore::new(Arc::new(KvStore::open_in_memory().unwrap()))
    }

    #[test]
    fn load_without_save_yields_empty_fields() {
        let store = store();

        let settings = store.load().unwrap();
        assert_eq!(settings, SipSettings::default());
        assert_eq!(settings.server_address, "");
    }

    #[test]
    fn settings_round_trip() {
        let store = store();
        let settings = SipSettings {
            server_address: "a".to_string(),
            identity: "b".to_string(),
            password: "c".to_string(),
        };

        store.save(&settings).unwrap();
        assert_eq!(store.load().unwrap(), settings);
    }

    #[test]
    fn settings_blob_is_camel_case() {
        let store = store();
        store
            .save(&SipSettings {
                server_address: "wss://sip.example.com/ws".to_string(),
                identity: "sip:alice@example.com".to_string(),
                password: "secret".to_string(),
            })
            .unwrap();

        let blob = store.kv.get(SETTINGS_KEY).unwrap().unwrap();
        assert!(blob.contains("\"serverAddress\""));
        assert!(blob.contains("\"identity\""));
    }

    #[test]
    fn storage_keys_are_fixed() {
        let store = store();
        store.save(&SipSettings::default()).unwrap();
        store.set_outgoing_number("100").unwrap();

        assert!(store.kv.get("sipSettings").unwrap().is_some());
        assert_eq!(
            store.kv.get("outgoingPhoneNumber").unwrap().as_deref(),
            Some("100")
        );
    }

    #[test]
    fn malformed_blob_is_an_error() {
        let store = store();
        store.kv.set(SETTINGS_KEY, "{not json").unwrap();

        assert!(matches!(
            store.load(),
            Err(StorageError::MalformedBlob(_))
        ));
    }

    #[test]
    fn outgoing_number_defaults_and_overwrites() {
        let store = store();

        assert_eq!(store.outgoing_number().unwrap(), "");

        store.set_outgoing_number("100").unwrap();
        store.set_outgoing_number("0123456789").unwrap();
        assert_eq!(store.outgoing_number().unwrap(), "0123456789");
    }
}
