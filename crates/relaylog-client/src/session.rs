//! Session state: long-lived client credentials, the short-lived session
//! key issued by the relay and the connection details that came with it.
//!
//! The handshake is the only writer of the session key. Request building only
//! reads. Each concurrent session owns its own [`SessionStore`].

use std::{fmt, path::Path};

use relaylog_proto::ConnectResponse;
use serde::{Deserialize, Serialize};

use crate::{
    error::ClientError,
    secrets::{SecretStore, SecretStoreError},
};

/// Client identity and long-lived key from the connection descriptor.
///
/// Immutable for the life of the process.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ClientCredentials {
    client_id: String,
    key: String,
}

impl ClientCredentials {
    /// Credentials from parts.
    pub fn new(client_id: impl Into<String>, key: impl Into<String>) -> Self {
        Self { client_id: client_id.into(), key: key.into() }
    }

    /// Parse a connection descriptor (`{"client_id": .., "key": ..}`).
    ///
    /// Extra fields are ignored, so a saved connect response also works.
    ///
    /// # Errors
    ///
    /// - `SecretStoreError::Corrupt` if the JSON is invalid or a field is
    ///   empty
    pub fn from_json(bytes: &[u8]) -> Result<Self, SecretStoreError> {
        let credentials: Self = serde_json::from_slice(bytes)
            .map_err(|e| SecretStoreError::Corrupt(format!("connection descriptor: {e}")))?;

        if credentials.client_id.is_empty() || credentials.key.is_empty() {
            return Err(SecretStoreError::Corrupt(
                "connection descriptor: client_id and key must be non-empty".to_string(),
            ));
        }

        Ok(credentials)
    }

    /// Load a connection descriptor file.
    ///
    /// # Errors
    ///
    /// - `SecretStoreError::Io` if the file cannot be read
    /// - `SecretStoreError::Corrupt` as for [`ClientCredentials::from_json`]
    pub fn from_descriptor_file(path: impl AsRef<Path>) -> Result<Self, SecretStoreError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| SecretStoreError::Io(format!("{}: {e}", path.display())))?;
        Self::from_json(&bytes)
    }

    /// Client id.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Long-lived client key.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Session key issued by the relay during the handshake.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey {
    value: String,
}

impl SessionKey {
    /// Wrap a key value.
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into() }
    }

    /// Key value.
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey(<redacted>)")
    }
}

/// Connection details announced with the session key.
///
/// Persisted next to the key so later processes reuse the relay's logging
/// port and know when the session needs a touch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Port accepting log requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging_port: Option<u16>,

    /// Seconds the session stays valid; 0 or absent never expires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u64>,

    /// Unix seconds the current lifetime started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<u64>,

    /// Largest bulk log request, when the relay allows bulk requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bulk_limit: Option<u32>,

    /// Relay version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_version: Option<String>,
}

impl SessionInfo {
    /// Details from an accepted connect response.
    pub fn from_response(response: &ConnectResponse) -> Self {
        Self {
            logging_port: response.logging_port,
            age: response.age,
            date_created: response.date_created,
            bulk_limit: response.bulk_limit(),
            server_version: response.server_version().map(str::to_string),
        }
    }

    fn lifetime(&self) -> Option<(u64, u64)> {
        let age = self.age.filter(|&age| age > 0)?;
        Some((age, self.date_created.unwrap_or_default()))
    }

    /// False once `age` seconds have passed since `date_created`.
    pub fn is_valid(&self, now_secs: u64) -> bool {
        self.lifetime()
            .is_none_or(|(age, created)| now_secs.saturating_sub(created) < age)
    }

    /// True when less than `threshold_secs` of the lifetime remains.
    pub fn should_touch(&self, now_secs: u64, threshold_secs: u64) -> bool {
        self.lifetime().is_some_and(|(age, created)| {
            age.saturating_sub(now_secs.saturating_sub(created)) < threshold_secs
        })
    }

    /// Restart the lifetime at `now_secs`, after a touch.
    pub fn touched(&mut self, now_secs: u64) {
        if self.lifetime().is_some() {
            self.date_created = Some(now_secs);
        }
    }
}

/// Per-session secrets.
///
/// # Invariants
///
/// - Credentials never change after construction
/// - The session key is replaced wholesale (last write wins)
#[derive(Debug, Clone)]
pub struct SessionStore {
    credentials: ClientCredentials,
    session_key: Option<SessionKey>,
    info: Option<SessionInfo>,
    token: Option<String>,
}

impl SessionStore {
    /// Fresh store with no session key.
    pub fn new(credentials: ClientCredentials) -> Self {
        Self { credentials, session_key: None, info: None, token: None }
    }

    /// Store restored from persisted secrets.
    ///
    /// Picks up a session key and connection details saved by an earlier
    /// process, so requests can be sent without a new handshake.
    ///
    /// # Errors
    ///
    /// - `ClientError::Persistence` if the secret store cannot be read
    pub fn resume<S: SecretStore>(
        credentials: ClientCredentials,
        secrets: &S,
    ) -> Result<Self, ClientError> {
        let session_key = secrets.load_session_key()?;
        if session_key.is_some() {
            tracing::debug!(client_id = credentials.client_id(), "resumed persisted session key");
        }
        let info = secrets.load_session_info()?;
        Ok(Self { credentials, session_key, info, token: None })
    }

    /// Long-lived credentials.
    pub fn credentials(&self) -> &ClientCredentials {
        &self.credentials
    }

    /// Current session key, if a handshake has completed or one was resumed.
    pub fn session_key(&self) -> Option<&SessionKey> {
        self.session_key.as_ref()
    }

    /// Replace the session key.
    pub fn set_session_key(&mut self, key: SessionKey) {
        self.session_key = Some(key);
    }

    /// Forget the session key.
    pub fn clear_session_key(&mut self) {
        self.session_key = None;
    }

    /// Connection details of the current session.
    pub fn info(&self) -> Option<&SessionInfo> {
        self.info.as_ref()
    }

    /// Mutable connection details.
    pub fn info_mut(&mut self) -> Option<&mut SessionInfo> {
        self.info.as_mut()
    }

    /// Replace the connection details.
    pub fn set_info(&mut self, info: Option<SessionInfo>) {
        self.info = info;
    }

    /// Logger token for token-based requests.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Set the logger token.
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    /// Load the token for `logger` from `secrets`. Returns whether one was
    /// found.
    ///
    /// # Errors
    ///
    /// - `ClientError::Persistence` if the token cannot be read
    pub fn load_token<S: SecretStore>(
        &mut self,
        secrets: &S,
        logger: &str,
    ) -> Result<bool, ClientError> {
        match secrets.load_token(logger)? {
            Some(token) => {
                self.token = Some(token);
                Ok(true)
            },
            None => Ok(false),
        }
    }
}
