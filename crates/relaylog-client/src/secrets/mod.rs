//! Persistence for small secrets shared between protocol steps.
//!
//! Trait-based so the client never touches the filesystem directly. The
//! trait is synchronous; secrets are a few hundred bytes.

mod error;
mod file;
mod memory;

pub use error::SecretStoreError;
pub use file::FileSecrets;
pub use memory::MemorySecrets;

use crate::session::{SessionInfo, SessionKey};

/// Storage for the session key artifact, its connection details and logger
/// tokens.
///
/// Must be Clone, Send + Sync. Implementations share state internally, so
/// clones see the same secrets.
///
/// # Invariants
///
/// - A saved session key is returned by the next `load_session_key` until it
///   is replaced or cleared
/// - Saving never leaves a partially written key visible to readers, even
///   with several sessions saving into the same store at once
pub trait SecretStore: Clone + Send + Sync + 'static {
    /// Persist the session key, replacing any previous one.
    fn save_session_key(&self, key: &SessionKey) -> Result<(), SecretStoreError>;

    /// Persisted session key. `None` if no handshake has been saved.
    fn load_session_key(&self) -> Result<Option<SessionKey>, SecretStoreError>;

    /// Remove the persisted session key. Removing a missing key is not an
    /// error.
    fn clear_session_key(&self) -> Result<(), SecretStoreError>;

    /// Persist the connection details of the current session, replacing any
    /// previous ones.
    fn save_session_info(&self, info: &SessionInfo) -> Result<(), SecretStoreError>;

    /// Persisted connection details. `None` if none have been saved.
    fn load_session_info(&self) -> Result<Option<SessionInfo>, SecretStoreError>;

    /// Token for `logger`. `None` if no token is stored.
    fn load_token(&self, logger: &str) -> Result<Option<String>, SecretStoreError>;
}
