//! In-memory secret store.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use super::{SecretStore, SecretStoreError};
use crate::session::{SessionInfo, SessionKey};

/// In-memory secret store for tests and one-shot sessions.
///
/// Clones share state. A poisoned lock surfaces as
/// [`SecretStoreError::Poisoned`] instead of panicking.
#[derive(Clone, Default)]
pub struct MemorySecrets {
    inner: Arc<Mutex<MemorySecretsInner>>,
}

#[derive(Default)]
struct MemorySecretsInner {
    session_key: Option<SessionKey>,
    info: Option<SessionInfo>,
    tokens: HashMap<String, String>,
}

impl MemorySecrets {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a logger token. Overwrites any existing token for `logger`.
    ///
    /// # Errors
    ///
    /// - `SecretStoreError::Poisoned` if another holder of the lock panicked
    pub fn insert_token(
        &self,
        logger: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<(), SecretStoreError> {
        self.lock()?.tokens.insert(logger.into(), token.into());
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemorySecretsInner>, SecretStoreError> {
        self.inner.lock().map_err(|_| SecretStoreError::Poisoned)
    }
}

impl SecretStore for MemorySecrets {
    fn save_session_key(&self, key: &SessionKey) -> Result<(), SecretStoreError> {
        self.lock()?.session_key = Some(key.clone());
        Ok(())
    }

    fn load_session_key(&self) -> Result<Option<SessionKey>, SecretStoreError> {
        Ok(self.lock()?.session_key.clone())
    }

    fn clear_session_key(&self) -> Result<(), SecretStoreError> {
        self.lock()?.session_key = None;
        Ok(())
    }

    fn save_session_info(&self, info: &SessionInfo) -> Result<(), SecretStoreError> {
        self.lock()?.info = Some(info.clone());
        Ok(())
    }

    fn load_session_info(&self) -> Result<Option<SessionInfo>, SecretStoreError> {
        Ok(self.lock()?.info.clone())
    }

    fn load_token(&self, logger: &str) -> Result<Option<String>, SecretStoreError> {
        Ok(self.lock()?.tokens.get(logger).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let secrets = MemorySecrets::new();
        let clone = secrets.clone();

        secrets.save_session_key(&SessionKey::new("K")).unwrap();

        assert_eq!(clone.load_session_key().unwrap(), Some(SessionKey::new("K")));
    }

    #[test]
    fn clear_is_idempotent() {
        let secrets = MemorySecrets::new();

        secrets.clear_session_key().unwrap();
        secrets.save_session_key(&SessionKey::new("K")).unwrap();
        secrets.clear_session_key().unwrap();
        secrets.clear_session_key().unwrap();

        assert_eq!(secrets.load_session_key().unwrap(), None);
    }

    #[test]
    fn tokens_are_per_logger() {
        let secrets = MemorySecrets::new();
        secrets.insert_token("a", "tok-a").unwrap();

        assert_eq!(secrets.load_token("a").unwrap().as_deref(), Some("tok-a"));
        assert_eq!(secrets.load_token("b").unwrap(), None);
    }

    #[test]
    fn poisoned_lock_is_reported_by_every_method() {
        let secrets = MemorySecrets::new();
        let clone = secrets.clone();
        let _ = std::thread::spawn(move || {
            let _guard = clone.inner.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert_eq!(secrets.insert_token("a", "tok-a"), Err(SecretStoreError::Poisoned));
        assert_eq!(secrets.load_token("a"), Err(SecretStoreError::Poisoned));
        assert_eq!(secrets.load_session_key(), Err(SecretStoreError::Poisoned));
        assert_eq!(secrets.load_session_info(), Err(SecretStoreError::Poisoned));
    }

    #[test]
    fn session_info_round_trips() {
        let secrets = MemorySecrets::new();
        let info = SessionInfo { logging_port: Some(9000), ..SessionInfo::default() };

        assert_eq!(secrets.load_session_info().unwrap(), None);
        secrets.save_session_info(&info).unwrap();

        assert_eq!(secrets.load_session_info().unwrap(), Some(info));
    }
}
