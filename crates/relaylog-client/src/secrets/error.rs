//! Secret store errors.

use thiserror::Error;

/// Errors from reading or writing persisted secrets.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecretStoreError {
    /// Filesystem operation failed
    #[error("io error: {0}")]
    Io(String),

    /// Stored artifact is unreadable
    #[error("corrupt secret: {0}")]
    Corrupt(String),

    /// Name cannot be used as a storage key
    #[error("invalid name `{0}`")]
    InvalidName(String),

    /// Internal lock poisoned by a panicking writer
    #[error("secret store lock poisoned")]
    Poisoned,
}
