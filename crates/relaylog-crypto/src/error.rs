//! Error types for cipher operations

use thiserror::Error;

/// Errors from the cipher port.
///
/// Every variant is fatal for the message it was raised on. A failed
/// decryption never yields partial plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    /// Key string cannot be used as key material
    #[error("invalid key: {reason}")]
    InvalidKey {
        /// Why the key was rejected
        reason: String,
    },

    /// IV text is not valid hex of the expected length
    #[error("invalid iv: expected {expected} bytes, got {actual}")]
    InvalidIvLength {
        /// Expected IV length in bytes
        expected: usize,
        /// Decoded IV length in bytes
        actual: usize,
    },

    /// IV text is not hex
    #[error("invalid iv encoding: {0}")]
    InvalidIvEncoding(String),

    /// Ciphertext is shorter than the authentication tag
    #[error("ciphertext truncated: {len} bytes is shorter than the {tag}-byte tag")]
    Truncated {
        /// Ciphertext length
        len: usize,
        /// Tag length
        tag: usize,
    },

    /// Authentication tag mismatch (tampering or wrong key)
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Encryption failed inside the AEAD implementation
    #[error("encryption failed")]
    EncryptionFailed,
}
