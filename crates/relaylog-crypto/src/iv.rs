//! Initialization vectors.
//!
//! IVs travel as lowercase hex in the first envelope segment. Random bytes are
//! supplied by the caller.

use std::fmt;

use crate::error::CipherError;

/// IV size in bytes (the `XChaCha20` nonce size)
pub const IV_SIZE: usize = 24;

/// A 24-byte initialization vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Iv([u8; IV_SIZE]);

impl Iv {
    /// Build an IV from caller-provided random bytes.
    ///
    /// Production callers MUST pass cryptographically secure randomness.
    pub fn from_random(bytes: [u8; IV_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parse the hex text carried on the wire.
    ///
    /// # Errors
    ///
    /// - `CipherError::InvalidIvEncoding` if `text` is not hex
    /// - `CipherError::InvalidIvLength` if it does not decode to 24 bytes
    pub fn parse(text: &str) -> Result<Self, CipherError> {
        let bytes =
            hex::decode(text.trim()).map_err(|e| CipherError::InvalidIvEncoding(e.to_string()))?;

        let actual = bytes.len();
        let array: [u8; IV_SIZE] = bytes
            .try_into()
            .map_err(|_| CipherError::InvalidIvLength { expected: IV_SIZE, actual })?;

        Ok(Self(array))
    }

    /// Raw IV bytes.
    pub fn as_bytes(&self) -> &[u8; IV_SIZE] {
        &self.0
    }

    /// Lowercase hex text for the wire.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Iv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
