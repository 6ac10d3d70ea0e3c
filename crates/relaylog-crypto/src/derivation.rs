//! Cipher key derivation from relay key strings using HKDF

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::CipherError;

/// Size of the derived cipher key (32 bytes)
pub const CIPHER_KEY_SIZE: usize = 32;

/// Label used for cipher key derivation
const CIPHER_KEY_LABEL: &[u8] = b"relaylogEnvelopeV1";

/// A 32-byte symmetric key derived from a relay key string.
///
/// Zeroized on drop.
pub struct CipherKey {
    key: [u8; CIPHER_KEY_SIZE],
}

impl CipherKey {
    /// Raw key bytes for the AEAD.
    pub fn as_bytes(&self) -> &[u8; CIPHER_KEY_SIZE] {
        &self.key
    }
}

impl Drop for CipherKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CipherKey(..)")
    }
}

/// Derive a cipher key from a relay key string.
///
/// Both the long-lived client key and relay-issued session keys go through
/// this, so any non-empty key string yields 32 well-distributed bytes.
///
/// # Errors
///
/// - `CipherError::InvalidKey` if `key` is empty or only whitespace
pub fn derive_cipher_key(key: &str) -> Result<CipherKey, CipherError> {
    let material = key.trim();
    if material.is_empty() {
        return Err(CipherError::InvalidKey { reason: "key is empty".to_string() });
    }

    let hkdf = Hkdf::<Sha256>::new(None, material.as_bytes());

    let mut derived = [0u8; CIPHER_KEY_SIZE];
    let Ok(()) = hkdf.expand(CIPHER_KEY_LABEL, &mut derived) else {
        unreachable!("32 bytes is a valid HKDF-SHA256 output length");
    };

    Ok(CipherKey { key: derived })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_is_deterministic() {
        let a = derive_cipher_key("5a4b3c2d1e0f").unwrap();
        let b = derive_cipher_key("5a4b3c2d1e0f").unwrap();

        assert_eq!(a.as_bytes(), b.as_bytes(), "same key string must derive the same key");
    }

    #[test]
    fn different_keys_derive_different_material() {
        let a = derive_cipher_key("client-key").unwrap();
        let b = derive_cipher_key("session-key").unwrap();

        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let a = derive_cipher_key("K").unwrap();
        let b = derive_cipher_key(" K\n").unwrap();

        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(matches!(derive_cipher_key(""), Err(CipherError::InvalidKey { .. })));
        assert!(matches!(derive_cipher_key("  "), Err(CipherError::InvalidKey { .. })));
    }

    #[test]
    fn debug_does_not_leak_key() {
        let key = derive_cipher_key("secret").unwrap();
        assert_eq!(format!("{key:?}"), "CipherKey(..)");
    }
}
