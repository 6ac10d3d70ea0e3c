//! Cipher port adapter using `XChaCha20-Poly1305`
//!
//! Stateless: the key is derived per call from the relay key string and the
//! IV is parsed from its wire text.

use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};

use crate::{cipher::Cipher, derivation::derive_cipher_key, error::CipherError, iv::Iv};

/// Poly1305 tag size (16 bytes)
pub const TAG_SIZE: usize = 16;

/// `XChaCha20-Poly1305` implementation of [`Cipher`].
///
/// Ciphertext is `encrypted || tag`, so it is always [`TAG_SIZE`] bytes longer
/// than the plaintext.
#[derive(Debug, Clone, Copy, Default)]
pub struct XChaChaCipher;

impl XChaChaCipher {
    /// Create the cipher.
    pub fn new() -> Self {
        Self
    }

    fn prepare(key: &str, iv: &str) -> Result<(XChaCha20Poly1305, Iv), CipherError> {
        let iv = Iv::parse(iv)?;
        let key = derive_cipher_key(key)?;
        let aead = XChaCha20Poly1305::new(key.as_bytes().into());
        Ok((aead, iv))
    }
}

impl Cipher for XChaChaCipher {
    fn encrypt(&self, plaintext: &[u8], key: &str, iv: &str) -> Result<Vec<u8>, CipherError> {
        let (aead, iv) = Self::prepare(key, iv)?;

        aead.encrypt(XNonce::from_slice(iv.as_bytes()), plaintext)
            .map_err(|_| CipherError::EncryptionFailed)
    }

    fn decrypt(&self, ciphertext: &[u8], key: &str, iv: &str) -> Result<Vec<u8>, CipherError> {
        let (aead, iv) = Self::prepare(key, iv)?;

        if ciphertext.len() < TAG_SIZE {
            return Err(CipherError::Truncated { len: ciphertext.len(), tag: TAG_SIZE });
        }

        aead.decrypt(XNonce::from_slice(iv.as_bytes()), ciphertext)
            .map_err(|_| CipherError::AuthenticationFailed)
    }
}
