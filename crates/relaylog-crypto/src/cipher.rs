//! The cipher port.

use crate::error::CipherError;

/// Raw encrypt/decrypt capability keyed by a relay key string and an IV.
///
/// The envelope codec and the handshake only see this trait; the concrete
/// construction is chosen by whoever builds the client.
///
/// # Invariants
///
/// - `decrypt(encrypt(p, k, iv), k, iv) == p` for every accepted `k` and `iv`
/// - A failed `decrypt` returns no plaintext at all
/// - Callers never reuse an IV under the same key
pub trait Cipher {
    /// Encrypt `plaintext` under `key` with `iv`.
    ///
    /// # Errors
    ///
    /// - `CipherError::InvalidKey` / `InvalidIvLength` / `InvalidIvEncoding`
    ///   if the key or IV cannot be used
    fn encrypt(&self, plaintext: &[u8], key: &str, iv: &str) -> Result<Vec<u8>, CipherError>;

    /// Decrypt `ciphertext` under `key` with `iv`.
    ///
    /// # Errors
    ///
    /// - `CipherError::AuthenticationFailed` if the ciphertext was tampered
    ///   with or the key is wrong
    /// - Key/IV validation errors as for [`Cipher::encrypt`]
    fn decrypt(&self, ciphertext: &[u8], key: &str, iv: &str) -> Result<Vec<u8>, CipherError>;
}

impl<C: Cipher + ?Sized> Cipher for &C {
    fn encrypt(&self, plaintext: &[u8], key: &str, iv: &str) -> Result<Vec<u8>, CipherError> {
        (**self).encrypt(plaintext, key, iv)
    }

    fn decrypt(&self, ciphertext: &[u8], key: &str, iv: &str) -> Result<Vec<u8>, CipherError> {
        (**self).decrypt(ciphertext, key, iv)
    }
}
