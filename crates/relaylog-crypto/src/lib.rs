//! Relaylog Cryptographic Primitives
//!
//! The cipher port consumed by the envelope codec and the handshake, plus the
//! AEAD adapter that ships with the workspace. Pure functions with
//! deterministic outputs. Callers provide random bytes for IV generation so
//! tests stay deterministic.
//!
//! # Key Handling
//!
//! Relay keys are opaque strings: the long-lived client key from the
//! connection descriptor and the short-lived session key issued during the
//! handshake. Neither is used directly as cipher key material.
//!
//! ```text
//! Relay key string
//!        │
//!        ▼
//! HKDF-SHA256 → 32-byte cipher key
//!        │
//!        ▼
//! XChaCha20-Poly1305 (24-byte IV) → Ciphertext || Tag
//! ```
//!
//! # Security
//!
//! Authenticity:
//! - XChaCha20-Poly1305 AEAD rejects tampered ciphertext
//! - Failed authentication tag -> `CipherError::AuthenticationFailed`, no
//!   plaintext is returned
//!
//! IV discipline:
//! - IVs are 24 random bytes, hex encoded on the wire
//! - The cipher does not track IV reuse; the client's outbound sender does

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod cipher;
mod derivation;
mod error;
mod iv;
mod xchacha;

pub use cipher::Cipher;
pub use derivation::{CIPHER_KEY_SIZE, CipherKey, derive_cipher_key};
pub use error::CipherError;
pub use iv::{IV_SIZE, Iv};
pub use xchacha::{TAG_SIZE, XChaChaCipher};
