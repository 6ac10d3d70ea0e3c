//! Envelope codec.
//!
//! An envelope is the text that travels on the stream. It is either plain
//! (a single segment, passed through verbatim) or encrypted:
//!
//! ```text
//! <iv>:<base64>              relay responses, ciphertext at index 1
//! <iv>:<client_id>:<base64>  client requests, ciphertext at index 2
//! ```
//!
//! Decoding takes the ciphertext from an explicit segment index instead of
//! assuming the last segment, so multi-field variants stay readable. The codec
//! is pure: bytes go to the cipher port in memory.

use base64::{
    Engine, alphabet,
    engine::{
        DecodePaddingMode,
        general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD},
    },
};
use relaylog_crypto::Cipher;

use crate::errors::EnvelopeError;

/// Separates envelope segments.
pub const SEGMENT_DELIMITER: char = ':';

/// Ciphertext position in relay responses (`<iv>:<base64>`).
pub const RESPONSE_DATA_INDEX: usize = 1;

/// Ciphertext position in client requests (`<iv>:<client_id>:<base64>`).
pub const REQUEST_DATA_INDEX: usize = 2;

/// Decoding engine: padding optional, trailing bits tolerated.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decoded wire text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    /// Unencrypted payload, exactly as received
    Plain(Vec<u8>),

    /// Encrypted payload
    Encrypted {
        /// IV text from segment 0, whitespace trimmed
        iv: String,
        /// Base64-decoded ciphertext from the selected segment
        ciphertext: Vec<u8>,
    },
}

impl Envelope {
    /// True for the plain-text fallback.
    pub fn is_plain(&self) -> bool {
        matches!(self, Self::Plain(_))
    }

    /// Payload bytes, decrypting with `key` when encrypted.
    ///
    /// # Errors
    ///
    /// - `EnvelopeError::Cipher` if decryption fails; no partial plaintext is
    ///   returned
    pub fn open<C: Cipher + ?Sized>(&self, cipher: &C, key: &str) -> Result<Vec<u8>, EnvelopeError> {
        match self {
            Self::Plain(bytes) => Ok(bytes.clone()),
            Self::Encrypted { iv, ciphertext } => Ok(cipher.decrypt(ciphertext, key, iv)?),
        }
    }
}

/// Seal `plaintext` as `<iv>:<base64>`.
///
/// # Errors
///
/// - `EnvelopeError::EmptyIv` / `DelimiterInField` if `iv` cannot be framed
/// - `EnvelopeError::Cipher` if the cipher port rejects the key or IV
pub fn encode<C: Cipher + ?Sized>(
    plaintext: &[u8],
    iv: &str,
    key: &str,
    cipher: &C,
) -> Result<String, EnvelopeError> {
    check_iv(iv)?;
    let ciphertext = cipher.encrypt(plaintext, key, iv)?;

    Ok(format!("{iv}{SEGMENT_DELIMITER}{}", STANDARD.encode(ciphertext)))
}

/// Seal `plaintext` as `<iv>:<client_id>:<base64>`.
///
/// The relay reads the client id to pick the decryption key, then the
/// ciphertext at [`REQUEST_DATA_INDEX`].
///
/// # Errors
///
/// As [`encode`], plus `DelimiterInField` if `client_id` contains `:`.
pub fn encode_for_client<C: Cipher + ?Sized>(
    plaintext: &[u8],
    iv: &str,
    key: &str,
    client_id: &str,
    cipher: &C,
) -> Result<String, EnvelopeError> {
    check_iv(iv)?;
    if client_id.contains(SEGMENT_DELIMITER) {
        return Err(EnvelopeError::DelimiterInField { field: "client_id" });
    }
    let ciphertext = cipher.encrypt(plaintext, key, iv)?;

    Ok(format!(
        "{iv}{SEGMENT_DELIMITER}{client_id}{SEGMENT_DELIMITER}{}",
        STANDARD.encode(ciphertext)
    ))
}

/// Plain-text envelope for relays that accept unencrypted requests.
///
/// The relay tells plain JSON apart from sealed text by the IV prefix, so the
/// payload is passed through untouched.
pub fn encode_plain(payload: &str) -> String {
    payload.to_owned()
}

/// Decode wire text, taking ciphertext from `segment_index`.
///
/// A single segment is [`Envelope::Plain`] and never an error.
///
/// # Errors
///
/// - `EnvelopeError::IvSegmentSelected` if `segment_index` is 0
/// - `EnvelopeError::SegmentOutOfRange` if `segment_index` has no segment
/// - `EnvelopeError::EmptyIv` if segment 0 is blank
/// - `EnvelopeError::InvalidBase64` if the selected segment is not base64
pub fn decode(wire: &str, segment_index: usize) -> Result<Envelope, EnvelopeError> {
    let segments: Vec<&str> = wire.split(SEGMENT_DELIMITER).collect();

    if segments.len() == 1 {
        return Ok(Envelope::Plain(wire.as_bytes().to_vec()));
    }

    if segment_index == 0 {
        return Err(EnvelopeError::IvSegmentSelected);
    }

    let Some(data) = segments.get(segment_index) else {
        return Err(EnvelopeError::SegmentOutOfRange {
            index: segment_index,
            segments: segments.len(),
        });
    };

    let iv = segments[0].trim();
    if iv.is_empty() {
        return Err(EnvelopeError::EmptyIv);
    }

    // Responses arrive with trailing line breaks.
    let ciphertext =
        LENIENT.decode(data.trim()).map_err(|e| EnvelopeError::InvalidBase64(e.to_string()))?;

    Ok(Envelope::Encrypted { iv: iv.to_owned(), ciphertext })
}

fn check_iv(iv: &str) -> Result<(), EnvelopeError> {
    if iv.trim().is_empty() {
        return Err(EnvelopeError::EmptyIv);
    }
    if iv.contains(SEGMENT_DELIMITER) {
        return Err(EnvelopeError::DelimiterInField { field: "iv" });
    }
    Ok(())
}
