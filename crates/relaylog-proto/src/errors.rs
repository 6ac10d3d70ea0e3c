//! Error types for envelope and payload handling.
//!
//! Envelope errors cover the framing (segment layout, base64) and wrap cipher
//! failures raised while sealing or opening. Payload errors cover the JSON
//! carried inside.

use relaylog_crypto::CipherError;
use thiserror::Error;

/// Errors from encoding or decoding an envelope.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// Requested ciphertext segment does not exist
    #[error("malformed envelope: segment {index} requested but only {segments} present")]
    SegmentOutOfRange {
        /// Requested segment index
        index: usize,
        /// Number of segments in the wire text
        segments: usize,
    },

    /// Segment 0 is the IV and cannot carry ciphertext
    #[error("malformed envelope: segment 0 holds the iv, not ciphertext")]
    IvSegmentSelected,

    /// IV segment is empty
    #[error("malformed envelope: empty iv")]
    EmptyIv,

    /// Ciphertext segment is not valid base64
    #[error("malformed envelope: invalid base64 ciphertext: {0}")]
    InvalidBase64(String),

    /// A field placed into the wire text contains the segment delimiter
    #[error("malformed envelope: {field} contains ':'")]
    DelimiterInField {
        /// Offending field
        field: &'static str,
    },

    /// Cipher port failed while sealing or opening
    #[error(transparent)]
    Cipher(#[from] CipherError),
}

impl EnvelopeError {
    /// True if the failure came from the cipher rather than the framing.
    pub fn is_cipher(&self) -> bool {
        matches!(self, Self::Cipher(_))
    }
}

/// Errors from parsing or building JSON payloads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// Payload is not valid JSON for the expected shape
    #[error("invalid payload: {0}")]
    Json(String),

    /// Payload decoded but a required field is missing or empty
    #[error("invalid payload: missing required field `{0}`")]
    MissingField(&'static str),

    /// Payload is not a JSON object
    #[error("invalid payload: expected a JSON object")]
    NotAnObject,
}

impl From<serde_json::Error> for PayloadError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cipher_errors_are_distinguished() {
        assert!(EnvelopeError::Cipher(CipherError::AuthenticationFailed).is_cipher());
        assert!(!EnvelopeError::EmptyIv.is_cipher());
        assert!(!EnvelopeError::SegmentOutOfRange { index: 3, segments: 2 }.is_cipher());
    }

    #[test]
    fn cipher_error_display_is_transparent() {
        let err = EnvelopeError::from(CipherError::AuthenticationFailed);
        assert_eq!(err.to_string(), "authentication failed");
    }

    #[test]
    fn missing_field_display() {
        assert_eq!(
            PayloadError::MissingField("key").to_string(),
            "invalid payload: missing required field `key`"
        );
    }
}
