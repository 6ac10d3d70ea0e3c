//! Error types for the relaylog client.
//!
//! One taxonomy for everything the protocol layer can surface. Lower-layer
//! errors (envelope, cipher, payload, persistence) convert into the variant
//! the caller acts on. Nothing is retried here; the caller owns retry policy.

use std::time::Duration;

use relaylog_crypto::CipherError;
use relaylog_proto::{EnvelopeError, PayloadError};
use thiserror::Error;

use crate::{handshake::HandshakeState, secrets::SecretStoreError};

/// Errors surfaced by the client state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Wire text could not be framed (segment count/index, base64)
    #[error(transparent)]
    MalformedEnvelope(EnvelopeError),

    /// Cipher port failed (bad key/IV, authentication failure)
    #[error("cipher error: {0}")]
    Cipher(#[from] CipherError),

    /// Decrypted payload is not the expected JSON
    #[error("protocol error: {0}")]
    Protocol(#[from] PayloadError),

    /// Relay answered the connect request with a nonzero status
    ///
    /// Displays as `error_text` verbatim.
    #[error("{error_text}")]
    RelayRejected {
        /// Status code from the relay
        status: i64,
        /// Relay's message
        error_text: String,
    },

    /// Token-based request built before a token was available
    #[error("no active session: token-based request requires a session token")]
    NoActiveSession,

    /// Session key required but no handshake has completed
    #[error("no session key: connect before sending requests")]
    NoSessionKey,

    /// Operation not valid in the handshake's current state
    #[error("invalid state transition: cannot {operation} from {state:?}")]
    InvalidState {
        /// State when the operation was attempted
        state: HandshakeState,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// IV already used under the current key
    #[error("iv reuse rejected: iv already used under the current key")]
    IvReuse,

    /// Relay did not answer in time
    #[error("response timeout after {elapsed:?}")]
    ResponseTimeout {
        /// How long we waited
        elapsed: Duration,
    },

    /// Reading or writing a persisted secret failed
    #[error("persistence error: {0}")]
    Persistence(#[from] SecretStoreError),

    /// Underlying transport failed
    #[error("transport error: {0}")]
    Transport(String),
}

impl ClientError {
    /// Returns true if the caller may retry with a fresh handshake.
    ///
    /// Only timeouts and transport failures are transient. Relay rejections,
    /// cipher and protocol failures mean retrying would fail the same way.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ResponseTimeout { .. } | Self::Transport(_))
    }

    /// Message for the end user.
    ///
    /// For relay rejections this is the relay's `error_text`, unaltered.
    pub fn user_message(&self) -> String {
        match self {
            Self::RelayRejected { error_text, .. } => error_text.clone(),
            other => other.to_string(),
        }
    }
}

impl From<EnvelopeError> for ClientError {
    fn from(err: EnvelopeError) -> Self {
        match err {
            EnvelopeError::Cipher(cipher) => Self::Cipher(cipher),
            framing => Self::MalformedEnvelope(framing),
        }
    }
}
