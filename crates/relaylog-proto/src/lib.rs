//! Relaylog Protocol Types
//!
//! Wire-level definitions for talking to a logging relay:
//!
//! - [`envelope`]: the `<iv>:<ciphertext-base64>` container and its plain-text
//!   fallback
//! - [`payloads`]: JSON messages carried inside envelopes (connection requests
//!   and responses, log requests)
//! - [`Request`]: an outbound message as a JSON object, ready to be sealed
//!
//! # Wire Format
//!
//! ```text
//! relay → client:  <iv-hex>:<base64(ciphertext)>\r\n\r\n
//! client → relay:  <iv-hex>:<client_id>:<base64(ciphertext)>\r\n\r\n
//! plain:           <json>\r\n\r\n
//! ```
//!
//! The codec never assumes the ciphertext is the last segment; callers pass
//! the segment index for the direction they are decoding.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod envelope;
pub mod errors;
pub mod payloads;
mod request;

pub use envelope::{
    Envelope, REQUEST_DATA_INDEX, RESPONSE_DATA_INDEX, SEGMENT_DELIMITER, decode, encode,
    encode_for_client, encode_plain,
};
pub use errors::{EnvelopeError, PayloadError};
pub use payloads::{
    ALLOW_BULK_LOG_REQUEST, ConnectResponse, ConnectionRequest, LogLevel, LogRequest,
    RequestType, ServerInfo,
};
pub use request::Request;

/// Terminates every packet on the stream, in both directions.
pub const PACKET_DELIMITER: &str = "\r\n\r\n";
