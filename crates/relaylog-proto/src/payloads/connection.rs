//! Connection payloads: connect, acknowledge and touch requests, and the
//! relay's connect response.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::PayloadError;

/// Connection request type, serialized as its numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestType {
    /// Open a connection with the long-lived client key
    Connect,
    /// Confirm the session key issued by the relay
    Acknowledge,
    /// Keep an established session alive
    Touch,
}

impl RequestType {
    /// Numeric code used on the wire.
    pub fn code(self) -> u8 {
        match self {
            Self::Connect => 1,
            Self::Acknowledge => 2,
            Self::Touch => 3,
        }
    }

    /// Request type for a wire code. `None` for unknown codes.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Connect),
            2 => Some(Self::Acknowledge),
            3 => Some(Self::Touch),
            _ => None,
        }
    }
}

impl Serialize for RequestType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for RequestType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = u8::deserialize(deserializer)?;
        Self::from_code(code)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown request type {code}")))
    }
}

/// Connect, acknowledge or touch request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRequest {
    /// Unix seconds when the request was built
    #[serde(rename = "_t")]
    pub timestamp: u64,

    /// Client the request is for
    pub client_id: String,

    /// Request type
    #[serde(rename = "type")]
    pub kind: RequestType,
}

/// Relay flag: log requests may be sent as a JSON array.
pub const ALLOW_BULK_LOG_REQUEST: u64 = 16;

/// Relay version details, sent once the client is acknowledged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Relay version string
    #[serde(default)]
    pub version: String,
}

/// The relay's answer to a connect request.
///
/// `status` 0 is success. Any other status is a rejection and `error_text`
/// is the message to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectResponse {
    /// 0 on success
    pub status: i64,

    /// Human-readable rejection reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_text: Option<String>,

    /// Client id the session belongs to
    #[serde(default)]
    pub client_id: String,

    /// Session key issued for this connection
    #[serde(default)]
    pub key: String,

    /// 1 once the relay has seen an acknowledgement for this client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack: Option<u8>,

    /// Seconds the session key stays valid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u64>,

    /// Unix seconds when the relay created this client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<u64>,

    /// Port accepting log requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging_port: Option<u16>,

    /// Relay configuration flags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,

    /// Most log requests accepted in one bulk request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bulk_size: Option<u32>,

    /// Relay version details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_info: Option<ServerInfo>,
}

impl ConnectResponse {
    /// Parse a decrypted connect response.
    ///
    /// Rejections (`status != 0`) parse successfully; the caller decides what
    /// to do with them. Successful responses must name a client and a key.
    ///
    /// # Errors
    ///
    /// - `PayloadError::Json` if `bytes` is not a valid response object
    /// - `PayloadError::MissingField` if a success lacks `client_id` or `key`
    pub fn from_json(bytes: &[u8]) -> Result<Self, PayloadError> {
        let response: Self = serde_json::from_slice(bytes)?;

        if response.is_success() {
            if response.client_id.is_empty() {
                return Err(PayloadError::MissingField("client_id"));
            }
            if response.key.is_empty() {
                return Err(PayloadError::MissingField("key"));
            }
        }

        Ok(response)
    }

    /// True if the relay accepted the connection.
    pub fn is_success(&self) -> bool {
        self.status == 0
    }

    /// True if the relay reports the client as acknowledged.
    pub fn is_acknowledged(&self) -> bool {
        self.ack == Some(1)
    }

    /// Rejection text, empty when the relay sent none.
    pub fn error_text(&self) -> &str {
        self.error_text.as_deref().unwrap_or_default()
    }

    /// True if every bit of `flag` is set in the relay's flags.
    pub fn has_flag(&self, flag: u64) -> bool {
        self.flags.is_some_and(|flags| flags & flag == flag)
    }

    /// Largest batch the relay accepts in one bulk log request.
    ///
    /// `None` unless the relay sets [`ALLOW_BULK_LOG_REQUEST`] and announces
    /// a nonzero `max_bulk_size`.
    pub fn bulk_limit(&self) -> Option<u32> {
        if !self.has_flag(ALLOW_BULK_LOG_REQUEST) {
            return None;
        }
        self.max_bulk_size.filter(|&size| size > 0)
    }

    /// Relay version, if announced.
    pub fn server_version(&self) -> Option<&str> {
        self.server_info.as_ref().map(|info| info.version.as_str())
    }
}
