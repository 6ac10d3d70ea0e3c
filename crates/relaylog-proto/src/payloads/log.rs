//! Log request payload.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::PayloadError;

/// Log severity, serialized as the relay's bit-flag code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    /// Applies to every level
    Global,
    /// Tracing detail
    Trace,
    /// Debugging detail
    Debug,
    /// Unrecoverable failure
    Fatal,
    /// Error
    Error,
    /// Warning
    Warning,
    /// Verbose detail, qualified by a verbose level
    Verbose,
    /// Informational
    Info,
}

impl LogLevel {
    /// Every level, in code order.
    pub const ALL: [Self; 8] = [
        Self::Global,
        Self::Trace,
        Self::Debug,
        Self::Fatal,
        Self::Error,
        Self::Warning,
        Self::Verbose,
        Self::Info,
    ];

    /// Numeric code used on the wire.
    pub fn code(self) -> u16 {
        match self {
            Self::Global => 1,
            Self::Trace => 2,
            Self::Debug => 4,
            Self::Fatal => 8,
            Self::Error => 16,
            Self::Warning => 32,
            Self::Verbose => 64,
            Self::Info => 128,
        }
    }

    /// Level for a wire code. `None` for unknown codes.
    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.code() == code)
    }

    /// Lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Fatal => "fatal",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Verbose => "verbose",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LogLevel {
    type Err = PayloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "warn" => Ok(Self::Warning),
            other => Self::ALL
                .into_iter()
                .find(|level| level.name() == other)
                .ok_or_else(|| PayloadError::Json(format!("unknown log level `{s}`"))),
        }
    }
}

impl Serialize for LogLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.code())
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = u16::deserialize(deserializer)?;
        Self::from_code(code)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown log level code {code}")))
    }
}

/// One log line sent to the relay.
///
/// Authenticated requests carry `token`; raw requests carry `_t` (unix
/// seconds) and `datetime` (unix millis) instead. `client_id` is only set on
/// unencrypted requests, where the relay cannot infer it from the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRequest {
    /// Logger access token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Unix seconds
    #[serde(rename = "_t", default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,

    /// Unix milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datetime: Option<u64>,

    /// Client id, for unencrypted requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Logger id
    pub logger: String,

    /// Message text
    pub msg: String,

    /// Source file
    pub file: String,

    /// Source line
    pub line: u32,

    /// Application name
    pub app: String,

    /// Severity
    pub level: LogLevel,

    /// Source function
    #[serde(rename = "func", default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,

    /// Thread name or id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<String>,

    /// Verbose level, for [`LogLevel::Verbose`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlevel: Option<u8>,
}

impl LogRequest {
    /// True if authenticated by token rather than timestamps.
    pub fn is_token_based(&self) -> bool {
        self.token.is_some()
    }
}
