//! Client events and actions.

use crate::{
    request::LogEntry,
    session::{SessionInfo, SessionKey},
};

/// Relay listener a message is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayPort {
    /// Connection requests: connect, acknowledge, touch
    Connect,
    /// Log requests
    Logging,
}

/// Events the caller feeds into the client.
///
/// The caller is responsible for:
/// - Delivering the relay's response to an `Exchange` action
/// - Driving time forward via ticks
/// - Forwarding application intents (connect, log, touch)
#[derive(Debug, Clone)]
pub enum ClientEvent<I = std::time::Instant> {
    /// Start a new handshake.
    Connect,

    /// Relay's response to the pending exchange.
    ResponseReceived(String),

    /// Send one log line.
    SendLog {
        /// Entry to send.
        entry: LogEntry,
        /// Authenticate with the logger token instead of timestamps.
        use_token: bool,
        /// Seal under the session key. Unencrypted when false.
        encrypt: bool,
    },

    /// Send several log lines. Batched into bulk requests when the relay
    /// allows them, one request per entry otherwise.
    SendLogs {
        /// Entries to send, in order.
        entries: Vec<LogEntry>,
        /// Authenticate with the logger token instead of timestamps.
        use_token: bool,
        /// Seal under the session key. Unencrypted when false.
        encrypt: bool,
    },

    /// Keep an established session alive.
    Touch,

    /// Time tick for timeout processing and session upkeep: touches a
    /// session close to expiry and reconnects an expired one.
    Tick {
        /// Current time from the environment.
        now: I,
    },
}

/// Actions the client produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Send wire text and feed the reply back as
    /// [`ClientEvent::ResponseReceived`].
    Exchange {
        /// Destination listener.
        port: RelayPort,
        /// Wire text, without the packet delimiter.
        wire: String,
    },

    /// Send wire text; no reply is expected.
    Send {
        /// Destination listener.
        port: RelayPort,
        /// Wire text, without the packet delimiter.
        wire: String,
    },

    /// Persist the new session key.
    PersistSessionKey(SessionKey),

    /// Persist the connection details of the current session.
    PersistSessionInfo(SessionInfo),
}
