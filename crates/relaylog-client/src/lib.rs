//! Client
//!
//! Client side of the relaylog protocol: the connect handshake, the session
//! store, request building and sealing of outbound messages.
//!
//! # Architecture
//!
//! Sans-IO and action based. [`Client`] receives [`ClientEvent`]s, runs pure
//! state machine logic and returns [`ClientAction`]s for the caller to
//! execute. Time and randomness come from an [`Environment`].
//!
//! # Components
//!
//! - [`Handshake`]: `Idle → AwaitingConnectResponse → Acknowledging →
//!   Established`, or `Failed`
//! - [`SessionStore`]: credentials plus the relay-issued session key and its
//!   [`SessionInfo`]
//! - [`RequestBuilder`]: connect, acknowledge, touch and log requests
//! - [`Outbound`]: seals requests with a fresh IV per message
//! - [`SecretStore`]: persisted session key, session details and logger
//!   tokens
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::TcpTransport`]: one TCP connection per message
//! - [`transport::RelayClient`]: drives a [`Client`] over a transport

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
mod env;
mod error;
mod event;
mod handshake;
mod outbound;
mod request;
pub mod secrets;
mod session;
mod system_env;

#[cfg(feature = "transport")]
pub mod transport;

pub use client::{Client, TOUCH_THRESHOLD_SECS};
pub use env::{DeterministicEnv, Environment};
pub use error::ClientError;
pub use event::{ClientAction, ClientEvent, RelayPort};
pub use handshake::{
    DEFAULT_RESPONSE_TIMEOUT, Handshake, HandshakeAction, HandshakeConfig, HandshakeState,
};
pub use outbound::{MAX_TRACKED_IVS, Outbound};
pub use request::{LogEntry, RequestBuilder};
pub use secrets::{FileSecrets, MemorySecrets, SecretStore, SecretStoreError};
pub use session::{ClientCredentials, SessionInfo, SessionKey, SessionStore};
pub use system_env::SystemEnv;
