//! JSON messages carried inside envelopes.
//!
//! The relay speaks JSON objects with short field names (`_t`, `type`,
//! `msg`). Field names are fixed by the relay; the Rust types rename them.
//!
//! # Invariants
//!
//! - A log request carries either `token` or the timestamp pair
//!   (`_t`, `datetime`), never both
//! - A successful connect response always carries `client_id` and `key`

pub mod connection;
pub mod log;

pub use connection::{
    ALLOW_BULK_LOG_REQUEST, ConnectResponse, ConnectionRequest, RequestType, ServerInfo,
};
pub use log::{LogLevel, LogRequest};
