//! Connect handshake state machine.
//!
//! Sans-IO: methods take the raw relay response and the current time, and
//! return actions for the driver to execute.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐ begin ┌─────────────────────────┐ status 0 ┌──────────────┐ acknowledge ┌─────────────┐
//! │ Idle │──────>│ AwaitingConnectResponse │─────────>│ Acknowledging│────────────>│ Established │
//! └──────┘       └─────────────────────────┘          └──────────────┘             └─────────────┘
//!                             │ status != 0 / malformed / timeout │
//!                             ↓                                   ↓
//!                        ┌────────┐                          ┌────────┐
//!                        │ Failed │                          │ Failed │
//!                        └────────┘                          └────────┘
//! ```
//!
//! The acknowledgement is fire-and-forget: the relay sends nothing back, so
//! the machine becomes `Established` as soon as the acknowledgement is handed
//! to the transport.

use std::{
    ops::Sub,
    time::{Duration, Instant},
};

use relaylog_crypto::Cipher;
use relaylog_proto::{ConnectResponse, RESPONSE_DATA_INDEX, decode};

use crate::{
    env::Environment,
    error::ClientError,
    outbound::Outbound,
    session::{SessionKey, SessionStore},
};

/// Time allowed for the relay to answer the connect request.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Handshake state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Nothing sent yet
    Idle,
    /// Connect request sent, waiting for the relay's answer
    AwaitingConnectResponse,
    /// Session key stored, acknowledgement not yet sent
    Acknowledging,
    /// Acknowledgement sent; the session key is usable
    Established,
    /// Terminal failure
    Failed,
}

impl HandshakeState {
    /// True for `Established` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Established | Self::Failed)
    }
}

/// Handshake configuration.
#[derive(Debug, Clone)]
pub struct HandshakeConfig {
    /// Segment holding the ciphertext in the relay's response
    pub response_segment_index: usize,
    /// How long to wait for the connect response
    pub response_timeout: Duration,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            response_segment_index: RESPONSE_DATA_INDEX,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }
}

/// Actions returned by the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeAction {
    /// Send this wire text and wait for one response
    Exchange(String),
    /// Send this wire text; no response is expected
    Send(String),
    /// Persist this session key for later processes
    PersistSessionKey(SessionKey),
}

/// Connect → receive key → acknowledge.
///
/// One instance per connection attempt. Reconnecting means a new instance;
/// only the persisted session key outlives it.
#[derive(Debug, Clone)]
pub struct Handshake<I = Instant>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    state: HandshakeState,
    config: HandshakeConfig,
    sent_at: Option<I>,
    response: Option<ConnectResponse>,
    failure_reason: Option<String>,
}

impl<I> Handshake<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Handshake in [`HandshakeState::Idle`].
    pub fn new(config: HandshakeConfig) -> Self {
        Self { state: HandshakeState::Idle, config, sent_at: None, response: None, failure_reason: None }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Configuration.
    pub fn config(&self) -> &HandshakeConfig {
        &self.config
    }

    /// Accepted connect response. `None` before `Acknowledging`.
    pub fn accepted_response(&self) -> Option<&ConnectResponse> {
        self.response.as_ref()
    }

    /// Why the handshake failed. `None` unless `Failed`.
    ///
    /// For relay rejections this is the relay's `error_text`, unaltered.
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Move to `Failed`. No effect once terminal.
    pub fn fail(&mut self, reason: impl Into<String>) {
        if self.state.is_terminal() {
            return;
        }
        let reason = reason.into();
        tracing::debug!(from = ?self.state, %reason, "handshake failed");
        self.state = HandshakeState::Failed;
        self.failure_reason = Some(reason);
    }

    /// Build the connect request, sealed under the long-lived client key.
    ///
    /// # Errors
    ///
    /// - `ClientError::InvalidState` if not `Idle`
    /// - `ClientError::Cipher` / `IvReuse` if sealing fails (handshake fails)
    pub fn begin<E, C>(
        &mut self,
        store: &SessionStore,
        outbound: &mut Outbound<E, C>,
        now: I,
    ) -> Result<HandshakeAction, ClientError>
    where
        E: Environment,
        C: Cipher,
    {
        self.expect_state(HandshakeState::Idle, "begin")?;

        let credentials = store.credentials();
        let sealed = outbound.requests().build_connect(credentials.client_id()).and_then(|request| {
            outbound.seal_for_client(&request, credentials.key(), credentials.client_id())
        });
        let wire = self.or_fail(sealed)?;

        self.state = HandshakeState::AwaitingConnectResponse;
        self.sent_at = Some(now);
        tracing::debug!(client_id = credentials.client_id(), "connect request sealed");

        Ok(HandshakeAction::Exchange(wire))
    }

    /// Process the relay's answer to the connect request.
    ///
    /// Plain JSON (starting with `{`) is parsed as is. Anything else is
    /// decoded at the configured segment and opened with the client key.
    /// On success the session key is stored in `store` and the machine moves
    /// to `Acknowledging`.
    ///
    /// # Errors
    ///
    /// Every error moves the handshake to `Failed`.
    ///
    /// - `ClientError::InvalidState` if not awaiting a response (state is
    ///   left unchanged)
    /// - `ClientError::MalformedEnvelope` if the wire text cannot be framed
    /// - `ClientError::Cipher` if the response does not open under the client
    ///   key
    /// - `ClientError::Protocol` if the payload is not a connect response
    /// - `ClientError::RelayRejected` if the relay reports a nonzero status
    pub fn handle_response<C: Cipher + ?Sized>(
        &mut self,
        raw: &str,
        store: &mut SessionStore,
        cipher: &C,
    ) -> Result<Vec<HandshakeAction>, ClientError> {
        self.expect_state(HandshakeState::AwaitingConnectResponse, "handle_response")?;

        let parsed = self.parse_response(raw, store.credentials().key(), cipher);
        let response = self.or_fail(parsed)?;

        if !response.is_success() {
            let error_text = response.error_text().to_string();
            tracing::warn!(status = response.status, %error_text, "relay rejected connect");
            self.fail(error_text.clone());
            return Err(ClientError::RelayRejected { status: response.status, error_text });
        }

        let key = SessionKey::new(response.key.clone());
        store.set_session_key(key.clone());
        tracing::debug!(
            client_id = %response.client_id,
            acknowledged = response.is_acknowledged(),
            server_version = response.server_version().unwrap_or("unknown"),
            "session key received"
        );

        self.response = Some(response);
        self.state = HandshakeState::Acknowledging;

        Ok(vec![HandshakeAction::PersistSessionKey(key)])
    }

    /// Seal the acknowledgement under the new session key and move to
    /// `Established`.
    ///
    /// # Errors
    ///
    /// - `ClientError::InvalidState` if not `Acknowledging`
    /// - `ClientError::NoSessionKey` if `store` lost the session key
    /// - `ClientError::Cipher` / `IvReuse` / `MalformedEnvelope` if sealing
    ///   fails
    pub fn acknowledge<E, C>(
        &mut self,
        store: &SessionStore,
        outbound: &mut Outbound<E, C>,
    ) -> Result<HandshakeAction, ClientError>
    where
        E: Environment,
        C: Cipher,
    {
        self.expect_state(HandshakeState::Acknowledging, "acknowledge")?;

        let client_id = self.response.as_ref().map(|r| r.client_id.clone()).unwrap_or_default();
        let sealed = store.session_key().ok_or(ClientError::NoSessionKey).and_then(|key| {
            let request = outbound.requests().build_acknowledge(&client_id)?;
            outbound.seal_for_client(&request, key.value(), &client_id)
        });
        let wire = self.or_fail(sealed)?;

        self.state = HandshakeState::Established;
        tracing::debug!(%client_id, "handshake established");

        Ok(HandshakeAction::Send(wire))
    }

    /// Time spent waiting for the connect response, if over the limit.
    #[must_use]
    pub fn check_timeout(&self, now: I) -> Option<Duration> {
        if self.state != HandshakeState::AwaitingConnectResponse {
            return None;
        }
        let elapsed = now - self.sent_at?;
        if elapsed > self.config.response_timeout { Some(elapsed) } else { None }
    }

    /// Fail the handshake if the response is overdue.
    ///
    /// # Errors
    ///
    /// - `ClientError::ResponseTimeout` if the response timeout elapsed
    pub fn tick(&mut self, now: I) -> Result<(), ClientError> {
        match self.check_timeout(now) {
            Some(elapsed) => {
                self.fail(format!("response timeout after {elapsed:?}"));
                Err(ClientError::ResponseTimeout { elapsed })
            },
            None => Ok(()),
        }
    }

    fn parse_response<C: Cipher + ?Sized>(
        &self,
        raw: &str,
        client_key: &str,
        cipher: &C,
    ) -> Result<ConnectResponse, ClientError> {
        let text = raw.trim();
        let payload = if text.starts_with('{') {
            text.as_bytes().to_vec()
        } else {
            decode(text, self.config.response_segment_index)?.open(cipher, client_key)?
        };

        Ok(ConnectResponse::from_json(&payload)?)
    }

    fn expect_state(
        &self,
        expected: HandshakeState,
        operation: &'static str,
    ) -> Result<(), ClientError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ClientError::InvalidState { state: self.state, operation })
        }
    }

    fn or_fail<T>(&mut self, result: Result<T, ClientError>) -> Result<T, ClientError> {
        result.inspect_err(|err| self.fail(err.user_message()))
    }
}
