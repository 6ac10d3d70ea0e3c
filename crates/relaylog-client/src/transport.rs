//! TCP transport for the client.
//!
//! Netcat semantics: every message opens a fresh connection to the relay,
//! writes the wire text plus the packet delimiter, and for exchanges reads
//! one delimited reply. Protocol logic stays in the Sans-IO [`Client`].

use std::{collections::VecDeque, future::Future, time::Duration};

use relaylog_crypto::Cipher;
use relaylog_proto::PACKET_DELIMITER;
use thiserror::Error;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};

use crate::{
    client::Client,
    env::Environment,
    error::ClientError,
    event::{ClientAction, ClientEvent, RelayPort},
    handshake::DEFAULT_RESPONSE_TIMEOUT,
    request::LogEntry,
    secrets::SecretStore,
};

/// Relay's default connection-request port.
pub const DEFAULT_CONNECT_PORT: u16 = 8777;

/// Relay's default log-request port.
pub const DEFAULT_LOGGING_PORT: u16 = 8778;

/// Largest reply accepted from the relay.
const MAX_RESPONSE_SIZE: usize = 64 * 1024;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection to {addr} failed: {reason}")]
    Connection {
        /// Address dialed.
        addr: String,
        /// Underlying error.
        reason: String,
    },

    /// Read or write failed mid-stream.
    #[error("stream error: {0}")]
    Stream(String),

    /// Relay did not answer in time.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// Reply was not usable text.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout(elapsed) => Self::ResponseTimeout { elapsed },
            other => Self::Transport(other.to_string()),
        }
    }
}

/// Where and how long to talk to the relay.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Relay host name or address.
    pub host: String,
    /// Port for connection requests.
    pub connect_port: u16,
    /// Port for log requests.
    pub logging_port: u16,
    /// Limit for one exchange, connect through reply.
    pub response_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            connect_port: DEFAULT_CONNECT_PORT,
            logging_port: DEFAULT_LOGGING_PORT,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }
}

/// Byte-stream collaborator carrying wire text to the relay.
pub trait RelayTransport: Send + Sync {
    /// Send `wire` and wait for one reply, returned without the delimiter.
    fn exchange(
        &self,
        port: RelayPort,
        wire: &str,
    ) -> impl Future<Output = Result<String, TransportError>> + Send;

    /// Send `wire` without waiting for a reply.
    fn send(
        &self,
        port: RelayPort,
        wire: &str,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Relay announced a different logging port during the handshake.
    fn set_logging_port(&mut self, _port: u16) {}
}

/// One TCP connection per message.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    config: TransportConfig,
}

impl TcpTransport {
    /// Transport for `config`.
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    /// Configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn addr(&self, port: RelayPort) -> String {
        let port = match port {
            RelayPort::Connect => self.config.connect_port,
            RelayPort::Logging => self.config.logging_port,
        };
        format!("{}:{port}", self.config.host)
    }

    async fn open_and_write(&self, port: RelayPort, wire: &str) -> Result<TcpStream, TransportError> {
        let addr = self.addr(port);
        let mut stream = TcpStream::connect(&addr)
            .await
            .map_err(|e| TransportError::Connection { addr: addr.clone(), reason: e.to_string() })?;

        let mut packet = String::with_capacity(wire.len() + PACKET_DELIMITER.len());
        packet.push_str(wire);
        packet.push_str(PACKET_DELIMITER);

        stream
            .write_all(packet.as_bytes())
            .await
            .map_err(|e| TransportError::Stream(format!("write to {addr} failed: {e}")))?;
        tracing::trace!(%addr, bytes = packet.len(), "packet written");

        Ok(stream)
    }

    async fn with_timeout<T>(
        &self,
        fut: impl Future<Output = Result<T, TransportError>>,
    ) -> Result<T, TransportError> {
        let limit = self.config.response_timeout;
        tokio::time::timeout(limit, fut).await.map_err(|_| TransportError::Timeout(limit))?
    }
}

/// Read until the packet delimiter or end of stream.
async fn read_packet(stream: &mut TcpStream) -> Result<String, TransportError> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    loop {
        let n = stream
            .read(&mut chunk)
            .await
            .map_err(|e| TransportError::Stream(format!("read failed: {e}")))?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(end) = find_delimiter(&buf) {
            buf.truncate(end);
            break;
        }
        if buf.len() > MAX_RESPONSE_SIZE {
            return Err(TransportError::Protocol(format!(
                "response exceeds {MAX_RESPONSE_SIZE} bytes"
            )));
        }
    }

    if buf.is_empty() {
        return Err(TransportError::Protocol("relay closed without responding".to_string()));
    }

    String::from_utf8(buf).map_err(|_| TransportError::Protocol("response is not utf-8".to_string()))
}

fn find_delimiter(buf: &[u8]) -> Option<usize> {
    buf.windows(PACKET_DELIMITER.len()).position(|w| w == PACKET_DELIMITER.as_bytes())
}

impl RelayTransport for TcpTransport {
    async fn exchange(&self, port: RelayPort, wire: &str) -> Result<String, TransportError> {
        self.with_timeout(async {
            let mut stream = self.open_and_write(port, wire).await?;
            read_packet(&mut stream).await
        })
        .await
    }

    async fn send(&self, port: RelayPort, wire: &str) -> Result<(), TransportError> {
        self.with_timeout(async {
            let mut stream = self.open_and_write(port, wire).await?;
            stream
                .shutdown()
                .await
                .map_err(|e| TransportError::Stream(format!("shutdown failed: {e}")))
        })
        .await
    }

    fn set_logging_port(&mut self, port: u16) {
        self.config.logging_port = port;
    }
}

/// Client driven end to end over a transport.
///
/// Executes the actions of the Sans-IO [`Client`]: exchanges and sends go to
/// the transport, session keys go to the secret store.
pub struct RelayClient<E, C, T, S>
where
    E: Environment,
    C: Cipher,
    T: RelayTransport,
    S: SecretStore,
{
    client: Client<E, C>,
    transport: T,
    secrets: S,
    pinned_logging_port: bool,
}

impl<E, C, T, S> RelayClient<E, C, T, S>
where
    E: Environment,
    C: Cipher,
    T: RelayTransport,
    S: SecretStore,
{
    /// Wrap `client`. A logging port the relay announced to an earlier
    /// process replaces the transport's configured one.
    pub fn new(client: Client<E, C>, mut transport: T, secrets: S) -> Self {
        if let Some(port) = client.logging_port() {
            tracing::debug!(port, "using relay-announced logging port");
            transport.set_logging_port(port);
        }
        Self { client, transport, secrets, pinned_logging_port: false }
    }

    /// Underlying state machine.
    pub fn client(&self) -> &Client<E, C> {
        &self.client
    }

    /// Mutable state machine, for loading tokens.
    pub fn client_mut(&mut self) -> &mut Client<E, C> {
        &mut self.client
    }

    /// Secret store.
    pub fn secrets(&self) -> &S {
        &self.secrets
    }

    /// Send log requests to `port` regardless of what the relay announces.
    pub fn set_logging_port(&mut self, port: u16) {
        self.pinned_logging_port = true;
        self.transport.set_logging_port(port);
    }

    /// Run the handshake. Returns the client id the relay acknowledged.
    ///
    /// # Errors
    ///
    /// - `ClientError::RelayRejected` carrying the relay's `error_text`
    /// - `ClientError::ResponseTimeout` if the relay did not answer
    /// - any error from [`Client::handle`] or the secret store
    pub async fn connect(&mut self) -> Result<String, ClientError> {
        let actions = self.client.handle(ClientEvent::Connect)?;
        self.execute(actions).await?;
        Ok(self.client.client_id().to_string())
    }

    /// Send one log line, after session upkeep.
    pub async fn log(
        &mut self,
        entry: LogEntry,
        use_token: bool,
        encrypt: bool,
    ) -> Result<(), ClientError> {
        self.health_check().await?;
        let actions = self.client.handle(ClientEvent::SendLog { entry, use_token, encrypt })?;
        self.execute(actions).await
    }

    /// Send several log lines, in bulk requests when the relay allows them.
    pub async fn log_batch(
        &mut self,
        entries: Vec<LogEntry>,
        use_token: bool,
        encrypt: bool,
    ) -> Result<(), ClientError> {
        self.health_check().await?;
        let actions = self.client.handle(ClientEvent::SendLogs { entries, use_token, encrypt })?;
        self.execute(actions).await
    }

    /// Keep the session alive.
    pub async fn touch(&mut self) -> Result<(), ClientError> {
        let actions = self.client.handle(ClientEvent::Touch)?;
        self.execute(actions).await
    }

    /// Touch a session close to expiry, reconnect an expired one.
    pub async fn health_check(&mut self) -> Result<(), ClientError> {
        let now = self.client.outbound().env().now();
        let actions = self.client.handle(ClientEvent::Tick { now })?;
        self.execute(actions).await
    }

    async fn execute(&mut self, actions: Vec<ClientAction>) -> Result<(), ClientError> {
        let mut queue = VecDeque::from(actions);

        while let Some(action) = queue.pop_front() {
            match action {
                ClientAction::Exchange { port, wire } => {
                    let reply = match self.transport.exchange(port, &wire).await {
                        Ok(reply) => reply,
                        Err(err) => {
                            let err = ClientError::from(err);
                            self.client.abort_handshake(err.user_message());
                            return Err(err);
                        },
                    };
                    queue.extend(self.client.handle(ClientEvent::ResponseReceived(reply))?);
                },
                ClientAction::Send { port, wire } => {
                    self.transport.send(port, &wire).await?;
                },
                ClientAction::PersistSessionKey(key) => {
                    self.secrets.save_session_key(&key)?;
                },
                ClientAction::PersistSessionInfo(info) => {
                    self.secrets.save_session_info(&info)?;
                    if let Some(port) = info.logging_port.filter(|_| !self.pinned_logging_port) {
                        self.transport.set_logging_port(port);
                    }
                },
            }
        }

        Ok(())
    }
}
