//! Typed protocol messages, stamped from the environment clock.

use relaylog_proto::{ConnectionRequest, LogLevel, LogRequest, Request, RequestType};

use crate::{env::Environment, error::ClientError, session::SessionStore};

/// One log line before it is turned into a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Severity.
    pub level: LogLevel,
    /// Message text.
    pub msg: String,
    /// Logger id, also the name the token is stored under.
    pub logger: String,
    /// Application name.
    pub app: String,
    /// Source file.
    pub file: String,
    /// Source line.
    pub line: u32,
    /// Calling function.
    pub function: Option<String>,
    /// Thread name.
    pub thread: Option<String>,
    /// Verbose level. Only sent with [`LogLevel::Verbose`].
    pub vlevel: Option<u8>,
}

impl LogEntry {
    /// Entry with the required fields; optional fields unset.
    pub fn new(
        level: LogLevel,
        msg: impl Into<String>,
        logger: impl Into<String>,
        app: impl Into<String>,
        file: impl Into<String>,
        line: u32,
    ) -> Self {
        Self {
            level,
            msg: msg.into(),
            logger: logger.into(),
            app: app.into(),
            file: file.into(),
            line,
            function: None,
            thread: None,
            vlevel: None,
        }
    }
}

/// Builds outbound requests.
///
/// Holds no session state; every call reads the clock once.
#[derive(Debug, Clone)]
pub struct RequestBuilder<E: Environment> {
    env: E,
}

impl<E: Environment> RequestBuilder<E> {
    /// Builder reading time from `env`.
    pub fn new(env: E) -> Self {
        Self { env }
    }

    /// `{_t, client_id, type: 1}`, the handshake's opening message.
    pub fn build_connect(&self, client_id: &str) -> Result<Request, ClientError> {
        self.connection(client_id, RequestType::Connect)
    }

    /// `{_t, client_id, type: 2}`, confirming receipt of the session key.
    pub fn build_acknowledge(&self, client_id: &str) -> Result<Request, ClientError> {
        self.connection(client_id, RequestType::Acknowledge)
    }

    /// `{_t, client_id, type: 3}`, keeping an established session alive.
    pub fn build_touch(&self, client_id: &str) -> Result<Request, ClientError> {
        self.connection(client_id, RequestType::Touch)
    }

    fn connection(&self, client_id: &str, kind: RequestType) -> Result<Request, ClientError> {
        let payload = ConnectionRequest {
            timestamp: self.env.wall_clock_secs(),
            client_id: client_id.to_string(),
            kind,
        };
        Ok(Request::from_payload(&payload)?)
    }

    /// Log request.
    ///
    /// With `use_token` the session token is embedded and no timestamp is
    /// sent. Without it both `_t` (unix seconds) and `datetime` (unix millis)
    /// are sent.
    ///
    /// # Errors
    ///
    /// - `ClientError::NoActiveSession` if `use_token` is set and the session
    ///   holds no token
    pub fn build_log_entry(
        &self,
        session: &SessionStore,
        use_token: bool,
        entry: &LogEntry,
    ) -> Result<Request, ClientError> {
        Ok(Request::from_payload(&self.log_request(session, use_token, entry)?)?)
    }

    /// Log request for a relay accepting unencrypted traffic.
    ///
    /// Same as [`RequestBuilder::build_log_entry`] plus the `client_id`
    /// field, since a plain message has no envelope to carry it.
    pub fn build_plain_log_entry(
        &self,
        session: &SessionStore,
        use_token: bool,
        entry: &LogEntry,
    ) -> Result<Request, ClientError> {
        let mut payload = self.log_request(session, use_token, entry)?;
        payload.client_id = Some(session.credentials().client_id().to_string());
        Ok(Request::from_payload(&payload)?)
    }

    fn log_request(
        &self,
        session: &SessionStore,
        use_token: bool,
        entry: &LogEntry,
    ) -> Result<LogRequest, ClientError> {
        let mut payload = LogRequest {
            token: None,
            timestamp: None,
            datetime: None,
            client_id: None,
            logger: entry.logger.clone(),
            msg: entry.msg.clone(),
            file: entry.file.clone(),
            line: entry.line,
            app: entry.app.clone(),
            level: entry.level,
            function: entry.function.clone(),
            thread: entry.thread.clone(),
            vlevel: entry.vlevel.filter(|_| entry.level == LogLevel::Verbose),
        };

        if use_token {
            let token = session.token().ok_or(ClientError::NoActiveSession)?;
            payload.token = Some(token.to_string());
        } else {
            let millis = self.env.wall_clock_millis();
            payload.timestamp = Some(millis / 1000);
            payload.datetime = Some(millis);
        }

        Ok(payload)
    }
}
