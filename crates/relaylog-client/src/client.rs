//! Client state machine.
//!
//! The `Client` ties the handshake, the session store and the outbound sender
//! together. It receives [`ClientEvent`]s and returns [`ClientAction`]s; it
//! never touches the network or the filesystem.

use relaylog_crypto::Cipher;

use crate::{
    env::Environment,
    error::ClientError,
    event::{ClientAction, ClientEvent, RelayPort},
    handshake::{Handshake, HandshakeAction, HandshakeConfig, HandshakeState},
    outbound::Outbound,
    request::LogEntry,
    session::{SessionInfo, SessionStore},
};

/// A session with less than this many seconds left is touched on the next
/// tick.
pub const TOUCH_THRESHOLD_SECS: u64 = 120;

/// Client for one relay session.
pub struct Client<E: Environment, C: Cipher> {
    outbound: Outbound<E, C>,
    session: SessionStore,
    config: HandshakeConfig,
    handshake: Option<Handshake<E::Instant>>,
}

impl<E: Environment, C: Cipher> Client<E, C> {
    /// Client for `session`. A session resumed with a persisted key can log
    /// without connecting first.
    pub fn new(env: E, cipher: C, session: SessionStore, config: HandshakeConfig) -> Self {
        Self { outbound: Outbound::new(env, cipher), session, config, handshake: None }
    }

    /// Handshake state. `Idle` before the first `Connect`.
    pub fn state(&self) -> HandshakeState {
        self.handshake.as_ref().map_or(HandshakeState::Idle, Handshake::state)
    }

    /// Session store.
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Mutable session store, for loading tokens.
    pub fn session_mut(&mut self) -> &mut SessionStore {
        &mut self.session
    }

    /// Outbound sender.
    pub fn outbound(&self) -> &Outbound<E, C> {
        &self.outbound
    }

    /// Client id the relay acknowledged, falling back to the descriptor's.
    pub fn client_id(&self) -> &str {
        self.handshake
            .as_ref()
            .filter(|h| h.state() == HandshakeState::Established)
            .and_then(Handshake::accepted_response)
            .map_or_else(|| self.session.credentials().client_id(), |r| r.client_id.as_str())
    }

    /// Logging port announced by the relay, from this process's handshake or
    /// a resumed session.
    pub fn logging_port(&self) -> Option<u16> {
        self.session.info().and_then(|info| info.logging_port)
    }

    /// Why the last handshake failed.
    pub fn failure_reason(&self) -> Option<&str> {
        self.handshake.as_ref().and_then(Handshake::failure_reason)
    }

    /// Fail the in-flight handshake, e.g. when the transport gave up.
    pub fn abort_handshake(&mut self, reason: impl Into<String>) {
        if let Some(handshake) = self.handshake.as_mut() {
            handshake.fail(reason);
        }
    }

    /// Process an event.
    ///
    /// # Errors
    ///
    /// Errors from the handshake are returned after the handshake has moved
    /// to `Failed`. Log and touch errors leave the session untouched.
    pub fn handle(
        &mut self,
        event: ClientEvent<E::Instant>,
    ) -> Result<Vec<ClientAction>, ClientError> {
        match event {
            ClientEvent::Connect => self.connect(),
            ClientEvent::ResponseReceived(raw) => self.response_received(&raw),
            ClientEvent::SendLog { entry, use_token, encrypt } => {
                self.send_log(&entry, use_token, encrypt).map(|action| vec![action])
            },
            ClientEvent::SendLogs { entries, use_token, encrypt } => {
                self.send_logs(&entries, use_token, encrypt)
            },
            ClientEvent::Touch => self.touch(),
            ClientEvent::Tick { now } => self.tick(now),
        }
    }

    fn connect(&mut self) -> Result<Vec<ClientAction>, ClientError> {
        if self.handshake.as_ref().is_some_and(|h| !h.state().is_terminal()) {
            return Err(ClientError::InvalidState { state: self.state(), operation: "connect" });
        }

        let mut handshake = Handshake::new(self.config.clone());
        let now = self.outbound.env().now();
        let action = handshake.begin(&self.session, &mut self.outbound, now);
        self.handshake = Some(handshake);

        Ok(vec![into_client_action(action?)])
    }

    fn response_received(&mut self, raw: &str) -> Result<Vec<ClientAction>, ClientError> {
        let Some(handshake) = self.handshake.as_mut() else {
            return Err(ClientError::InvalidState {
                state: HandshakeState::Idle,
                operation: "handle_response",
            });
        };

        let previous_key = self.session.session_key().cloned();
        let previous_info = self.session.info().cloned();
        let mut actions: Vec<ClientAction> = handshake
            .handle_response(raw, &mut self.session, self.outbound.cipher())?
            .into_iter()
            .map(into_client_action)
            .collect();
        let info = handshake.accepted_response().map(SessionInfo::from_response);
        self.session.set_info(info.clone());

        let ack = match handshake.acknowledge(&self.session, &mut self.outbound) {
            Ok(ack) => ack,
            Err(err) => {
                // The new key is dropped with the actions; keep the store in
                // step with what is persisted.
                if let Some(key) = self.session.session_key().cloned() {
                    self.outbound.retire_key(key.value());
                }
                match previous_key {
                    Some(key) => self.session.set_session_key(key),
                    None => self.session.clear_session_key(),
                }
                self.session.set_info(previous_info);
                return Err(err);
            },
        };

        if let Some(previous) = previous_key.filter(|p| Some(p) != self.session.session_key()) {
            self.outbound.retire_key(previous.value());
        }

        actions.extend(info.map(ClientAction::PersistSessionInfo));
        actions.push(into_client_action(ack));

        Ok(actions)
    }

    fn send_log(
        &mut self,
        entry: &LogEntry,
        use_token: bool,
        encrypt: bool,
    ) -> Result<ClientAction, ClientError> {
        let wire = if encrypt {
            let key = self.session.session_key().cloned().ok_or(ClientError::NoSessionKey)?;
            let request = self.outbound.requests().build_log_entry(&self.session, use_token, entry)?;
            let client_id = self.client_id().to_string();
            self.outbound.seal_for_client(&request, key.value(), &client_id)?
        } else {
            let request =
                self.outbound.requests().build_plain_log_entry(&self.session, use_token, entry)?;
            self.outbound.seal_plain(&request)
        };

        tracing::debug!(logger = %entry.logger, level = %entry.level, encrypt, "log request sealed");
        Ok(ClientAction::Send { port: RelayPort::Logging, wire })
    }

    /// One action per bulk request, or per entry without bulk support.
    /// Nothing is returned unless every entry was sealed.
    fn send_logs(
        &mut self,
        entries: &[LogEntry],
        use_token: bool,
        encrypt: bool,
    ) -> Result<Vec<ClientAction>, ClientError> {
        let limit = self.session.info().and_then(|info| info.bulk_limit).filter(|&l| l > 0);
        let Some(limit) = limit else {
            return entries.iter().map(|entry| self.send_log(entry, use_token, encrypt)).collect();
        };

        let size = usize::try_from(limit).unwrap_or(usize::MAX);
        entries.chunks(size).map(|batch| self.send_batch(batch, use_token, encrypt)).collect()
    }

    fn send_batch(
        &mut self,
        batch: &[LogEntry],
        use_token: bool,
        encrypt: bool,
    ) -> Result<ClientAction, ClientError> {
        let wire = if encrypt {
            let key = self.session.session_key().cloned().ok_or(ClientError::NoSessionKey)?;
            let requests = batch
                .iter()
                .map(|entry| {
                    self.outbound.requests().build_log_entry(&self.session, use_token, entry)
                })
                .collect::<Result<Vec<_>, _>>()?;
            let client_id = self.client_id().to_string();
            self.outbound.seal_batch_for_client(&requests, key.value(), &client_id)?
        } else {
            let requests = batch
                .iter()
                .map(|entry| {
                    self.outbound.requests().build_plain_log_entry(&self.session, use_token, entry)
                })
                .collect::<Result<Vec<_>, _>>()?;
            self.outbound.seal_plain_batch(&requests)
        };

        tracing::debug!(entries = batch.len(), encrypt, "bulk log request sealed");
        Ok(ClientAction::Send { port: RelayPort::Logging, wire })
    }

    fn touch(&mut self) -> Result<Vec<ClientAction>, ClientError> {
        let key = self.session.session_key().cloned().ok_or(ClientError::NoSessionKey)?;
        let client_id = self.client_id().to_string();
        let request = self.outbound.requests().build_touch(&client_id)?;
        let wire = self.outbound.seal_for_client(&request, key.value(), &client_id)?;

        let mut actions = vec![ClientAction::Send { port: RelayPort::Connect, wire }];
        let now_secs = self.outbound.env().wall_clock_secs();
        if let Some(info) = self.session.info_mut() {
            info.touched(now_secs);
            actions.push(ClientAction::PersistSessionInfo(info.clone()));
        }
        Ok(actions)
    }

    /// Handshake timeout, then session upkeep once no handshake is pending.
    fn tick(&mut self, now: E::Instant) -> Result<Vec<ClientAction>, ClientError> {
        if let Some(handshake) = self.handshake.as_mut() {
            handshake.tick(now)?;
            if handshake.state() != HandshakeState::Established {
                return Ok(Vec::new());
            }
        }
        if self.session.session_key().is_none() {
            return Ok(Vec::new());
        }

        let now_secs = self.outbound.env().wall_clock_secs();
        let Some((valid, due)) = self.session.info().map(|info| {
            (info.is_valid(now_secs), info.should_touch(now_secs, TOUCH_THRESHOLD_SECS))
        }) else {
            return Ok(Vec::new());
        };

        if !valid {
            tracing::info!(client_id = self.client_id(), "session expired, reconnecting");
            self.connect()
        } else if due {
            tracing::debug!(client_id = self.client_id(), "session close to expiry, touching");
            self.touch()
        } else {
            Ok(Vec::new())
        }
    }
}

fn into_client_action(action: HandshakeAction) -> ClientAction {
    match action {
        HandshakeAction::Exchange(wire) => ClientAction::Exchange { port: RelayPort::Connect, wire },
        HandshakeAction::Send(wire) => ClientAction::Send { port: RelayPort::Connect, wire },
        HandshakeAction::PersistSessionKey(key) => ClientAction::PersistSessionKey(key),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use relaylog_crypto::XChaChaCipher;
    use relaylog_proto::{LogLevel, REQUEST_DATA_INDEX, decode};

    use super::*;
    use crate::{
        env::DeterministicEnv,
        session::{ClientCredentials, SessionKey},
    };

    type TestClient = Client<DeterministicEnv, XChaChaCipher>;

    /// Environment whose RNG always yields zeros.
    #[derive(Clone)]
    struct StuckRng;

    impl Environment for StuckRng {
        type Instant = Duration;

        fn now(&self) -> Duration {
            Duration::ZERO
        }

        fn wall_clock_millis(&self) -> u64 {
            DeterministicEnv::DEFAULT_START_MILLIS
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            buffer.fill(0);
        }
    }

    fn connected_with(env: DeterministicEnv, response: &str) -> TestClient {
        let mut client = Client::new(
            env,
            XChaChaCipher::new(),
            SessionStore::new(ClientCredentials::new("c1", "client-key")),
            HandshakeConfig::default(),
        );
        client.handle(ClientEvent::Connect).unwrap();
        client.handle(ClientEvent::ResponseReceived(response.to_string())).unwrap();
        client
    }

    fn open_json(client: &TestClient, action: &ClientAction) -> serde_json::Value {
        let plaintext = decode(wire_of(action), REQUEST_DATA_INDEX)
            .unwrap()
            .open(client.outbound().cipher(), "K")
            .unwrap();
        serde_json::from_slice(&plaintext).unwrap()
    }

    fn client() -> TestClient {
        Client::new(
            DeterministicEnv::new(3),
            XChaChaCipher::new(),
            SessionStore::new(ClientCredentials::new("c1", "client-key")),
            HandshakeConfig::default(),
        )
    }

    fn established() -> TestClient {
        let mut client = client();
        client.handle(ClientEvent::Connect).unwrap();
        client
            .handle(ClientEvent::ResponseReceived(
                r#"{"status":0,"client_id":"c1","key":"K","logging_port":9000}"#.to_string(),
            ))
            .unwrap();
        client
    }

    fn entry() -> LogEntry {
        LogEntry::new(LogLevel::Warning, "disk low", "sample-app", "app", "disk.rs", 7)
    }

    fn wire_of(action: &ClientAction) -> &str {
        match action {
            ClientAction::Exchange { wire, .. } | ClientAction::Send { wire, .. } => wire,
            ClientAction::PersistSessionKey(_) | ClientAction::PersistSessionInfo(_) => {
                panic!("no wire in {action:?}")
            },
        }
    }

    #[test]
    fn connect_exchanges_on_connect_port() {
        let mut client = client();

        let actions = client.handle(ClientEvent::Connect).unwrap();

        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], ClientAction::Exchange { port: RelayPort::Connect, .. }));
        assert_eq!(client.state(), HandshakeState::AwaitingConnectResponse);
    }

    #[test]
    fn response_persists_key_then_acknowledges() {
        let mut client = client();
        client.handle(ClientEvent::Connect).unwrap();

        let actions = client
            .handle(ClientEvent::ResponseReceived(
                r#"{"status":0,"client_id":"c1","key":"K"}"#.to_string(),
            ))
            .unwrap();

        assert_eq!(actions.len(), 3);
        assert_eq!(actions[0], ClientAction::PersistSessionKey(SessionKey::new("K")));
        assert_eq!(actions[1], ClientAction::PersistSessionInfo(SessionInfo::default()));
        assert!(matches!(actions[2], ClientAction::Send { port: RelayPort::Connect, .. }));
        assert_eq!(client.state(), HandshakeState::Established);
    }

    #[test]
    fn rejection_leaves_client_failed() {
        let mut client = client();
        client.handle(ClientEvent::Connect).unwrap();

        let err = client
            .handle(ClientEvent::ResponseReceived(r#"{"status":1,"error_text":"bad key"}"#.to_string()))
            .unwrap_err();

        assert_eq!(err.user_message(), "bad key");
        assert_eq!(client.state(), HandshakeState::Failed);
        assert_eq!(client.failure_reason(), Some("bad key"));
    }

    #[test]
    fn reconnect_after_failure() {
        let mut client = client();
        client.handle(ClientEvent::Connect).unwrap();
        let _ = client.handle(ClientEvent::ResponseReceived("{}".to_string()));
        assert_eq!(client.state(), HandshakeState::Failed);

        client.handle(ClientEvent::Connect).unwrap();

        assert_eq!(client.state(), HandshakeState::AwaitingConnectResponse);
    }

    #[test]
    fn connect_while_in_flight_is_invalid() {
        let mut client = client();
        client.handle(ClientEvent::Connect).unwrap();

        let err = client.handle(ClientEvent::Connect).unwrap_err();

        assert!(matches!(err, ClientError::InvalidState { operation: "connect", .. }));
    }

    #[test]
    fn encrypted_log_is_sealed_under_session_key() {
        let mut client = established();

        let actions = client
            .handle(ClientEvent::SendLog { entry: entry(), use_token: false, encrypt: true })
            .unwrap();

        assert!(matches!(actions[0], ClientAction::Send { port: RelayPort::Logging, .. }));
        let plaintext = decode(wire_of(&actions[0]), REQUEST_DATA_INDEX)
            .unwrap()
            .open(client.outbound().cipher(), "K")
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&plaintext).unwrap();
        assert_eq!(json["msg"], "disk low");
        assert!(json.get("_t").is_some());
    }

    #[test]
    fn plain_log_carries_client_id() {
        let mut client = established();

        let actions = client
            .handle(ClientEvent::SendLog { entry: entry(), use_token: false, encrypt: false })
            .unwrap();

        let json: serde_json::Value = serde_json::from_str(wire_of(&actions[0])).unwrap();
        assert_eq!(json["client_id"], "c1");
    }

    #[test]
    fn log_without_session_key() {
        let mut client = client();

        let err = client
            .handle(ClientEvent::SendLog { entry: entry(), use_token: false, encrypt: true })
            .unwrap_err();

        assert_eq!(err, ClientError::NoSessionKey);
    }

    #[test]
    fn resumed_session_logs_without_handshake() {
        let mut session = SessionStore::new(ClientCredentials::new("c1", "client-key"));
        session.set_session_key(SessionKey::new("K"));
        let mut client = Client::new(
            DeterministicEnv::new(3),
            XChaChaCipher::new(),
            session,
            HandshakeConfig::default(),
        );

        let actions = client
            .handle(ClientEvent::SendLog { entry: entry(), use_token: false, encrypt: true })
            .unwrap();

        assert_eq!(client.state(), HandshakeState::Idle);
        assert_eq!(actions.len(), 1);
    }

    #[test]
    fn token_log_requires_token() {
        let mut client = established();

        let err = client
            .handle(ClientEvent::SendLog { entry: entry(), use_token: true, encrypt: true })
            .unwrap_err();
        assert_eq!(err, ClientError::NoActiveSession);

        client.session_mut().set_token("tok");
        assert!(
            client
                .handle(ClientEvent::SendLog { entry: entry(), use_token: true, encrypt: true })
                .is_ok()
        );
    }

    #[test]
    fn touch_after_established() {
        let mut client = established();

        let actions = client.handle(ClientEvent::Touch).unwrap();

        let plaintext = decode(wire_of(&actions[0]), REQUEST_DATA_INDEX)
            .unwrap()
            .open(client.outbound().cipher(), "K")
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&plaintext).unwrap();
        assert_eq!(json["type"], 3);
    }

    #[test]
    fn logging_port_from_response() {
        assert_eq!(client().logging_port(), None);
        assert_eq!(established().logging_port(), Some(9000));
    }

    #[test]
    fn tick_times_out_pending_handshake() {
        let env = DeterministicEnv::new(3);
        let mut client = Client::new(
            env.clone(),
            XChaChaCipher::new(),
            SessionStore::new(ClientCredentials::new("c1", "client-key")),
            HandshakeConfig { response_timeout: Duration::from_secs(5), ..Default::default() },
        );
        client.handle(ClientEvent::Connect).unwrap();

        env.advance(Duration::from_secs(6));
        let err = client.handle(ClientEvent::Tick { now: env.now() }).unwrap_err();

        assert!(matches!(err, ClientError::ResponseTimeout { .. }));
        assert_eq!(client.state(), HandshakeState::Failed);
    }

    #[test]
    fn new_handshake_retires_previous_key_history() {
        let mut client = established();
        client.handle(ClientEvent::Touch).unwrap();
        assert_eq!(client.outbound().issued_count("K"), 2);

        client.handle(ClientEvent::Connect).unwrap();
        client
            .handle(ClientEvent::ResponseReceived(
                r#"{"status":0,"client_id":"c1","key":"K2"}"#.to_string(),
            ))
            .unwrap();

        assert_eq!(client.outbound().issued_count("K"), 0);
        assert_eq!(client.outbound().issued_count("K2"), 1);
    }

    #[test]
    fn failed_acknowledge_restores_previous_key() {
        let mut session = SessionStore::new(ClientCredentials::new("c1", "client-key"));
        session.set_session_key(SessionKey::new("OLD"));
        let mut client = Client::new(
            DeterministicEnv::new(3),
            XChaChaCipher::new(),
            session,
            HandshakeConfig::default(),
        );
        client.handle(ClientEvent::Connect).unwrap();

        let err = client
            .handle(ClientEvent::ResponseReceived(
                r#"{"status":0,"client_id":"c:1","key":"NEW","logging_port":9000}"#.to_string(),
            ))
            .unwrap_err();

        assert!(matches!(err, ClientError::MalformedEnvelope(_)));
        assert_eq!(client.state(), HandshakeState::Failed);
        assert_eq!(client.session().session_key(), Some(&SessionKey::new("OLD")));
        assert_eq!(client.logging_port(), None);
        assert_eq!(client.client_id(), "c1");
    }

    #[test]
    fn failed_acknowledge_leaves_no_unpersisted_key() {
        let mut client = Client::new(
            StuckRng,
            XChaChaCipher::new(),
            SessionStore::new(ClientCredentials::new("c1", "client-key")),
            HandshakeConfig::default(),
        );
        client.handle(ClientEvent::Connect).unwrap();

        // Same key as the connect request, so the stuck RNG repeats its IV.
        let err = client
            .handle(ClientEvent::ResponseReceived(
                r#"{"status":0,"client_id":"c1","key":"client-key"}"#.to_string(),
            ))
            .unwrap_err();

        assert_eq!(err, ClientError::IvReuse);
        assert_eq!(client.state(), HandshakeState::Failed);
        assert!(client.session().session_key().is_none());
        assert!(client.session().info().is_none());
    }

    #[test]
    fn bulk_logs_are_batched_up_to_relay_limit() {
        let mut client = connected_with(
            DeterministicEnv::new(3),
            r#"{"status":0,"client_id":"c1","key":"K","flags":16,"max_bulk_size":2}"#,
        );

        let actions = client
            .handle(ClientEvent::SendLogs {
                entries: vec![entry(); 5],
                use_token: false,
                encrypt: true,
            })
            .unwrap();

        assert_eq!(actions.len(), 3);
        assert!(
            actions.iter().all(|a| matches!(a, ClientAction::Send { port: RelayPort::Logging, .. }))
        );
        let sizes: Vec<usize> =
            actions.iter().map(|a| open_json(&client, a).as_array().unwrap().len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(open_json(&client, &actions[0])[1]["msg"], "disk low");
    }

    #[test]
    fn logs_go_one_by_one_without_bulk_flag() {
        let mut client = connected_with(
            DeterministicEnv::new(3),
            r#"{"status":0,"client_id":"c1","key":"K","flags":3,"max_bulk_size":2}"#,
        );

        let actions = client
            .handle(ClientEvent::SendLogs {
                entries: vec![entry(); 3],
                use_token: false,
                encrypt: true,
            })
            .unwrap();

        assert_eq!(actions.len(), 3);
        assert!(actions.iter().all(|a| open_json(&client, a).is_object()));
    }

    #[test]
    fn plain_bulk_is_json_array() {
        let mut client = connected_with(
            DeterministicEnv::new(3),
            r#"{"status":0,"client_id":"c1","key":"K","flags":16,"max_bulk_size":10}"#,
        );

        let actions = client
            .handle(ClientEvent::SendLogs {
                entries: vec![entry(); 2],
                use_token: false,
                encrypt: false,
            })
            .unwrap();

        let json: serde_json::Value = serde_json::from_str(wire_of(&actions[0])).unwrap();
        assert_eq!(json.as_array().map(Vec::len), Some(2));
        assert_eq!(json[0]["client_id"], "c1");
    }

    #[test]
    fn failing_entry_sends_nothing() {
        let mut client = established();

        let err = client
            .handle(ClientEvent::SendLogs {
                entries: vec![entry(); 3],
                use_token: true,
                encrypt: true,
            })
            .unwrap_err();

        assert_eq!(err, ClientError::NoActiveSession);
    }

    #[test]
    fn tick_touches_session_close_to_expiry() {
        let env = DeterministicEnv::new(3);
        let mut client = connected_with(
            env.clone(),
            r#"{"status":0,"client_id":"c1","key":"K","age":600,"date_created":1500000000}"#,
        );
        assert!(client.handle(ClientEvent::Tick { now: env.now() }).unwrap().is_empty());

        env.advance(Duration::from_secs(481));
        let actions = client.handle(ClientEvent::Tick { now: env.now() }).unwrap();

        assert_eq!(actions.len(), 2);
        assert_eq!(open_json(&client, &actions[0])["type"], 3);
        let ClientAction::PersistSessionInfo(info) = &actions[1] else {
            panic!("expected session details, got {:?}", actions[1]);
        };
        assert_eq!(info.date_created, Some(1_500_000_481));
        assert!(client.handle(ClientEvent::Tick { now: env.now() }).unwrap().is_empty());
    }

    #[test]
    fn tick_reconnects_expired_session() {
        let env = DeterministicEnv::new(3);
        let mut client = connected_with(
            env.clone(),
            r#"{"status":0,"client_id":"c1","key":"K","age":600,"date_created":1500000000}"#,
        );

        env.advance(Duration::from_secs(600));
        let actions = client.handle(ClientEvent::Tick { now: env.now() }).unwrap();

        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], ClientAction::Exchange { port: RelayPort::Connect, .. }));
        assert_eq!(client.state(), HandshakeState::AwaitingConnectResponse);
    }

    #[test]
    fn tick_without_lifetime_does_nothing() {
        let env = DeterministicEnv::new(3);
        let mut client = connected_with(env.clone(), r#"{"status":0,"client_id":"c1","key":"K"}"#);

        env.advance(Duration::from_secs(1_000_000));

        assert!(client.handle(ClientEvent::Tick { now: env.now() }).unwrap().is_empty());
    }

    #[test]
    fn resumed_details_supply_logging_port() {
        let mut session = SessionStore::new(ClientCredentials::new("c1", "client-key"));
        session.set_session_key(SessionKey::new("K"));
        session.set_info(Some(SessionInfo { logging_port: Some(9100), ..SessionInfo::default() }));

        let client = Client::new(
            DeterministicEnv::new(3),
            XChaChaCipher::new(),
            session,
            HandshakeConfig::default(),
        );

        assert_eq!(client.logging_port(), Some(9100));
    }
}
