//! Integration tests for the TCP transport.
//!
//! A loopback relay on two ephemeral ports plays the server side of the
//! handshake, so the client runs connect, acknowledge and log over real
//! sockets.

use std::time::Duration;

use relaylog_client::{
    Client, ClientCredentials, ClientError, DeterministicEnv, Environment, FileSecrets,
    HandshakeConfig, HandshakeState, LogEntry, MemorySecrets, SecretStore, SessionKey,
    SessionStore,
    transport::{RelayClient, TcpTransport, TransportConfig},
};
use relaylog_crypto::XChaChaCipher;
use relaylog_proto::{LogLevel, PACKET_DELIMITER, REQUEST_DATA_INDEX, decode, encode};
use serde_json::{Value, json};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::mpsc,
};

const CLIENT_KEY: &str = "client-key";
const SESSION_KEY: &str = "session-key";

/// Read one delimited packet.
async fn read_packet(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 512];
    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.ends_with(PACKET_DELIMITER.as_bytes()) {
            buf.truncate(buf.len() - PACKET_DELIMITER.len());
            break;
        }
    }
    String::from_utf8(buf).unwrap()
}

fn open(wire: &str, key: &str) -> Value {
    let plaintext =
        decode(wire, REQUEST_DATA_INDEX).unwrap().open(&XChaChaCipher::new(), key).unwrap();
    serde_json::from_slice(&plaintext).unwrap()
}

struct Relay {
    connect_port: u16,
    logging_port: u16,
    received: mpsc::UnboundedReceiver<Value>,
}

/// Start a relay answering connect requests with `response`.
///
/// Every decrypted request (connect, acknowledge, log) is forwarded on
/// `received`.
async fn start_relay(response: Value) -> Relay {
    let connect = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let logging = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let connect_port = connect.local_addr().unwrap().port();
    let logging_port = logging.local_addr().unwrap().port();
    let (tx, received) = mpsc::unbounded_channel();

    let connect_tx = tx.clone();
    tokio::spawn(async move {
        let env = DeterministicEnv::new(99);
        loop {
            let (mut stream, _) = connect.accept().await.unwrap();
            let wire = read_packet(&mut stream).await;
            let request = match open_any(&wire) {
                Some(request) => request,
                None => continue,
            };
            let is_connect = request["type"] == 1;
            connect_tx.send(request).unwrap();

            if is_connect {
                let iv = env.random_iv().to_hex();
                let reply = encode(
                    response.to_string().as_bytes(),
                    &iv,
                    CLIENT_KEY,
                    &XChaChaCipher::new(),
                )
                .unwrap();
                stream.write_all(format!("{reply}\n{PACKET_DELIMITER}").as_bytes()).await.unwrap();
            }
        }
    });

    tokio::spawn(async move {
        loop {
            let (mut stream, _) = logging.accept().await.unwrap();
            let wire = read_packet(&mut stream).await;
            tx.send(open(&wire, SESSION_KEY)).unwrap();
        }
    });

    Relay { connect_port, logging_port, received }
}

/// Connect requests are under the client key; everything else under the
/// session key.
fn open_any(wire: &str) -> Option<Value> {
    let envelope = decode(wire, REQUEST_DATA_INDEX).ok()?;
    let cipher = XChaChaCipher::new();
    let plaintext =
        envelope.open(&cipher, CLIENT_KEY).or_else(|_| envelope.open(&cipher, SESSION_KEY)).ok()?;
    serde_json::from_slice(&plaintext).ok()
}

fn relay_client_with<S: SecretStore>(
    session: SessionStore,
    secrets: S,
    connect_port: u16,
    logging_port: u16,
    timeout: Duration,
) -> RelayClient<DeterministicEnv, XChaChaCipher, TcpTransport, S> {
    let client = Client::new(
        DeterministicEnv::new(7),
        XChaChaCipher::new(),
        session,
        HandshakeConfig::default(),
    );
    let transport = TcpTransport::new(TransportConfig {
        host: "127.0.0.1".to_string(),
        connect_port,
        logging_port,
        response_timeout: timeout,
    });
    RelayClient::new(client, transport, secrets)
}

fn relay_client(
    connect_port: u16,
    logging_port: u16,
    timeout: Duration,
) -> RelayClient<DeterministicEnv, XChaChaCipher, TcpTransport, MemorySecrets> {
    relay_client_with(
        SessionStore::new(ClientCredentials::new("c1", CLIENT_KEY)),
        MemorySecrets::new(),
        connect_port,
        logging_port,
        timeout,
    )
}

async fn next(relay: &mut Relay) -> Value {
    tokio::time::timeout(Duration::from_secs(5), relay.received.recv()).await.unwrap().unwrap()
}

#[tokio::test]
async fn handshake_and_log_over_tcp() {
    let mut relay = start_relay(json!({"status": 0, "client_id": "c1", "key": SESSION_KEY})).await;
    let mut client = relay_client(relay.connect_port, relay.logging_port, Duration::from_secs(5));

    let client_id = client.connect().await.unwrap();

    assert_eq!(client_id, "c1");
    assert_eq!(client.client().state(), HandshakeState::Established);
    assert_eq!(client.secrets().load_session_key().unwrap(), Some(SessionKey::new(SESSION_KEY)));

    let connect = next(&mut relay).await;
    assert_eq!(connect["type"], 1);
    let ack = next(&mut relay).await;
    assert_eq!(ack["type"], 2);
    assert_eq!(ack["client_id"], "c1");

    let entry = LogEntry::new(LogLevel::Info, "over tcp", "sample-app", "app", "main.rs", 3);
    client.log(entry, false, true).await.unwrap();

    let log = next(&mut relay).await;
    assert_eq!(log["msg"], "over tcp");
    assert!(log.get("datetime").is_some());
}

#[tokio::test]
async fn relay_announced_logging_port_is_used() {
    let mut relay = start_relay(Value::Null).await;
    let response = json!({
        "status": 0,
        "client_id": "c1",
        "key": SESSION_KEY,
        "logging_port": relay.logging_port,
    });
    let mut relay_with_port = start_relay(response).await;

    // Configured logging port belongs to the announcing relay; logs must go to
    // the announced one instead.
    let mut client = relay_client(
        relay_with_port.connect_port,
        relay_with_port.logging_port,
        Duration::from_secs(5),
    );
    client.connect().await.unwrap();
    next(&mut relay_with_port).await;
    next(&mut relay_with_port).await;

    let entry = LogEntry::new(LogLevel::Debug, "routed", "sample-app", "app", "main.rs", 4);
    client.log(entry, false, true).await.unwrap();

    assert_eq!(next(&mut relay).await["msg"], "routed");
}

#[tokio::test]
async fn rejection_surfaces_error_text() {
    let mut relay = start_relay(json!({"status": 1, "error_text": "bad key"})).await;
    let mut client = relay_client(relay.connect_port, relay.logging_port, Duration::from_secs(5));

    let err = client.connect().await.unwrap_err();

    assert_eq!(err.user_message(), "bad key");
    assert_eq!(client.client().state(), HandshakeState::Failed);
    assert_eq!(client.secrets().load_session_key().unwrap(), None);
    assert_eq!(next(&mut relay).await["type"], 1);
}

#[tokio::test]
async fn silent_relay_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let mut held = Vec::new();
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            held.push(stream);
        }
    });
    let mut client = relay_client(port, port, Duration::from_millis(200));

    let err = client.connect().await.unwrap_err();

    assert!(matches!(err, ClientError::ResponseTimeout { .. }));
    assert!(err.is_transient());
    assert_eq!(client.client().state(), HandshakeState::Failed);
}

#[tokio::test]
async fn unreachable_relay_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let mut client = relay_client(port, port, Duration::from_secs(2));

    let err = client.connect().await.unwrap_err();

    assert!(matches!(err, ClientError::Transport(_) | ClientError::ResponseTimeout { .. }));
    assert_eq!(client.client().state(), HandshakeState::Failed);
}

#[tokio::test]
async fn announced_logging_port_survives_restart() {
    let mut relay = start_relay(Value::Null).await;
    let response = json!({
        "status": 0,
        "client_id": "c1",
        "key": SESSION_KEY,
        "logging_port": relay.logging_port,
    });
    let mut announcing = start_relay(response).await;
    let dir = tempfile::tempdir().unwrap();

    // First process connects and persists.
    let mut first = relay_client_with(
        SessionStore::new(ClientCredentials::new("c1", CLIENT_KEY)),
        FileSecrets::new(dir.path()),
        announcing.connect_port,
        announcing.logging_port,
        Duration::from_secs(5),
    );
    first.connect().await.unwrap();
    next(&mut announcing).await;
    next(&mut announcing).await;
    drop(first);

    // Second process only knows the configured port.
    let secrets = FileSecrets::new(dir.path());
    let session =
        SessionStore::resume(ClientCredentials::new("c1", CLIENT_KEY), &secrets).unwrap();
    let mut second = relay_client_with(
        session,
        secrets,
        announcing.connect_port,
        announcing.logging_port,
        Duration::from_secs(5),
    );
    assert_eq!(second.client().logging_port(), Some(relay.logging_port));

    let entry = LogEntry::new(LogLevel::Info, "after restart", "sample-app", "app", "main.rs", 5);
    second.log(entry, false, true).await.unwrap();

    assert_eq!(next(&mut relay).await["msg"], "after restart");
}

#[tokio::test]
async fn pinned_logging_port_wins_over_announced() {
    let mut pinned = start_relay(Value::Null).await;
    let decoy = start_relay(Value::Null).await;
    let response = json!({
        "status": 0,
        "client_id": "c1",
        "key": SESSION_KEY,
        "logging_port": decoy.logging_port,
    });
    let mut announcing = start_relay(response).await;

    let mut client =
        relay_client(announcing.connect_port, announcing.logging_port, Duration::from_secs(5));
    client.set_logging_port(pinned.logging_port);
    client.connect().await.unwrap();
    next(&mut announcing).await;
    next(&mut announcing).await;

    let entry = LogEntry::new(LogLevel::Info, "pinned", "sample-app", "app", "main.rs", 6);
    client.log(entry, false, true).await.unwrap();

    assert_eq!(next(&mut pinned).await["msg"], "pinned");
}

#[tokio::test]
async fn bulk_logs_arrive_as_arrays() {
    let mut relay = start_relay(json!({
        "status": 0,
        "client_id": "c1",
        "key": SESSION_KEY,
        "flags": 16,
        "max_bulk_size": 2,
    }))
    .await;
    let mut client = relay_client(relay.connect_port, relay.logging_port, Duration::from_secs(5));
    client.connect().await.unwrap();
    next(&mut relay).await;
    next(&mut relay).await;

    let entries: Vec<LogEntry> = ["a", "b", "c"]
        .into_iter()
        .map(|msg| LogEntry::new(LogLevel::Info, msg, "sample-app", "app", "main.rs", 7))
        .collect();
    client.log_batch(entries, false, true).await.unwrap();

    let mut batches = vec![next(&mut relay).await, next(&mut relay).await];
    batches.sort_by_key(|batch| batch.as_array().map_or(0, Vec::len));
    let sizes: Vec<usize> = batches.iter().map(|b| b.as_array().map_or(0, Vec::len)).collect();
    assert_eq!(sizes, vec![1, 2]);
    assert_eq!(batches[0][0]["msg"], "c");
    assert_eq!(batches[1][0]["msg"], "a");
    assert_eq!(batches[1][1]["msg"], "b");
}
