//! relaylog command-line client.
//!
//! # Usage
//!
//! ```bash
//! # Handshake with the relay and persist the session key
//! relaylog --descriptor connection.json connect
//!
//! # Send a log line sealed under the persisted session key
//! relaylog log --level info --logger sample-app --app demo --msg "started"
//!
//! # Several lines, in bulk requests when the relay allows them
//! relaylog log --logger sample-app --app demo --msg "one" --msg "two"
//!
//! # Decode a relay response read from stdin
//! relaylog decode --index 1 < response.txt
//! ```

use std::{
    io::{self, Read, Write},
    path::PathBuf,
    process::ExitCode,
    time::Duration,
};

use clap::{Parser, Subcommand};
use relaylog_client::{
    Client, ClientCredentials, ClientError, FileSecrets, HandshakeConfig, LogEntry, SessionStore,
    SystemEnv,
    transport::{
        DEFAULT_CONNECT_PORT, DEFAULT_LOGGING_PORT, RelayClient, TcpTransport, TransportConfig,
    },
};
use relaylog_crypto::XChaChaCipher;
use relaylog_proto::{Envelope, LogLevel, RESPONSE_DATA_INDEX, decode};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

type Relay = RelayClient<SystemEnv, XChaChaCipher, TcpTransport, FileSecrets>;

/// relaylog client
#[derive(Parser, Debug)]
#[command(name = "relaylog")]
#[command(about = "Encrypted client for a centralized logging relay")]
#[command(version)]
struct Args {
    /// Connection descriptor with `client_id` and `key`
    #[arg(short, long, default_value = "connection.json")]
    descriptor: PathBuf,

    /// Relay host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Relay port for connection requests
    #[arg(long, default_value_t = DEFAULT_CONNECT_PORT)]
    connect_port: u16,

    /// Relay port for log requests. Defaults to the port the relay announced
    /// at connect, then to 8778.
    #[arg(long)]
    logging_port: Option<u16>,

    /// Seconds to wait for a relay response
    #[arg(long, default_value = "30")]
    timeout_secs: u64,

    /// Directory holding the session key and logger tokens
    #[arg(long, default_value = ".relaylog")]
    secrets_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Handshake with the relay and persist the session key
    Connect,

    /// Keep the persisted session alive
    Touch,

    /// Send one log line
    Log {
        /// Severity (global, trace, debug, fatal, error, warning, verbose, info)
        #[arg(long, default_value = "info")]
        level: LogLevel,

        /// Logger id
        #[arg(long)]
        logger: String,

        /// Application name
        #[arg(long)]
        app: String,

        /// Message text. Repeat to send several lines.
        #[arg(long, required = true)]
        msg: Vec<String>,

        /// Source file
        #[arg(long, default_value = "relaylog")]
        file: String,

        /// Source line
        #[arg(long, default_value = "0")]
        line: u32,

        /// Calling function
        #[arg(long)]
        func: Option<String>,

        /// Thread name
        #[arg(long)]
        thread: Option<String>,

        /// Verbose level, for `--level verbose`
        #[arg(long)]
        vlevel: Option<u8>,

        /// Authenticate with the logger's stored token
        #[arg(long)]
        token: bool,

        /// Send unencrypted
        #[arg(long)]
        plain: bool,
    },

    /// Decode wire text from stdin
    Decode {
        /// Segment holding the ciphertext
        #[arg(long, default_value_t = RESPONSE_DATA_INDEX)]
        index: usize,

        /// Open with the client key instead of the session key
        #[arg(long)]
        client_key: bool,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("{0}")]
    Input(String),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    fn user_message(&self) -> String {
        match self {
            Self::Client(err) => err.user_message(),
            other => other.to_string(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            let _ = writeln!(io::stderr(), "{}", err.user_message());
            ExitCode::FAILURE
        },
    }
}

/// Where and how long to talk to the relay.
struct RelayOptions {
    host: String,
    connect_port: u16,
    logging_port: Option<u16>,
    timeout: Duration,
}

async fn run(args: Args) -> Result<(), CliError> {
    let credentials =
        ClientCredentials::from_descriptor_file(&args.descriptor).map_err(ClientError::from)?;
    let secrets = FileSecrets::new(&args.secrets_dir);
    let options = RelayOptions {
        host: args.host,
        connect_port: args.connect_port,
        logging_port: args.logging_port,
        timeout: Duration::from_secs(args.timeout_secs),
    };

    match args.command {
        Command::Connect => {
            let mut relay = relay(&options, SessionStore::new(credentials), secrets);
            let client_id = relay.connect().await?;
            let info = relay.client().session().info();
            tracing::info!(
                %client_id,
                logging_port = info.and_then(|i| i.logging_port),
                server_version = info.and_then(|i| i.server_version.as_deref()),
                "connected"
            );
            writeln!(io::stdout(), "{client_id}")?;
        },
        Command::Touch => {
            let session = SessionStore::resume(credentials, &secrets)?;
            relay(&options, session, secrets).touch().await?;
        },
        Command::Log {
            level,
            logger,
            app,
            msg,
            file,
            line,
            func,
            thread,
            vlevel,
            token,
            plain,
        } => {
            let mut session = SessionStore::resume(credentials, &secrets)?;
            if token && !session.load_token(&secrets, &logger)? {
                tracing::warn!(%logger, "no stored token for logger");
            }

            let entries: Vec<LogEntry> = msg
                .into_iter()
                .map(|msg| {
                    let mut entry =
                        LogEntry::new(level, msg, logger.clone(), app.clone(), file.clone(), line);
                    entry.function.clone_from(&func);
                    entry.thread.clone_from(&thread);
                    entry.vlevel = vlevel;
                    entry
                })
                .collect();

            let mut relay = relay(&options, session, secrets);
            match <[LogEntry; 1]>::try_from(entries) {
                Ok([entry]) => relay.log(entry, token, !plain).await?,
                Err(entries) => relay.log_batch(entries, token, !plain).await?,
            }
        },
        Command::Decode { index, client_key } => {
            let mut wire = String::new();
            io::stdin().read_to_string(&mut wire)?;

            let session = SessionStore::resume(credentials, &secrets)?;
            let key = if client_key {
                session.credentials().key().to_string()
            } else {
                session
                    .session_key()
                    .map(|k| k.value().to_string())
                    .ok_or(ClientError::NoSessionKey)?
            };

            writeln!(io::stdout(), "{}", open_wire(&wire, index, &key)?)?;
        },
    }

    Ok(())
}

fn relay(options: &RelayOptions, session: SessionStore, secrets: FileSecrets) -> Relay {
    let config =
        HandshakeConfig { response_timeout: options.timeout, ..HandshakeConfig::default() };
    let transport = TcpTransport::new(TransportConfig {
        host: options.host.clone(),
        connect_port: options.connect_port,
        logging_port: DEFAULT_LOGGING_PORT,
        response_timeout: config.response_timeout,
    });
    let client = Client::new(SystemEnv, XChaChaCipher::new(), session, config);

    let mut relay = RelayClient::new(client, transport, secrets);
    if let Some(port) = options.logging_port {
        relay.set_logging_port(port);
    }
    relay
}

/// Decoded text for display. Unencrypted input is echoed with a `PLAIN: `
/// prefix.
fn open_wire(wire: &str, index: usize, key: &str) -> Result<String, CliError> {
    let wire = wire.trim_end_matches(['\r', '\n']);

    match decode(wire, index).map_err(ClientError::from)? {
        Envelope::Plain(bytes) => Ok(format!("PLAIN: {}", String::from_utf8_lossy(&bytes))),
        envelope => {
            let plaintext = envelope.open(&XChaChaCipher::new(), key).map_err(ClientError::from)?;
            String::from_utf8(plaintext)
                .map_err(|_| CliError::Input("decrypted payload is not utf-8".to_string()))
        },
    }
}
