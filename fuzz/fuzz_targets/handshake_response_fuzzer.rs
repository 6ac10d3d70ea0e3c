//! Fuzz target for the connect handshake
//!
//! Drives a handshake to `AwaitingConnectResponse`, then hands it an
//! arbitrary relay response. Whatever the input, the machine must end in
//! `Acknowledging` with a session key, or in `Failed` without one.

#![no_main]

use std::time::Duration;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use relaylog_client::{
    ClientCredentials, DeterministicEnv, Handshake, HandshakeConfig, HandshakeState, Outbound,
    SessionStore,
};
use relaylog_crypto::XChaChaCipher;

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    seed: u64,
    segment_index: u8,
    response: &'a str,
}

fuzz_target!(|input: Input<'_>| {
    let config = HandshakeConfig {
        response_segment_index: usize::from(input.segment_index),
        ..HandshakeConfig::default()
    };
    let mut handshake: Handshake<Duration> = Handshake::new(config);
    let mut store = SessionStore::new(ClientCredentials::new("fuzz", "fuzz-key"));
    let mut outbound = Outbound::new(DeterministicEnv::new(input.seed), XChaChaCipher::new());

    if handshake.begin(&store, &mut outbound, Duration::ZERO).is_err() {
        return;
    }

    match handshake.handle_response(input.response, &mut store, outbound.cipher()) {
        Ok(_) => {
            assert_eq!(handshake.state(), HandshakeState::Acknowledging);
            assert!(store.session_key().is_some());
        },
        Err(_) => {
            assert_eq!(handshake.state(), HandshakeState::Failed);
            assert!(store.session_key().is_none());
        },
    }
});
