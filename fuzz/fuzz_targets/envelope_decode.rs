//! Fuzz target for envelope decoding
//!
//! Feeds arbitrary wire text and segment indices to `decode`, then opens the
//! result. Looks for:
//! - Panics on odd segment counts or indices
//! - Base64 edge cases that slip past validation
//! - Cipher input that is not length-checked before use
//!
//! The decoder should NEVER panic. All invalid inputs should return an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use relaylog_crypto::XChaChaCipher;
use relaylog_proto::decode;

fuzz_target!(|input: (&str, u8)| {
    let (wire, index) = input;

    if let Ok(envelope) = decode(wire, usize::from(index)) {
        let _ = envelope.open(&XChaChaCipher::new(), "fuzz-key");
    }
});
