//! Production Environment implementation using system time and RNG.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::env::Environment;

/// Production environment using system time and cryptographic RNG.
///
/// # Security
///
/// The RNG uses getrandom, the OS-level cryptographic source (e.g.
/// `/dev/urandom` on Linux). IVs are drawn from it.
///
/// # Panics
///
/// Panics if the OS RNG fails. A client without functioning cryptographic
/// randomness cannot produce safe IVs, so there is nothing to fall back to.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[allow(clippy::disallowed_methods)]
    fn wall_clock_millis(&self) -> u64 {
        // A clock before 1970 reads as the epoch.
        SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer)
            .expect("invariant: OS RNG failure is unrecoverable - no safe IVs without it");
    }
}
