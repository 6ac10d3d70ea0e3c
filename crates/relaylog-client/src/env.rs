//! Environment abstraction for deterministic testing.
//!
//! Decouples protocol logic from system resources (clocks, randomness).
//! Request timestamps, IVs and timeouts all come from here, so tests can pin
//! them and production can use the real system.

use std::{
    ops::Sub,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use relaylog_crypto::{IV_SIZE, Iv};

/// Abstract environment providing time and randomness.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards
/// - `random_bytes()` uses cryptographically secure entropy in production
pub trait Environment: Clone + Send + Sync + 'static {
    /// Monotonic instant type used for timeouts.
    type Instant: Copy + Ord + Send + Sync + Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Wall-clock time in Unix milliseconds.
    fn wall_clock_millis(&self) -> u64;

    /// Wall-clock time in Unix seconds.
    fn wall_clock_secs(&self) -> u64 {
        self.wall_clock_millis() / 1000
    }

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Fresh random IV.
    fn random_iv(&self) -> Iv {
        let mut bytes = [0u8; IV_SIZE];
        self.random_bytes(&mut bytes);
        Iv::from_random(bytes)
    }
}

/// Reproducible environment for tests and replays.
///
/// Virtual time starts at a fixed wall-clock instant and only moves through
/// [`DeterministicEnv::advance`]. Random bytes come from a seeded `SplitMix64`
/// stream, so every call yields new bytes but the sequence repeats per seed.
/// Clones share state.
#[derive(Debug, Clone)]
pub struct DeterministicEnv {
    inner: Arc<DeterministicState>,
}

#[derive(Debug)]
struct DeterministicState {
    start_millis: u64,
    elapsed_millis: AtomicU64,
    rng_state: AtomicU64,
}

impl DeterministicEnv {
    /// 2017-07-14T02:40:00Z, in Unix milliseconds.
    pub const DEFAULT_START_MILLIS: u64 = 1_500_000_000_000;

    /// Environment with the given RNG seed, starting at
    /// [`Self::DEFAULT_START_MILLIS`].
    pub fn new(seed: u64) -> Self {
        Self::starting_at(seed, Self::DEFAULT_START_MILLIS)
    }

    /// Environment with the given RNG seed and wall-clock start.
    pub fn starting_at(seed: u64, start_millis: u64) -> Self {
        Self {
            inner: Arc::new(DeterministicState {
                start_millis,
                elapsed_millis: AtomicU64::new(0),
                rng_state: AtomicU64::new(seed),
            }),
        }
    }

    /// Move virtual time forward.
    pub fn advance(&self, by: Duration) {
        self.inner.elapsed_millis.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    fn next_u64(&self) -> u64 {
        const GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

        let mut z = self.inner.rng_state.fetch_add(GAMMA, Ordering::SeqCst).wrapping_add(GAMMA);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
}

impl Environment for DeterministicEnv {
    type Instant = Duration;

    fn now(&self) -> Duration {
        Duration::from_millis(self.inner.elapsed_millis.load(Ordering::SeqCst))
    }

    fn wall_clock_millis(&self) -> u64 {
        self.inner.start_millis + self.inner.elapsed_millis.load(Ordering::SeqCst)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        for chunk in buffer.chunks_mut(8) {
            let bytes = self.next_u64().to_be_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}
