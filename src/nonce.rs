use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::OsRng;
use rand::RngCore;

/// Produces `oauth_nonce` values.
///
/// A counter seeded from the OS random source on first use, rendered in hex
/// and incremented after each read.
#[derive(Debug, Default)]
pub struct NonceGenerator {
    counter: Mutex<u64>,
}

impl NonceGenerator {
    pub fn new() -> Self {
        Default::default()
    }

    /// Starts the counter at `seed` instead of a random value.
    ///
    /// A zero seed is treated as unseeded.
    pub fn with_seed(seed: u64) -> Self {
        NonceGenerator {
            counter: Mutex::new(seed),
        }
    }

    pub fn next_nonce(&self) -> String {
        let mut counter = self.counter.lock().unwrap_or_else(PoisonError::into_inner);
        while *counter == 0 {
            *counter = OsRng.next_u64();
        }
        let nonce = format!("{:x}", *counter);
        *counter = counter.wrapping_add(1);
        nonce
    }
}

/// Source of `oauth_timestamp` values, in seconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        // a clock set before 1970 signs with timestamp 0
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn seeded_generator_counts_in_hex() {
        let nonces = NonceGenerator::with_seed(0xfe);
        assert_eq!(nonces.next_nonce(), "fe");
        assert_eq!(nonces.next_nonce(), "ff");
        assert_eq!(nonces.next_nonce(), "100");
    }

    #[test]
    fn counter_wraps_without_panicking() {
        let nonces = NonceGenerator::with_seed(u64::MAX);
        assert_eq!(nonces.next_nonce(), "ffffffffffffffff");
        // wrapped to zero, so it gets reseeded
        assert!(!nonces.next_nonce().is_empty());
    }

    #[test]
    fn unseeded_generator_never_repeats() {
        let nonces = NonceGenerator::new();
        let first = nonces.next_nonce();
        let second = nonces.next_nonce();
        assert_ne!(first, second);
    }

    #[test]
    fn concurrent_callers_get_distinct_nonces() {
        let nonces = Arc::new(NonceGenerator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let nonces = Arc::clone(&nonces);
                thread::spawn(move || (0..100).map(|_| nonces.next_nonce()).collect::<Vec<_>>())
            })
            .collect();
        let mut seen = HashSet::new();
        for handle in handles {
            for nonce in handle.join().unwrap() {
                assert!(seen.insert(nonce));
            }
        }
        assert_eq!(seen.len(), 800);
    }

    #[test]
    fn fixed_clock_is_fixed() {
        assert_eq!(FixedClock(1_234_567_890).now(), 1_234_567_890);
        assert!(SystemClock.now() > 1_500_000_000);
    }
}
