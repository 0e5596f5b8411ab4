//! Identifier generation
//!
//! Each file draws a section marker and a file identifier at creation time.
//! Generation is an injected capability so that tests can produce
//! byte-for-byte reproducible files.

use auto_impl::auto_impl;
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use uuid::{Builder, Uuid};

/// A global seed for deterministic identifier generation in tests
pub const ID_SEED: u64 = 42;

/// Source of random (version 4) UUIDs
#[auto_impl(&mut, Box)]
pub trait IdGenerator {
    fn next_id(&mut self) -> Uuid;
}

/// Generates random UUIDs from a small, fast RNG
pub struct RandomIdGenerator {
    rng: SmallRng,
}
impl RandomIdGenerator {
    /// Creates a generator seeded from the operating system
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: SmallRng::from_os_rng(),
        }
    }

    /// Creates a generator that yields the same sequence for the same seed
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}
impl Default for RandomIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
impl IdGenerator for RandomIdGenerator {
    fn next_id(&mut self) -> Uuid {
        let mut bytes = [0u8; 16];
        self.rng.fill_bytes(&mut bytes);
        Builder::from_random_bytes(bytes).into_uuid()
    }
}
