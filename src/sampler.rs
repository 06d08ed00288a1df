// Random number source for sub-track point sampling.
//
// The generator is the PCG-LCG used by OpenMC's random_lcg.cpp: a single u64
// of state, fully inlineable.

use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;
use rand::{RngCore, SeedableRng};
use tracing::info;

/// LCG multiplier (same as OpenMC)
const PRN_MULT: u64 = 6364136223846793005;
/// LCG additive constant (same as OpenMC)
const PRN_ADD: u64 = 1442695040888963407;

/// Fast RNG using OpenMC's PCG-LCG algorithm.
///
/// Reference: Melissa E. O'Neill, "PCG: A Family of Simple Fast Space-Efficient
/// Statistically Good Algorithms for Random Number Generation"
#[derive(Clone, Copy, Debug)]
pub struct FastRng {
    seed: u64,
}

impl FastRng {
    #[inline]
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Seed from the wall clock
    pub fn from_time() -> Self {
        Self::new(time_seed())
    }

    /// Random f64 in [0, 1)
    #[inline(always)]
    pub fn random(&mut self) -> f64 {
        (self.next_u64() as f64) * 5.421010862427522e-20
    }

    #[inline]
    pub fn reseed(&mut self, seed: u64) {
        self.seed = seed;
    }
}

impl SeedableRng for FastRng {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Self {
            seed: u64::from_le_bytes(seed),
        }
    }
}

impl RngCore for FastRng {
    #[inline(always)]
    fn next_u32(&mut self) -> u32 {
        self.next_u64() as u32
    }

    #[inline(always)]
    fn next_u64(&mut self) -> u64 {
        self.seed = PRN_MULT.wrapping_mul(self.seed).wrapping_add(PRN_ADD);

        // PCG output permutation (RXS-M-XS variant)
        let word = ((self.seed >> ((self.seed >> 59) + 5)) ^ self.seed)
            .wrapping_mul(12605985483714917081);
        (word >> 43) ^ word
    }

    #[inline]
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let mut left = dest;
        while left.len() >= 8 {
            let bytes = self.next_u64().to_le_bytes();
            left[..8].copy_from_slice(&bytes);
            left = &mut left[8..];
        }
        if !left.is_empty() {
            let bytes = self.next_u64().to_le_bytes();
            left.copy_from_slice(&bytes[..left.len()]);
        }
    }

    #[inline]
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() ^ u64::from(d.subsec_nanos()))
        .unwrap_or(0)
}

/// State of the process-wide sampler shared by every sub-track tally
#[derive(Debug)]
pub struct SharedSampler {
    rng: FastRng,
    seeded: bool,
}

impl SharedSampler {
    pub fn rng(&mut self) -> &mut FastRng {
        &mut self.rng
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }
}

static SHARED_SAMPLER: Lazy<Mutex<SharedSampler>> = Lazy::new(|| {
    Mutex::new(SharedSampler {
        rng: FastRng::new(0),
        seeded: false,
    })
});

/// Lock the process-wide sampler
pub fn shared_sampler() -> MutexGuard<'static, SharedSampler> {
    SHARED_SAMPLER
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Seed the shared sampler from the wall clock unless something already
/// seeded it.
pub fn ensure_shared_seeded() {
    let mut sampler = shared_sampler();
    if !sampler.seeded {
        sampler.rng.reseed(time_seed());
        sampler.seeded = true;
    }
}

/// Reseed the shared sampler, affecting every tally that draws from it.
pub fn seed_shared_sampler(seed: u64) {
    let mut sampler = shared_sampler();
    sampler.rng.reseed(seed);
    sampler.seeded = true;
    info!(seed, "setting random seed for choosing sub-track points");
}

/// Where a sub-track tally draws its random numbers from.
#[derive(Debug, Clone)]
pub enum SampleSource {
    /// The process-wide sampler shared by all sub-track tallies
    Shared,
    /// A generator owned by a single tally
    Owned(FastRng),
}

impl Default for SampleSource {
    fn default() -> Self {
        SampleSource::Shared
    }
}

impl SampleSource {
    /// Run `f` with the underlying generator
    pub fn with_rng<T>(&mut self, f: impl FnOnce(&mut FastRng) -> T) -> T {
        match self {
            SampleSource::Shared => {
                let mut sampler = shared_sampler();
                f(sampler.rng())
            }
            SampleSource::Owned(rng) => f(rng),
        }
    }

    pub fn is_shared(&self) -> bool {
        matches!(self, SampleSource::Shared)
    }
}
