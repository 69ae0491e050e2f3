// drift_sim/src/simulation/core/prng.rs

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A newtype wrapper around `ChaCha8Rng`.
/// This is the single deterministic pseudo-random number generator of an environment;
/// every component that needs randomness borrows it explicitly.
#[derive(Debug, Clone)]
pub struct SimulationRng(pub ChaCha8Rng);

impl SimulationRng {
    pub fn from_seed(seed: u64) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn as_dyn(&mut self) -> &mut dyn RngCore {
        &mut self.0
    }
}
