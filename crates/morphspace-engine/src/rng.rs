//! Process-wide synchronized random source.
//!
//! The stochastic survival roll in the morph filter draws from one shared
//! generator so that the acceptance pressure is global across worker
//! threads. Tests reseed it for determinism.

use std::sync::OnceLock;

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

static GLOBAL_RNG: OnceLock<Mutex<ChaCha8Rng>> = OnceLock::new();

fn global() -> &'static Mutex<ChaCha8Rng> {
    GLOBAL_RNG.get_or_init(|| Mutex::new(ChaCha8Rng::from_entropy()))
}

/// Uniform integer draw, inclusive on both ends.
pub fn uniform(low: i32, high: i32) -> i32 {
    global().lock().gen_range(low..=high)
}

/// Replaces the generator state with a deterministic seed.
pub fn reseed(seed: u64) {
    *global().lock() = ChaCha8Rng::seed_from_u64(seed);
}
