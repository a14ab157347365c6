//! Deterministic simulation RNG resource.
//!
//! Wraps `ChaCha8Rng` so identical `(layout, params, seed)` triples produce
//! identical event sequences on every platform. All randomness in the
//! engine (fire spread draws) goes through `ResMut<SimRng>`; nothing uses
//! `rand::thread_rng`.

use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[derive(Resource)]
pub struct SimRng(pub ChaCha8Rng);

impl SimRng {
    pub fn from_seed_u64(seed: u64) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed))
    }
}
