//! Seeded random selection of friend peers and purchased games.

use rand::SeedableRng;
use rand::rngs::StdRng;

/// Random source for a run. The seed is logged so a run can be replayed.
pub struct Sampler {
    seed: u64,
    rng: StdRng,
}

impl Sampler {
    /// Use `seed` if given, otherwise draw one.
    pub fn new(seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(rand::random);
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Pick `min(amount, len)` distinct indices out of `0..len`.
    pub fn distinct_indices(&mut self, len: usize, amount: usize) -> Vec<usize> {
        let amount = amount.min(len);
        rand::seq::index::sample(&mut self.rng, len, amount).into_vec()
    }

    /// Pick `min(amount, items.len())` distinct items.
    pub fn pick<'a, T>(&mut self, items: &'a [T], amount: usize) -> Vec<&'a T> {
        self.distinct_indices(items.len(), amount)
            .into_iter()
            .map(|i| &items[i])
            .collect()
    }
}
