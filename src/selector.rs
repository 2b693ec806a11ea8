//! Non-repeating random draws over the icon pool.

use std::collections::HashSet;
use std::hash::Hash;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Draws grid selections and round sequences.
///
/// Holds its own RNG so a seeded selector replays the same games.
#[derive(Debug, Clone)]
pub struct RandomSelector<R = StdRng> {
    rng: R,
}

impl RandomSelector<StdRng> {
    /// Creates a selector seeded from the operating system.
    #[must_use]
    pub fn from_os_rng() -> Self {
        Self::new(StdRng::from_os_rng())
    }

    /// Creates a deterministic selector.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RandomSelector<R> {
    /// Wraps an existing RNG.
    pub const fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Draws `k` distinct elements from `pool`.
    ///
    /// Picks uniformly random indices and keeps an element only if it is
    /// not already in the result, until `k` elements are held. The
    /// result order is the order in which elements were accepted.
    ///
    /// # Panics
    ///
    /// Panics if `pool` holds fewer than `k` distinct elements. The draw
    /// could never finish in that case; callers validate pool size up
    /// front (see [`IconPool::new`](crate::icon::IconPool::new)).
    pub fn select_subset<T>(&mut self, pool: &[T], k: usize) -> Vec<T>
    where
        T: Clone + Eq + Hash,
    {
        let distinct = pool.iter().collect::<HashSet<_>>().len();
        assert!(
            distinct >= k,
            "cannot draw {k} distinct elements from a pool of {distinct}"
        );

        let mut result: Vec<T> = Vec::with_capacity(k);
        while result.len() < k {
            let candidate = &pool[self.rng.random_range(0..pool.len())];
            if !result.contains(candidate) {
                result.push(candidate.clone());
            }
        }
        result
    }

    /// Returns the elements of `set` in a uniformly random order.
    pub fn shuffle<T: Clone>(&mut self, set: &[T]) -> Vec<T> {
        let mut sequence = set.to_vec();
        sequence.shuffle(&mut self.rng);
        sequence
    }
}
