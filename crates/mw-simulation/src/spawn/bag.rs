use std::collections::VecDeque;

use rand::Rng;
use rand::seq::SliceRandom;

/// A shuffled, consumable sequence drawn from a fixed pool.
///
/// When the sequence runs out it is refilled with the whole pool and
/// shuffled again, so every item comes up once per pass over the pool.
#[derive(Debug, Clone)]
pub struct SpawnBag<T> {
    pool: Vec<T>,
    remaining: VecDeque<T>,
}

impl<T> Default for SpawnBag<T> {
    fn default() -> Self {
        Self {
            pool: Vec::new(),
            remaining: VecDeque::new(),
        }
    }
}

impl<T: Clone> SpawnBag<T> {
    /// An empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// A bag over `pool`. The first draw shuffles.
    pub fn from_pool(pool: Vec<T>) -> Self {
        Self {
            pool,
            remaining: VecDeque::new(),
        }
    }

    /// Add an item to the pool. It shows up from the next refill on.
    pub fn add(&mut self, item: T) {
        self.pool.push(item);
    }

    /// Take the next item, refilling first if the current pass is used up.
    /// Returns `None` only when the pool is empty.
    pub fn pop<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<T> {
        if self.remaining.is_empty() {
            self.refill(rng);
        }
        self.remaining.pop_front()
    }

    /// Replace the current pass with a fresh shuffle of the pool.
    pub fn refill<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut items = self.pool.clone();
        items.shuffle(rng);
        self.remaining = items.into();
    }

    /// Every item the bag refills from.
    pub fn pool(&self) -> &[T] {
        &self.pool
    }

    /// Items left in the current pass, in draw order.
    pub fn remaining(&self) -> impl ExactSizeIterator<Item = &T> {
        self.remaining.iter()
    }

    /// True when the pool is empty and nothing can ever be drawn.
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Empty the pool and the current pass.
    pub fn clear(&mut self) {
        self.pool.clear();
        self.remaining.clear();
    }

    pub(crate) fn restore(pool: Vec<T>, remaining: Vec<T>) -> Self {
        Self {
            pool,
            remaining: remaining.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    use super::*;

    fn sorted<T: Ord>(mut v: Vec<T>) -> Vec<T> {
        v.sort();
        v
    }

    #[test]
    fn refill_scenario_abc() {
        let mut rng = ChaCha12Rng::seed_from_u64(7);
        let mut bag = SpawnBag::from_pool(vec!['A', 'B', 'C']);

        let first: Vec<char> = (0..3).map(|_| bag.pop(&mut rng).unwrap()).collect();
        assert_eq!(sorted(first), vec!['A', 'B', 'C']);
        assert_eq!(bag.remaining().len(), 0);

        // The fourth draw starts a new pass
        let second: Vec<char> = (0..3).map(|_| bag.pop(&mut rng).unwrap()).collect();
        assert_eq!(bag.remaining().len(), 0);
        assert_eq!(sorted(second), vec!['A', 'B', 'C']);
    }

    #[test]
    fn empty_pool_yields_nothing() {
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        let mut bag: SpawnBag<u32> = SpawnBag::new();
        assert!(bag.pop(&mut rng).is_none());
        assert!(bag.pop(&mut rng).is_none());
        assert!(bag.is_empty());
    }

    #[test]
    fn items_added_later_join_next_pass() {
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        let mut bag = SpawnBag::from_pool(vec![1, 2]);
        bag.pop(&mut rng).unwrap();
        bag.add(3);
        assert_eq!(bag.remaining().len(), 1);
        bag.pop(&mut rng).unwrap();
        let pass: Vec<i32> = (0..3).map(|_| bag.pop(&mut rng).unwrap()).collect();
        assert_eq!(sorted(pass), vec![1, 2, 3]);
    }

    #[test]
    fn same_seed_same_draws() {
        let draw = |seed| {
            let mut rng = ChaCha12Rng::seed_from_u64(seed);
            let mut bag = SpawnBag::from_pool((0..10).collect::<Vec<u32>>());
            (0..25).map(|_| bag.pop(&mut rng).unwrap()).collect::<Vec<_>>()
        };
        assert_eq!(draw(99), draw(99));
    }

    #[test]
    fn shuffle_reaches_every_position() {
        // Each item should land first at least once over many shuffles
        let mut rng = ChaCha12Rng::seed_from_u64(11);
        let mut seen_first = [false; 4];
        for _ in 0..200 {
            let mut items = [0usize, 1, 2, 3];
            items.shuffle(&mut rng);
            seen_first[items[0]] = true;
        }
        assert!(seen_first.iter().all(|s| *s));
    }

    proptest! {
        #[test]
        fn every_pass_is_a_permutation(n in 1usize..20, passes in 1usize..5, seed: u64) {
            let mut rng = ChaCha12Rng::seed_from_u64(seed);
            let pool: Vec<usize> = (0..n).collect();
            let mut bag = SpawnBag::from_pool(pool.clone());
            for _ in 0..passes {
                let window: Vec<usize> = (0..n).map(|_| bag.pop(&mut rng).unwrap()).collect();
                prop_assert_eq!(sorted(window), pool.clone());
            }
        }
    }
}
