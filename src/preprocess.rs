//! Item reordering ahead of model compilation.
//!
//! The preprocessor permutes items and remembers the permutation so the
//! result projector can map solve-time positions back to original indices.
//! Sorting is stable (ties keep their original relative order) and labels
//! travel with their item.

use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::model::{Item, SortMethod};

/// Bijection mapping solve-time item position to original item index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Permutation(Vec<usize>);

impl Permutation {
    /// The identity permutation on `[0, n)`.
    pub fn identity(n: usize) -> Self {
        Self((0..n).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Original index of the item at the given solve-time position.
    pub fn original_index(&self, position: usize) -> usize {
        self.0[position]
    }

    /// Checks that the mapping is a bijection on `[0, n)`.
    pub fn is_bijection(&self) -> bool {
        let mut seen = vec![false; self.0.len()];
        for &index in &self.0 {
            if index >= seen.len() || seen[index] {
                return false;
            }
            seen[index] = true;
        }
        true
    }
}

/// RNG collaborator: produces a uniformly random bijection on `[0, n)`.
///
/// Injected per preprocessing call instead of a process-wide source, so
/// tests are deterministic and parallel runs do not share state.
pub trait IndexShuffler {
    fn permutation(&mut self, n: usize) -> Vec<usize>;
}

/// Default shuffler backed by a seedable RNG.
///
/// The same seed reproduces the same permutation and therefore the same
/// packing result across runs.
pub struct SeededShuffler {
    rng: StdRng,
}

impl SeededShuffler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// A shuffler seeded from OS entropy, for requests without a seed.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Seed chosen once per request from this shuffler's stream; the API
    /// reports it so random runs can be replayed.
    pub fn fork_seed(&mut self) -> u64 {
        self.rng.r#gen()
    }
}

impl IndexShuffler for SeededShuffler {
    fn permutation(&mut self, n: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(&mut self.rng);
        indices
    }
}

/// Reorders items according to the sort method.
///
/// Returns the reordered items together with the permutation that maps each
/// solve-time position back to the original index. The shuffler is only
/// consulted for `SortMethod::Random`.
pub fn reorder(
    items: &[Item],
    method: SortMethod,
    shuffler: &mut dyn IndexShuffler,
) -> (Vec<Item>, Permutation) {
    let order: Vec<usize> = match method {
        SortMethod::None => return (items.to_vec(), Permutation::identity(items.len())),
        SortMethod::Asc => {
            let mut indices: Vec<usize> = (0..items.len()).collect();
            indices.sort_by(|&a, &b| {
                items[a]
                    .weight
                    .partial_cmp(&items[b].weight)
                    .unwrap_or(Ordering::Equal)
            });
            indices
        }
        SortMethod::Desc => {
            let mut indices: Vec<usize> = (0..items.len()).collect();
            indices.sort_by(|&a, &b| {
                items[b]
                    .weight
                    .partial_cmp(&items[a].weight)
                    .unwrap_or(Ordering::Equal)
            });
            indices
        }
        SortMethod::Random => shuffler.permutation(items.len()),
    };

    let reordered = order.iter().map(|&index| items[index].clone()).collect();
    let permutation = Permutation(order);
    debug_assert!(permutation.is_bijection());
    (reordered, permutation)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(weights: &[f64]) -> Vec<Item> {
        weights
            .iter()
            .enumerate()
            .map(|(i, &w)| Item::new(i, w, Some(format!("item-{}", i))).unwrap())
            .collect()
    }

    #[test]
    fn none_is_identity() {
        let items = items(&[30.0, 10.0, 20.0]);
        let mut shuffler = SeededShuffler::new(0);
        let (reordered, perm) = reorder(&items, SortMethod::None, &mut shuffler);
        assert_eq!(reordered, items);
        assert_eq!(perm, Permutation::identity(3));
        assert_eq!(perm.len(), 3);
        assert!(!perm.is_empty());
    }

    #[test]
    fn asc_sorts_by_weight_and_maps_back() {
        let items = items(&[30.0, 10.0, 20.0]);
        let mut shuffler = SeededShuffler::new(0);
        let (reordered, perm) = reorder(&items, SortMethod::Asc, &mut shuffler);
        let weights: Vec<f64> = reordered.iter().map(|i| i.weight).collect();
        assert_eq!(weights, vec![10.0, 20.0, 30.0]);
        // Position 0 holds the item that was originally at index 1.
        assert_eq!(perm.original_index(0), 1);
        assert_eq!(perm.original_index(2), 0);
        assert!(perm.is_bijection());
    }

    #[test]
    fn desc_sorts_by_weight() {
        let items = items(&[30.0, 10.0, 20.0]);
        let mut shuffler = SeededShuffler::new(0);
        let (reordered, _) = reorder(&items, SortMethod::Desc, &mut shuffler);
        let weights: Vec<f64> = reordered.iter().map(|i| i.weight).collect();
        assert_eq!(weights, vec![30.0, 20.0, 10.0]);
    }

    #[test]
    fn sorting_is_stable_on_ties() {
        let items = items(&[20.0, 10.0, 20.0, 10.0]);
        let mut shuffler = SeededShuffler::new(0);
        let (_, perm) = reorder(&items, SortMethod::Asc, &mut shuffler);
        // The two 10s keep their relative order, as do the two 20s.
        assert_eq!(perm.original_index(0), 1);
        assert_eq!(perm.original_index(1), 3);
        assert_eq!(perm.original_index(2), 0);
        assert_eq!(perm.original_index(3), 2);
    }

    #[test]
    fn labels_travel_with_their_item() {
        let items = items(&[30.0, 10.0, 20.0]);
        let mut shuffler = SeededShuffler::new(0);
        let (reordered, perm) = reorder(&items, SortMethod::Asc, &mut shuffler);
        for (position, item) in reordered.iter().enumerate() {
            assert_eq!(
                item.label.as_deref(),
                Some(format!("item-{}", perm.original_index(position)).as_str())
            );
        }
    }

    #[test]
    fn random_is_a_bijection_and_seed_reproducible() {
        let items = items(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);

        let (first, perm_a) = reorder(&items, SortMethod::Random, &mut SeededShuffler::new(42));
        let (second, perm_b) = reorder(&items, SortMethod::Random, &mut SeededShuffler::new(42));
        assert!(perm_a.is_bijection());
        assert_eq!(perm_a, perm_b);
        assert_eq!(first, second);

        let (_, perm_c) = reorder(&items, SortMethod::Random, &mut SeededShuffler::new(43));
        assert!(perm_c.is_bijection());
    }

    #[test]
    fn identity_detects_non_bijections() {
        assert!(Permutation::identity(4).is_bijection());
        assert!(!Permutation(vec![0, 0, 1]).is_bijection());
        assert!(!Permutation(vec![0, 3]).is_bijection());
    }
}
