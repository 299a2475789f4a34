pub mod math;
pub mod convert;
pub mod distance;

use std::collections::HashMap;
use std::fmt;

use ahash::RandomState;
use serde::{Deserialize, Serialize};

/// SparseVec は token id をキーとした疎ベクトルです
/// 存在しないキーの重みは 0 とみなします
///
/// Weights are expected to be finite. Producers (the vector model, the
/// algebra below) never store an explicit zero; `insert` of a zero removes
/// the key.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVec {
    map: HashMap<u32, f32, RandomState>,
}

impl SparseVec {
    /// Create an empty vector
    #[inline]
    pub fn new() -> Self {
        Self {
            map: HashMap::with_hasher(RandomState::new()),
        }
    }

    #[inline]
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            map: HashMap::with_capacity_and_hasher(cap, RandomState::new()),
        }
    }

    /// Build from `(id, weight)` pairs, summing duplicated ids
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (u32, f32)>,
    {
        let mut vec = Self::new();
        for (id, w) in pairs {
            vec.add_pair(id, w);
        }
        vec
    }

    /// Build from pairs sorted by id (the frozen index layout)
    pub fn from_sorted(ids: &[u32], weights: &[f32]) -> Self {
        debug_assert_eq!(ids.len(), weights.len());
        let mut vec = Self::with_capacity(ids.len());
        for (&id, &w) in ids.iter().zip(weights) {
            vec.insert(id, w);
        }
        vec
    }

    /// number of non-zero entries
    #[inline]
    pub fn nnz(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Weight of `id`, 0 when absent
    #[inline]
    pub fn get(&self, id: u32) -> f32 {
        self.map.get(&id).copied().unwrap_or(0.0)
    }

    #[inline]
    pub fn contains(&self, id: u32) -> bool {
        self.map.contains_key(&id)
    }

    /// Set the weight of `id`; a zero weight removes the entry
    #[inline]
    pub fn insert(&mut self, id: u32, weight: f32) {
        if weight == 0.0 {
            self.map.remove(&id);
        } else {
            self.map.insert(id, weight);
        }
    }

    /// `self[id] += weight`
    #[inline]
    pub fn add_pair(&mut self, id: u32, weight: f32) {
        let w = self.map.entry(id).or_insert(0.0);
        *w += weight;
        if *w == 0.0 {
            self.map.remove(&id);
        }
    }

    #[inline]
    pub fn remove(&mut self, id: u32) -> Option<f32> {
        self.map.remove(&id)
    }

    /// Drop every entry whose absolute weight is below `minweight`
    pub fn prune(&mut self, minweight: f32) {
        self.map.retain(|_, w| w.abs() >= minweight);
    }

    #[inline]
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Unordered iteration over `(id, weight)`
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        self.map.iter().map(|(&id, &w)| (id, w))
    }

    #[inline]
    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.map.keys().copied()
    }

    #[inline]
    pub(crate) fn weights_mut(&mut self) -> impl Iterator<Item = &mut f32> + '_ {
        self.map.values_mut()
    }

    /// Entries sorted by ascending id
    pub fn to_sorted(&self) -> Vec<(u32, f32)> {
        let mut pairs: Vec<(u32, f32)> = self.iter().collect();
        pairs.sort_unstable_by_key(|&(id, _)| id);
        pairs
    }

    /// Entry with the largest weight, ties by smallest id
    pub fn argmax(&self) -> Option<(u32, f32)> {
        self.iter().reduce(|best, cur| {
            match cur.1.total_cmp(&best.1) {
                std::cmp::Ordering::Greater => cur,
                std::cmp::Ordering::Equal if cur.0 < best.0 => cur,
                _ => best,
            }
        })
    }

    /// Entry with the smallest weight, ties by smallest id
    pub fn argmin(&self) -> Option<(u32, f32)> {
        self.iter().reduce(|best, cur| {
            match cur.1.total_cmp(&best.1) {
                std::cmp::Ordering::Less => cur,
                std::cmp::Ordering::Equal if cur.0 < best.0 => cur,
                _ => best,
            }
        })
    }

    #[inline]
    pub fn maximum(&self) -> Option<f32> {
        self.argmax().map(|(_, w)| w)
    }

    #[inline]
    pub fn minimum(&self) -> Option<f32> {
        self.argmin().map(|(_, w)| w)
    }
}

impl FromIterator<(u32, f32)> for SparseVec {
    fn from_iter<T: IntoIterator<Item = (u32, f32)>>(iter: T) -> Self {
        Self::from_pairs(iter)
    }
}

impl Extend<(u32, f32)> for SparseVec {
    fn extend<T: IntoIterator<Item = (u32, f32)>>(&mut self, iter: T) {
        for (id, w) in iter {
            self.add_pair(id, w);
        }
    }
}

impl fmt::Debug for SparseVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 表示は id 昇順
        f.debug_map().entries(self.to_sorted()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_weights_are_not_stored() {
        let mut v = SparseVec::new();
        v.insert(3, 0.0);
        assert!(v.is_empty());
        v.add_pair(1, 2.0);
        v.add_pair(1, -2.0);
        assert!(!v.contains(1));
        assert_eq!(v.get(7), 0.0);
    }

    #[test]
    fn argmax_breaks_ties_by_id() {
        let v = SparseVec::from_pairs([(5, 1.0), (2, 1.0), (9, 0.5)]);
        assert_eq!(v.argmax(), Some((2, 1.0)));
        assert_eq!(v.argmin(), Some((9, 0.5)));
        assert_eq!(SparseVec::new().maximum(), None);
    }

    #[test]
    fn sorted_layout_round_trips() {
        let v = SparseVec::from_pairs([(9, 0.1), (1, 0.2), (4, 0.3)]);
        let sorted = v.to_sorted();
        assert_eq!(sorted.iter().map(|p| p.0).collect::<Vec<_>>(), vec![1, 4, 9]);
        let (ids, ws): (Vec<u32>, Vec<f32>) = sorted.into_iter().unzip();
        assert_eq!(SparseVec::from_sorted(&ids, &ws), v);
    }
}
