use std::collections::HashMap;

use ahash::RandomState;
use serde::{Deserialize, Serialize};

/// Bow (bag of words)
/// token id ごとの出現回数を管理する構造体です
///
/// `total` counts every token of the document, including tokens that were
/// not found in the vocabulary, so that length based local weightings see the
/// real document size.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Bow {
    counts: HashMap<u32, u32, RandomState>,
    total: u64,
}

impl Bow {
    pub fn new() -> Self {
        Self {
            counts: HashMap::with_hasher(RandomState::new()),
            total: 0,
        }
    }

    /// Count one occurrence of `id`
    #[inline]
    pub fn add(&mut self, id: u32) -> &mut Self {
        self.add_n(id, 1)
    }

    /// Count `n` occurrences of `id`
    #[inline]
    pub fn add_n(&mut self, id: u32, n: u32) -> &mut Self {
        if n > 0 {
            *self.counts.entry(id).or_insert(0) += n;
            self.total += n as u64;
        }
        self
    }

    /// Count a token that has no id
    #[inline]
    pub fn add_unknown(&mut self) -> &mut Self {
        self.total += 1;
        self
    }

    /// Merge another bag into this one
    pub fn add_bow(&mut self, other: &Bow) -> &mut Self {
        for (&id, &n) in &other.counts {
            *self.counts.entry(id).or_insert(0) += n;
        }
        self.total += other.total;
        self
    }

    #[inline]
    pub fn count(&self, id: u32) -> u32 {
        self.counts.get(&id).copied().unwrap_or(0)
    }

    /// number of distinct ids
    #[inline]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// number of tokens in the document
    #[inline]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// largest single count, 0 for an empty bag
    pub fn max_count(&self) -> u32 {
        self.counts.values().copied().max().unwrap_or(0)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.counts.iter().map(|(&id, &n)| (id, n))
    }
}

impl FromIterator<u32> for Bow {
    fn from_iter<T: IntoIterator<Item = u32>>(iter: T) -> Self {
        let mut bow = Bow::new();
        for id in iter {
            bow.add(id);
        }
        bow
    }
}
