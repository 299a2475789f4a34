use std::collections::HashMap;
use std::iter::Zip;
use std::slice;

use ahash::RandomState;
use serde::{Deserialize, Serialize};

/// One entry of a postings list
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: u32,
    pub weight: f32,
}

/// Postings lists keyed by token id
///
/// Only tokens that were posted at least once own a list, so memory follows
/// the number of distinct tokens and not the largest token id.
///
/// `Open` lists grow one posting at a time. `Frozen` packs every list into
/// two flat arrays (doc ids / weights); `tokens` is sorted and list `i`
/// (of token `tokens[i]`) is `offsets[i]..offsets[i + 1]`.
///
/// Every list is sorted by ascending doc id: documents are appended with
/// increasing ids and loaded lists are checked.
#[derive(Debug, Clone, PartialEq)]
pub enum Postings {
    Open(HashMap<u32, Vec<Posting>, RandomState>),
    Frozen {
        tokens: Vec<u32>,
        offsets: Vec<usize>,
        doc_ids: Vec<u32>,
        weights: Vec<f32>,
    },
}

impl Default for Postings {
    fn default() -> Self {
        Postings::Open(HashMap::with_hasher(RandomState::new()))
    }
}

impl Postings {
    /// Open postings from `(token, list)` pairs
    pub(crate) fn from_lists<I>(lists: I) -> Self
    where
        I: IntoIterator<Item = (u32, Vec<Posting>)>,
    {
        let mut map = HashMap::with_hasher(RandomState::new());
        map.extend(lists.into_iter().filter(|(_, list)| !list.is_empty()));
        Postings::Open(map)
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        matches!(self, Postings::Frozen { .. })
    }

    /// Number of non-empty lists
    pub fn n_lists(&self) -> usize {
        match self {
            Postings::Open(lists) => lists.len(),
            Postings::Frozen { tokens, .. } => tokens.len(),
        }
    }

    /// Total number of postings
    pub fn n_postings(&self) -> usize {
        match self {
            Postings::Open(lists) => lists.values().map(Vec::len).sum(),
            Postings::Frozen { doc_ids, .. } => doc_ids.len(),
        }
    }

    /// Token ids owning a list, ascending
    pub fn tokens(&self) -> Vec<u32> {
        match self {
            Postings::Open(lists) => {
                let mut tokens: Vec<u32> = lists.keys().copied().collect();
                tokens.sort_unstable();
                tokens
            }
            Postings::Frozen { tokens, .. } => tokens.clone(),
        }
    }

    /// List of `token`, empty when the token was never posted
    pub fn get(&self, token: u32) -> PostingsView<'_> {
        match self {
            Postings::Open(lists) => PostingsView::Open(lists.get(&token).map(Vec::as_slice).unwrap_or(&[])),
            Postings::Frozen {
                tokens,
                offsets,
                doc_ids,
                weights,
            } => match tokens.binary_search(&token) {
                Ok(i) => {
                    let (s, e) = (offsets[i], offsets[i + 1]);
                    PostingsView::Frozen {
                        doc_ids: &doc_ids[s..e],
                        weights: &weights[s..e],
                    }
                }
                Err(_) => PostingsView::Open(&[]),
            },
        }
    }

    /// Open lists for appending, `None` once frozen
    pub(crate) fn open_lists(&mut self) -> Option<&mut HashMap<u32, Vec<Posting>, RandomState>> {
        match self {
            Postings::Open(lists) => Some(lists),
            Postings::Frozen { .. } => None,
        }
    }

    /// Pack the open lists into the frozen layout.
    /// Frozen postings are left untouched.
    pub fn freeze(&mut self) {
        let Postings::Open(lists) = self else {
            return;
        };
        let mut tokens: Vec<u32> = lists.keys().copied().collect();
        tokens.sort_unstable();
        let total = lists.values().map(Vec::len).sum();
        let mut offsets = Vec::with_capacity(tokens.len() + 1);
        let mut doc_ids = Vec::with_capacity(total);
        let mut weights = Vec::with_capacity(total);
        offsets.push(0);
        for token in &tokens {
            if let Some(list) = lists.get(token) {
                debug_assert!(list.windows(2).all(|w| w[0].doc_id < w[1].doc_id));
                for p in list {
                    doc_ids.push(p.doc_id);
                    weights.push(p.weight);
                }
            }
            offsets.push(doc_ids.len());
        }
        *self = Postings::Frozen {
            tokens,
            offsets,
            doc_ids,
            weights,
        };
    }
}

/// Borrowed postings list of one token
#[derive(Debug, Clone, Copy)]
pub enum PostingsView<'a> {
    Open(&'a [Posting]),
    Frozen {
        doc_ids: &'a [u32],
        weights: &'a [f32],
    },
}

impl<'a> PostingsView<'a> {
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            PostingsView::Open(list) => list.len(),
            PostingsView::Frozen { doc_ids, .. } => doc_ids.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn iter(&self) -> PostingsIter<'a> {
        match *self {
            PostingsView::Open(list) => PostingsIter::Open(list.iter()),
            PostingsView::Frozen { doc_ids, weights } => PostingsIter::Frozen(doc_ids.iter().zip(weights.iter())),
        }
    }
}

impl<'a> IntoIterator for PostingsView<'a> {
    type Item = Posting;
    type IntoIter = PostingsIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`PostingsView`]
pub enum PostingsIter<'a> {
    Open(slice::Iter<'a, Posting>),
    Frozen(Zip<slice::Iter<'a, u32>, slice::Iter<'a, f32>>),
}

impl Iterator for PostingsIter<'_> {
    type Item = Posting;

    #[inline]
    fn next(&mut self) -> Option<Posting> {
        match self {
            PostingsIter::Open(it) => it.next().copied(),
            PostingsIter::Frozen(it) => it.next().map(|(&doc_id, &weight)| Posting { doc_id, weight }),
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            PostingsIter::Open(it) => it.size_hint(),
            PostingsIter::Frozen(it) => it.size_hint(),
        }
    }
}

impl ExactSizeIterator for PostingsIter<'_> {}
