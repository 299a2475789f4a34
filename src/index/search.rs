use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};
use std::fmt::{self, Debug};

use ahash::RandomState;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::index::{Bm25Params, InvertedFile};
use crate::text::Tokenizer;
use crate::utils::math::vector::SparseVec;
use crate::vectorizer::VectorModel;

/// One search result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitEntry {
    pub doc_id: u32,
    pub score: f32,
}

/// Structure to store search results
/// sorted by descending score, ties by ascending doc id
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hits {
    pub list: Vec<HitEntry>,
}

impl Hits {
    #[inline]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// doc ids in rank order
    pub fn doc_ids(&self) -> Vec<u32> {
        self.list.iter().map(|h| h.doc_id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HitEntry> + '_ {
        self.list.iter()
    }
}

impl Debug for Hits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            writeln!(f, "Hits [")?;
            for hit in &self.list {
                writeln!(f, "    {}: {:.6}", hit.doc_id, hit.score)?;
            }
            write!(f, "]")
        } else {
            f.debug_list()
                .entries(self.list.iter().map(|h| (h.doc_id, h.score)))
                .finish()
        }
    }
}

/// Heap entry, greater means better: higher score, then lower doc id
#[derive(Clone, Copy)]
struct Candidate {
    score: f32,
    doc_id: u32,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.doc_id.cmp(&self.doc_id))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl InvertedFile {
    /// BM25 top-k search
    ///
    /// # Arguments
    /// * `query` - query vector, usually produced by the index model
    /// * `k` - maximum number of results
    pub fn search(&self, query: &SparseVec, k: usize) -> Hits {
        self.search_with(query, k, |_| true)
    }

    /// BM25 top-k search skipping the postings lists of the token ids
    /// rejected by `accept_postinglist` (e.g. very frequent tokens)
    ///
    /// For every accepted query token `t` and document `d` in its list:
    /// `score_d += q_t * idf_t * w*(k1+1) / (w + k1*(1 - b + b*len_d/avglen))`
    /// with `idf_t = ln(1 + (N - df + 0.5) / (df + 0.5))`.
    pub fn search_with<F>(&self, query: &SparseVec, k: usize, accept_postinglist: F) -> Hits
    where
        F: Fn(u32) -> bool,
    {
        if k == 0 || query.is_empty() || self.is_empty() {
            return Hits::default();
        }

        let n = self.len() as f64;
        let Bm25Params { k1, b } = self.params;
        let (k1, b) = (k1 as f64, b as f64);
        let avglen = self.avg_doc_len();

        // shortest lists first keeps the accumulator small
        let mut lists: Vec<(u32, f64, _)> = query
            .iter()
            .filter(|&(t, q)| q != 0.0 && accept_postinglist(t))
            .map(|(t, q)| (t, q as f64, self.postings(t)))
            .filter(|(_, _, list)| !list.is_empty())
            .collect();
        lists.sort_unstable_by_key(|(t, _, list)| (list.len(), *t));

        let mut acc: HashMap<u32, f64, RandomState> = HashMap::with_hasher(RandomState::new());
        for (_, q, list) in lists {
            let df = list.len() as f64;
            let idf = ((n - df + 0.5) / (df + 0.5)).ln_1p();
            for p in list.iter() {
                let w = p.weight as f64;
                let len_norm = if avglen > 0.0 {
                    self.doc_lens[p.doc_id as usize] as f64 / avglen
                } else {
                    1.0
                };
                let denom = w + k1 * (1.0 - b + b * len_norm);
                if denom <= 0.0 {
                    continue;
                }
                *acc.entry(p.doc_id).or_insert(0.0) += q * idf * (w * (k1 + 1.0)) / denom;
            }
        }

        // bounded min-heap: the worst kept candidate sits on top
        let mut heap: BinaryHeap<Reverse<Candidate>> = BinaryHeap::with_capacity(k.min(acc.len()) + 1);
        for (doc_id, score) in acc {
            let c = Candidate {
                score: score as f32,
                doc_id,
            };
            if heap.len() < k {
                heap.push(Reverse(c));
            } else if let Some(Reverse(worst)) = heap.peek() {
                if c > *worst {
                    heap.pop();
                    heap.push(Reverse(c));
                }
            }
        }

        // ascending order of Reverse is best first
        let list = heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(c)| HitEntry {
                doc_id: c.doc_id,
                score: c.score,
            })
            .collect();
        Hits { list }
    }

    /// Tokenize, vectorize with the index model, and search
    pub fn search_text(&self, tokenizer: &mut Tokenizer, text: &str, k: usize) -> Result<Hits> {
        let model = self
            .model()
            .ok_or_else(|| Error::invalid("search_text needs an index built with a vector model"))?;
        self.search_text_with(model, tokenizer, text, k)
    }

    /// Tokenize, vectorize with `model`, and search
    pub fn search_text_with(&self, model: &VectorModel, tokenizer: &mut Tokenizer, text: &str, k: usize) -> Result<Hits> {
        let query = model.vectorize_text(tokenizer, text)?;
        Ok(self.search(&query, k))
    }
}
