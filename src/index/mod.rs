pub mod persist;
pub mod postings;
pub mod search;
pub mod shared;

use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use ahash::RandomState;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::utils::math::vector::SparseVec;
use crate::vectorizer::bow::Bow;
use crate::vectorizer::VectorModel;

use self::postings::{Posting, Postings, PostingsView};

/// BM25 parameters
///
/// - `k1`: term weight saturation, `>= 0`
/// - `b`: document length normalization, in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

impl Bm25Params {
    pub fn validate(&self) -> Result<()> {
        if !self.k1.is_finite() || self.k1 < 0.0 {
            return Err(Error::invalid(format!("bm25 k1 must be finite and >= 0, got {}", self.k1)));
        }
        if !(0.0..=1.0).contains(&self.b) {
            return Err(Error::invalid(format!("bm25 b must be in [0, 1], got {}", self.b)));
        }
        Ok(())
    }
}

/// Inverted File
/// token id ごとの postings list と文書長を保持し、BM25 で top-k 検索します
///
/// Documents get consecutive ids starting at 0 and are never removed. The
/// length of a document is the sum of its posted weights.
///
/// The index starts open: `append`, `append_bow` and `extend` grow it.
/// [`InvertedFile::freeze`] packs the postings into a read-only layout; after
/// that every append fails with [`Error::InvalidParameter`].
///
/// An index may carry the [`VectorModel`] its documents were vectorized
/// with, which enables `append_bow` and the text search entry points.
#[derive(Debug, Clone, Default)]
pub struct InvertedFile {
    postings: Postings,
    doc_lens: Vec<f32>,
    total_len: f64,
    params: Bm25Params,
    model: Option<Arc<VectorModel>>,
}

impl InvertedFile {
    /// Create an empty index with the default BM25 parameters and no model
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty index with the given BM25 parameters
    pub fn with_params(params: Bm25Params) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            ..Self::default()
        })
    }

    /// Create an empty index bound to a vector model
    pub fn with_model(model: VectorModel) -> Self {
        Self {
            model: Some(Arc::new(model)),
            ..Self::default()
        }
    }

    /// Replace the BM25 parameters
    pub fn set_params(&mut self, params: Bm25Params) -> Result<()> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    /// Build a frozen index from vectors, document `i` is `vectors[i]`.
    /// Vectors are expected to be valid (finite, non negative weights).
    pub(crate) fn from_vectors(vectors: &[SparseVec]) -> Self {
        let mut index = Self::new();
        index.post_all(vectors);
        index.freeze();
        index
    }

    #[inline]
    pub fn params(&self) -> Bm25Params {
        self.params
    }

    #[inline]
    pub fn model(&self) -> Option<&VectorModel> {
        self.model.as_deref()
    }

    /// Number of documents
    #[inline]
    pub fn len(&self) -> usize {
        self.doc_lens.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.doc_lens.is_empty()
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.postings.is_frozen()
    }

    /// Length of a document, `None` for unknown ids
    #[inline]
    pub fn doc_len(&self, doc_id: u32) -> Option<f32> {
        self.doc_lens.get(doc_id as usize).copied()
    }

    /// Average document length, 0 for an empty index
    #[inline]
    pub fn avg_doc_len(&self) -> f64 {
        if self.doc_lens.is_empty() {
            0.0
        } else {
            self.total_len / self.doc_lens.len() as f64
        }
    }

    /// Postings list of a token id, empty for unknown ids
    #[inline]
    pub fn postings(&self, token: u32) -> PostingsView<'_> {
        self.postings.get(token)
    }

    /// Number of tokens with at least one posting
    #[inline]
    pub fn n_tokens(&self) -> usize {
        self.postings.n_lists()
    }

    /// Token ids with at least one posting, ascending
    pub fn tokens(&self) -> Vec<u32> {
        self.postings.tokens()
    }

    /// Total number of postings
    #[inline]
    pub fn n_postings(&self) -> usize {
        self.postings.n_postings()
    }

    /// Pack the postings into the read-only layout. One way.
    pub fn freeze(&mut self) {
        if !self.is_frozen() {
            self.postings.freeze();
            log::debug!(
                "inverted file frozen: {} documents, {} postings",
                self.len(),
                self.n_postings()
            );
        }
    }

    /// Append one document
    ///
    /// # Returns
    /// * `u32` - the new document id
    pub fn append(&mut self, vec: &SparseVec) -> Result<u32> {
        self.check_open()?;
        check_vector(vec, self.token_limit())?;
        let doc_id = self.next_doc_id(1)?;
        self.post_all(std::slice::from_ref(vec));
        Ok(doc_id)
    }

    /// Vectorize a bag with the index model and append it
    pub fn append_bow(&mut self, bow: &Bow) -> Result<u32> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| Error::invalid("append_bow needs an index built with a vector model"))?;
        let vec = model.vectorize(bow);
        self.append(&vec)
    }

    /// Append many documents, building the postings in parallel
    ///
    /// # Returns
    /// * `Range<u32>` - ids given to `vectors`, in order
    pub fn extend(&mut self, vectors: &[SparseVec]) -> Result<Range<u32>> {
        self.check_open()?;
        let limit = self.token_limit();
        vectors.par_iter().try_for_each(|vec| check_vector(vec, limit))?;
        let first = self.next_doc_id(vectors.len())?;
        self.post_all(vectors);
        log::debug!("appended {} documents, index holds {}", vectors.len(), self.len());
        Ok(first..first + vectors.len() as u32)
    }

    fn check_open(&self) -> Result<()> {
        if self.is_frozen() {
            return Err(Error::invalid("cannot append to a frozen index"));
        }
        Ok(())
    }

    /// token ids must stay inside the model vocabulary, if any
    fn token_limit(&self) -> Option<u32> {
        self.model.as_ref().map(|m| m.len() as u32)
    }

    /// id of the first of `n` new documents
    fn next_doc_id(&self, n: usize) -> Result<u32> {
        let next = self.doc_lens.len() as u64;
        if next + n as u64 > u32::MAX as u64 {
            return Err(Error::invalid("document id space exhausted"));
        }
        Ok(next as u32)
    }

    /// Post `vectors` as the next documents. The index must be open.
    fn post_all(&mut self, vectors: &[SparseVec]) {
        let Some(lists) = self.postings.open_lists() else {
            return;
        };
        let base = self.doc_lens.len() as u32;

        if vectors.len() == 1 {
            for (token, weight) in vectors[0].iter() {
                push_posting(lists, token, Posting { doc_id: base, weight });
            }
        } else {
            // bucket per token in parallel, then one list at a time
            let mut buckets: HashMap<u32, Vec<Posting>, RandomState> = vectors
                .par_iter()
                .enumerate()
                .fold(
                    || HashMap::with_hasher(RandomState::new()),
                    |mut acc: HashMap<u32, Vec<Posting>, RandomState>, (i, vec)| {
                        for (token, weight) in vec.iter() {
                            acc.entry(token).or_default().push(Posting {
                                doc_id: base + i as u32,
                                weight,
                            });
                        }
                        acc
                    },
                )
                .reduce(
                    || HashMap::with_hasher(RandomState::new()),
                    |mut a, b| {
                        for (token, mut list) in b {
                            a.entry(token).or_default().append(&mut list);
                        }
                        a
                    },
                );
            buckets
                .par_iter_mut()
                .for_each(|(_, list)| list.sort_unstable_by_key(|p| p.doc_id));

            // new doc ids are above every posted one, so lists stay sorted
            for (token, list) in buckets.drain() {
                lists.entry(token).or_default().extend(list);
            }
        }

        let lens: Vec<f32> = vectors
            .par_iter()
            .map(|vec| vec.iter().map(|(_, w)| w as f64).sum::<f64>() as f32)
            .collect();
        self.total_len += lens.iter().map(|&l| l as f64).sum::<f64>();
        self.doc_lens.extend(lens);
    }

    /// Reassemble a persisted index
    pub(crate) fn from_parts(
        postings: Postings,
        doc_lens: Vec<f32>,
        params: Bm25Params,
        model: Option<VectorModel>,
    ) -> Self {
        let total_len = doc_lens.iter().map(|&l| l as f64).sum();
        Self {
            postings,
            doc_lens,
            total_len,
            params,
            model: model.map(Arc::new),
        }
    }

    pub(crate) fn doc_lens(&self) -> &[f32] {
        &self.doc_lens
    }
}

#[inline]
fn push_posting(lists: &mut HashMap<u32, Vec<Posting>, RandomState>, token: u32, posting: Posting) {
    lists.entry(token).or_default().push(posting);
}

fn check_vector(vec: &SparseVec, token_limit: Option<u32>) -> Result<()> {
    for (token, w) in vec.iter() {
        if !w.is_finite() || w < 0.0 {
            return Err(Error::invalid(format!(
                "document weights must be finite and >= 0, token {token} has {w}"
            )));
        }
        if token_limit.is_some_and(|limit| token >= limit) {
            return Err(Error::invalid(format!("token {token} is outside the model vocabulary")));
        }
    }
    Ok(())
}
