use ahash::RandomState;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::index::InvertedFile;
use crate::utils::math::vector::SparseVec;
use crate::vectorizer::vocabulary::Vocabulary;

/// q-gram size of the approximate lookup index
const QSIZE: usize = 3;
/// number of candidates verified per lookup
const CANDIDATES: usize = 32;

/// String distances used to verify approximate vocabulary matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StringDistance {
    /// edit distance in characters
    Levenshtein,
    /// edit distance divided by the longer length, in `[0, 1]`
    NormalizedLevenshtein,
    /// `1 - |A ∩ B| / |A ∪ B|` over the padded character 3-grams
    Jaccard,
}

impl StringDistance {
    pub fn evaluate(&self, a: &str, b: &str) -> f32 {
        match self {
            StringDistance::Levenshtein => levenshtein(a, b) as f32,
            StringDistance::NormalizedLevenshtein => {
                let longest = a.chars().count().max(b.chars().count());
                if longest == 0 {
                    0.0
                } else {
                    levenshtein(a, b) as f32 / longest as f32
                }
            }
            StringDistance::Jaccard => {
                let qa = qgrams(a);
                let qb = qgrams(b);
                let inter = qa.iter().filter(|g| qb.contains(*g)).count();
                let union = qa.len() + qb.len() - inter;
                if union == 0 {
                    0.0
                } else {
                    1.0 - inter as f32 / union as f32
                }
            }
        }
    }
}

/// Character level edit distance (insert / delete / substitute)
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev_row: Vec<usize> = (0..=b.len()).collect();
    let mut curr_row = vec![0; b.len() + 1];
    for i in 1..=a.len() {
        curr_row[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr_row[j] = (prev_row[j] + 1)
                .min(curr_row[j - 1] + 1)
                .min(prev_row[j - 1] + cost);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }
    prev_row[b.len()]
}

/// distinct 3-grams of the token padded with one blank on each side
fn qgrams(token: &str) -> IndexSet<String, RandomState> {
    let mut padded: Vec<char> = Vec::with_capacity(token.len() + 2);
    padded.push(' ');
    padded.extend(token.chars());
    padded.push(' ');

    let mut set = IndexSet::with_hasher(RandomState::new());
    if padded.len() < QSIZE {
        set.insert(padded.iter().collect());
        return set;
    }
    for w in padded.windows(QSIZE) {
        set.insert(w.iter().collect());
    }
    set
}

/// Inverted file over the character q-grams of every vocabulary token.
/// Document `i` of the inner index is token id `i`.
#[derive(Debug)]
pub(crate) struct QgramIndex {
    grams: IndexSet<Box<str>, RandomState>,
    index: InvertedFile,
}

impl QgramIndex {
    pub(crate) fn build(voc: &Vocabulary) -> Self {
        let mut grams: IndexSet<Box<str>, RandomState> = IndexSet::with_hasher(RandomState::new());
        let vectors: Vec<SparseVec> = voc
            .iter()
            .map(|(_, token, _)| {
                let mut vec: SparseVec = qgrams(token)
                    .into_iter()
                    .map(|g| (grams.insert_full(g.into_boxed_str()).0 as u32, 1.0))
                    .collect();
                vec.normalize_mut();
                vec
            })
            .collect();
        log::debug!(
            "approximate lookup index: {} grams over {} tokens",
            grams.len(),
            vectors.len()
        );
        Self {
            grams,
            index: InvertedFile::from_vectors(&vectors),
        }
    }

    /// Token ids sharing q-grams with `token`, best first
    pub(crate) fn candidates(&self, token: &str) -> Vec<u32> {
        let mut query: SparseVec = qgrams(token)
            .iter()
            .filter_map(|g| self.grams.get_index_of(g.as_str()))
            .map(|i| (i as u32, 1.0))
            .collect();
        if query.is_empty() {
            return Vec::new();
        }
        query.normalize_mut();
        self.index
            .search(&query, CANDIDATES)
            .list
            .into_iter()
            .map(|h| h.doc_id)
            .collect()
    }
}
