pub mod approx;

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use ahash::RandomState;
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::text::{ConfigFingerprint, TokenizedDocument, Tokenizer};
use crate::vectorizer::bow::Bow;

use self::approx::{QgramIndex, StringDistance};

/// Per token corpus statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenStats {
    /// number of documents containing the token
    pub ndocs: u64,
    /// number of occurrences in the whole corpus
    pub collection_freq: u64,
}

/// Vocabulary
/// token 文字列と dense な u32 id の対応表、および文書頻度を管理します
///
/// Ids are assigned in first-seen order and never reused, so building the
/// same corpus in the same order always yields the same ids. `filter`,
/// `merge` and `retain_ids` produce a new vocabulary with dense, re-mapped
/// ids.
///
/// Every vocabulary carries the [`ConfigFingerprint`] of the text pipeline
/// that produced its tokens. Appending documents or merging vocabularies with
/// a different fingerprint fails with [`Error::IncompatibleConfig`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Vocabulary {
    tokens: IndexMap<Box<str>, TokenStats, RandomState>,
    corpus_size: u64,
    fingerprint: ConfigFingerprint,
    /// q-gram index for approximate lookups, built on first use
    #[serde(skip)]
    approx: OnceLock<Arc<QgramIndex>>,
}

impl PartialEq for Vocabulary {
    fn eq(&self, other: &Self) -> bool {
        self.corpus_size == other.corpus_size
            && self.fingerprint == other.fingerprint
            && self.tokens.len() == other.tokens.len()
            && self.tokens.iter().zip(other.tokens.iter()).all(|(a, b)| a == b)
    }
}

impl Vocabulary {
    /// Create an empty vocabulary for documents produced under `fingerprint`
    pub fn new(fingerprint: ConfigFingerprint) -> Self {
        Self {
            tokens: IndexMap::with_hasher(RandomState::new()),
            corpus_size: 0,
            fingerprint,
            approx: OnceLock::new(),
        }
    }

    /// Build a vocabulary from a tokenized corpus
    ///
    /// # Arguments
    /// * `fingerprint` - fingerprint every document must carry
    /// * `corpus` - tokenized documents, ids follow their first appearance
    pub fn build(fingerprint: ConfigFingerprint, corpus: &[TokenizedDocument]) -> Result<Self> {
        let mut voc = Self::new(fingerprint);
        for doc in corpus {
            voc.append(doc)?;
        }
        log::debug!(
            "vocabulary built: {} tokens from {} documents",
            voc.len(),
            voc.corpus_size
        );
        Ok(voc)
    }

    /// Tokenize `texts` in parallel and build the vocabulary sequentially,
    /// so ids are deterministic for a given input order.
    pub fn from_texts<T>(tokenizer: &Tokenizer, texts: &[T]) -> Result<Self>
    where
        T: AsRef<str> + Sync,
    {
        let docs = tokenizer.tokenize_corpus(texts);
        Self::build(tokenizer.fingerprint(), &docs)
    }

    /// Add one document to the vocabulary
    pub fn append(&mut self, doc: &TokenizedDocument) -> Result<()> {
        self.check_fingerprint(doc.fingerprint)?;
        self.approx.take();
        self.corpus_size += 1;

        let mut seen: HashSet<usize, RandomState> = HashSet::with_hasher(RandomState::new());
        for token in doc.iter() {
            let idx = match self.tokens.get_index_of(token) {
                Some(idx) => idx,
                None => self.tokens.insert_full(Box::from(token), TokenStats::default()).0,
            };
            if let Some((_, stats)) = self.tokens.get_index_mut(idx) {
                stats.collection_freq += 1;
                if seen.insert(idx) {
                    stats.ndocs += 1;
                }
            }
        }
        Ok(())
    }

    /// Register a token without counting any occurrence, returns its id
    pub fn push_token(&mut self, token: &str) -> u32 {
        if let Some(idx) = self.tokens.get_index_of(token) {
            return idx as u32;
        }
        self.approx.take();
        let (idx, _) = self.tokens.insert_full(Box::from(token), TokenStats::default());
        idx as u32
    }

    #[inline]
    pub fn fingerprint(&self) -> ConfigFingerprint {
        self.fingerprint
    }

    /// number of distinct tokens
    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// number of documents seen
    #[inline]
    pub fn corpus_size(&self) -> u64 {
        self.corpus_size
    }

    #[inline]
    pub fn id_of(&self, token: &str) -> Option<u32> {
        self.tokens.get_index_of(token).map(|i| i as u32)
    }

    #[inline]
    pub fn token_of(&self, id: u32) -> Option<&str> {
        self.tokens.get_index(id as usize).map(|(t, _)| t.as_ref())
    }

    #[inline]
    pub fn stats(&self, id: u32) -> Option<TokenStats> {
        self.tokens.get_index(id as usize).map(|(_, s)| *s)
    }

    /// document frequency, 0 for unknown ids
    #[inline]
    pub fn ndocs(&self, id: u32) -> u64 {
        self.stats(id).map_or(0, |s| s.ndocs)
    }

    /// collection frequency, 0 for unknown ids
    #[inline]
    pub fn collection_freq(&self, id: u32) -> u64 {
        self.stats(id).map_or(0, |s| s.collection_freq)
    }

    /// `(id, token, stats)` in id order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str, TokenStats)> + '_ {
        self.tokens
            .iter()
            .enumerate()
            .map(|(i, (t, s))| (i as u32, t.as_ref(), *s))
    }

    /// Bag of words of a token sequence, unknown tokens only count towards
    /// the document length
    pub fn bow<'a, I>(&self, tokens: I) -> Bow
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut bow = Bow::new();
        for token in tokens {
            match self.id_of(token) {
                Some(id) => bow.add(id),
                None => bow.add_unknown(),
            };
        }
        bow
    }

    /// New vocabulary keeping the tokens accepted by `pred`, ids re-mapped
    /// densely in their current order
    pub fn filter<F>(&self, pred: F) -> Vocabulary
    where
        F: Fn(&str, &TokenStats) -> bool,
    {
        let ids: Vec<u32> = self
            .iter()
            .filter(|(_, t, s)| pred(t, s))
            .map(|(id, _, _)| id)
            .collect();
        self.retain_ids(&ids)
    }

    /// New vocabulary with exactly `ids`, new id `i` is `ids[i]`.
    /// Unknown or repeated ids are skipped.
    pub fn retain_ids(&self, ids: &[u32]) -> Vocabulary {
        let mut voc = Vocabulary::new(self.fingerprint);
        voc.corpus_size = self.corpus_size;
        voc.tokens.reserve(ids.len());
        for &id in ids {
            if let Some((t, s)) = self.tokens.get_index(id as usize) {
                voc.tokens.entry(t.clone()).or_insert(*s);
            }
        }
        voc
    }

    /// Merge several vocabularies into a new one
    ///
    /// Statistics and corpus sizes are summed, ids follow the first
    /// appearance across `vocs` in order.
    pub fn merge(vocs: &[Vocabulary]) -> Result<Vocabulary> {
        Self::merge_with(vocs, |_, _| true)
    }

    /// Like [`Vocabulary::merge`] keeping only tokens accepted by `pred`
    /// (evaluated on the merged statistics)
    pub fn merge_with<F>(vocs: &[Vocabulary], pred: F) -> Result<Vocabulary>
    where
        F: Fn(&str, &TokenStats) -> bool,
    {
        let Some(first) = vocs.first() else {
            return Ok(Vocabulary::default());
        };
        let mut merged = Vocabulary::new(first.fingerprint);
        for voc in vocs {
            merged.update(voc)?;
        }
        Ok(merged.filter(pred))
    }

    /// Add the tokens and statistics of `other` into `self`.
    /// Existing ids are kept, new tokens are appended.
    pub fn update(&mut self, other: &Vocabulary) -> Result<()> {
        self.update_with(other, |_, _| true)
    }

    /// Like [`Vocabulary::update`], tokens of `other` rejected by `pred`
    /// are not added (their statistics are ignored)
    pub fn update_with<F>(&mut self, other: &Vocabulary, pred: F) -> Result<()>
    where
        F: Fn(&str, &TokenStats) -> bool,
    {
        self.check_fingerprint(other.fingerprint)?;
        self.approx.take();
        self.corpus_size += other.corpus_size;
        for (t, s) in other.tokens.iter() {
            if !pred(t, s) {
                continue;
            }
            let stats = self.tokens.entry(t.clone()).or_default();
            stats.ndocs += s.ndocs;
            stats.collection_freq += s.collection_freq;
        }
        Ok(())
    }

    /// Nearest vocabulary token to `token` within `max_distance`
    ///
    /// An exact match is returned with distance 0. Otherwise candidates are
    /// taken from a q-gram inverted file over the vocabulary (built once, on
    /// first call) and verified with `distance`.
    ///
    /// # Returns
    /// * `Option<(u32, f32)>` - id of the nearest token and its distance
    pub fn approx_lookup(&self, token: &str, max_distance: f32, distance: StringDistance) -> Option<(u32, f32)> {
        if let Some(id) = self.id_of(token) {
            return Some((id, 0.0));
        }
        if self.is_empty() {
            return None;
        }
        let index = self.approx.get_or_init(|| Arc::new(QgramIndex::build(self)));
        let mut best: Option<(u32, f32)> = None;
        for id in index.candidates(token) {
            let Some(candidate) = self.token_of(id) else {
                continue;
            };
            let d = distance.evaluate(token, candidate);
            if d > max_distance {
                continue;
            }
            best = match best {
                Some((bid, bd)) if bd < d || (bd == d && bid < id) => Some((bid, bd)),
                _ => Some((id, d)),
            };
        }
        best
    }

    /// Fingerprint, corpus size and tokens in id order
    pub(crate) fn into_parts(self) -> (ConfigFingerprint, u64, Vec<(Box<str>, TokenStats)>) {
        (self.fingerprint, self.corpus_size, self.tokens.into_iter().collect())
    }

    /// Rebuild from persisted parts, tokens must be unique
    pub(crate) fn from_parts(
        fingerprint: ConfigFingerprint,
        corpus_size: u64,
        tokens: Vec<(Box<str>, TokenStats)>,
    ) -> Result<Self> {
        let mut voc = Vocabulary::new(fingerprint);
        voc.corpus_size = corpus_size;
        voc.tokens.reserve(tokens.len());
        for (t, s) in tokens {
            if s.ndocs > corpus_size {
                return Err(Error::corrupt(format!("token {t:?} has ndocs {} > corpus size {corpus_size}", s.ndocs)));
            }
            if voc.tokens.insert(t, s).is_some() {
                return Err(Error::corrupt("duplicated vocabulary token"));
            }
        }
        Ok(voc)
    }

    /// Tokenize and count a corpus in parallel, one bag per text
    pub fn bows_from_texts<T>(&self, tokenizer: &Tokenizer, texts: &[T]) -> Result<Vec<Bow>>
    where
        T: AsRef<str> + Sync,
    {
        self.check_fingerprint(tokenizer.fingerprint())?;
        Ok(texts
            .par_iter()
            .map_init(|| tokenizer.clone(), |tok, text| self.bow(tok.tokenize(text.as_ref()).iter()))
            .collect())
    }

    fn check_fingerprint(&self, found: ConfigFingerprint) -> Result<()> {
        if self.fingerprint != found {
            return Err(Error::IncompatibleConfig {
                expected: self.fingerprint,
                found,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::TextConfig;

    fn tokenizer() -> Tokenizer {
        Tokenizer::new(TextConfig::unigrams())
    }

    fn sample() -> Vocabulary {
        Vocabulary::from_texts(&tokenizer(), &["cat dog", "dog bird", "cat cat bird"]).unwrap()
    }

    #[test]
    fn ids_in_first_seen_order() {
        let voc = sample();
        assert_eq!(voc.id_of("cat"), Some(0));
        assert_eq!(voc.id_of("dog"), Some(1));
        assert_eq!(voc.id_of("bird"), Some(2));
        assert_eq!(voc.corpus_size(), 3);
        assert_eq!(voc.ndocs(0), 2);
        assert_eq!(voc.collection_freq(0), 3);
        assert_eq!(voc.ndocs(2), 2);
    }

    #[test]
    fn id_token_round_trip() {
        let voc = sample();
        for (id, token, _) in voc.iter() {
            assert_eq!(voc.id_of(voc.token_of(id).unwrap()), Some(id));
            assert_eq!(voc.token_of(voc.id_of(token).unwrap()), Some(token));
        }
        assert_eq!(voc.token_of(99), None);
    }

    #[test]
    fn append_rejects_other_pipelines() {
        let mut voc = sample();
        let other = Tokenizer::new(TextConfig::qgrams(&[3])).tokenize("cat");
        match voc.append(&other) {
            Err(Error::IncompatibleConfig { expected, found }) => {
                assert_eq!(expected, voc.fingerprint());
                assert_eq!(found, other.fingerprint);
            }
            r => panic!("unexpected {r:?}"),
        }
        assert_eq!(voc.corpus_size(), 3);
    }

    #[test]
    fn bow_counts_unknown_tokens_in_total() {
        let voc = sample();
        let bow = voc.bow(["cat", "cat", "zebra"]);
        assert_eq!(bow.count(0), 2);
        assert_eq!(bow.len(), 1);
        assert_eq!(bow.total(), 3);
    }

    #[test]
    fn filter_remaps_ids() {
        let voc = sample();
        let kept = voc.filter(|t, _| t != "cat");
        assert_eq!(kept.len(), 2);
        assert_eq!(kept.id_of("dog"), Some(0));
        assert_eq!(kept.id_of("bird"), Some(1));
        assert_eq!(kept.id_of("cat"), None);
        assert_eq!(kept.corpus_size(), 3);
    }

    #[test]
    fn merge_sums_statistics() {
        let tok = tokenizer();
        let a = Vocabulary::from_texts(&tok, &["cat dog"]).unwrap();
        let b = Vocabulary::from_texts(&tok, &["dog fish", "fish"]).unwrap();
        let merged = Vocabulary::merge(&[a.clone(), b.clone()]).unwrap();
        assert_eq!(merged.corpus_size(), 3);
        assert_eq!(merged.id_of("fish"), Some(2));
        assert_eq!(merged.ndocs(merged.id_of("dog").unwrap()), 2);

        let rare = Vocabulary::merge_with(&[a, b], |_, s| s.ndocs >= 2).unwrap();
        assert_eq!(rare.len(), 2);
        assert!(rare.id_of("cat").is_none());
    }

    #[test]
    fn merge_rejects_mixed_fingerprints() {
        let a = sample();
        let b = Vocabulary::new(TextConfig::qgrams(&[3]).fingerprint());
        assert!(matches!(
            Vocabulary::merge(&[a, b]),
            Err(Error::IncompatibleConfig { .. })
        ));
    }

    #[test]
    fn update_keeps_existing_ids() {
        let tok = tokenizer();
        let mut voc = sample();
        let other = Vocabulary::from_texts(&tok, &["bird fish"]).unwrap();
        voc.update(&other).unwrap();
        assert_eq!(voc.id_of("bird"), Some(2));
        assert_eq!(voc.id_of("fish"), Some(3));
        assert_eq!(voc.ndocs(2), 3);
        assert_eq!(voc.corpus_size(), 4);
    }

    #[test]
    fn push_token_is_idempotent() {
        let mut voc = Vocabulary::new(ConfigFingerprint::default());
        assert_eq!(voc.push_token("a"), 0);
        assert_eq!(voc.push_token("b"), 1);
        assert_eq!(voc.push_token("a"), 0);
        assert_eq!(voc.ndocs(0), 0);
    }

    #[test]
    fn approximate_lookup_finds_close_tokens() {
        let tok = tokenizer();
        let voc = Vocabulary::from_texts(&tok, &["house mouse horse", "garden"]).unwrap();
        assert_eq!(voc.approx_lookup("house", 1.0, StringDistance::Levenshtein), Some((0, 0.0)));
        let (id, d) = voc.approx_lookup("gardem", 1.0, StringDistance::Levenshtein).unwrap();
        assert_eq!(voc.token_of(id), Some("garden"));
        assert_eq!(d, 1.0);
        assert_eq!(voc.approx_lookup("zzzzzz", 1.0, StringDistance::Levenshtein), None);
    }

    #[test]
    fn approximate_index_is_rebuilt_after_mutation() {
        let mut voc = sample();
        assert!(voc.approx_lookup("fishes", 1.0, StringDistance::Levenshtein).is_none());
        voc.push_token("fish");
        let (id, _) = voc.approx_lookup("fishe", 1.0, StringDistance::Levenshtein).unwrap();
        assert_eq!(voc.token_of(id), Some("fish"));
    }
}
