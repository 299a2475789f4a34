pub mod bow;
pub mod vocabulary;
pub mod weighting;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::text::Tokenizer;
use crate::utils::math::vector::SparseVec;

use self::bow::Bow;
use self::vocabulary::Vocabulary;
use self::weighting::{DocShape, EntropyWeighting, GlobalWeight, GlobalWeighting, LocalWeight, LocalWeighting};

/// Options of [`VectorModel::vectorize_with`]
///
/// - `normalize`: L2-normalize the output
/// - `minweight`: weights below it are dropped (before normalizing)
/// - `mindocs`: overrides the model's `mindocs` when set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizeOptions {
    pub normalize: bool,
    pub minweight: f32,
    pub mindocs: Option<u64>,
}

impl Default for VectorizeOptions {
    fn default() -> Self {
        Self {
            normalize: true,
            minweight: 1e-6,
            mindocs: None,
        }
    }
}

/// Size of the model kept by [`VectorModel::prune_select_top`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selection {
    /// the `k` heaviest tokens
    Top(usize),
    /// a fraction of the vocabulary in `(0, 1]`, rounded to the nearest count
    Ratio(f32),
}

/// Vector Model
/// vocabulary と global weight の表、local weighting を組み合わせて
/// BOW を疎ベクトルに変換します
///
/// A fitted model is immutable; `prune` and `prune_select_top` return a new,
/// smaller model whose vocabulary ids are re-mapped densely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorModel {
    global: GlobalWeighting,
    local: LocalWeighting,
    voc: Vocabulary,
    /// global weight per token id
    weights: Vec<f32>,
    /// tokens seen in fewer documents are ignored
    mindocs: u64,
}

impl VectorModel {
    /// Fit a model from corpus statistics
    ///
    /// # Arguments
    /// * `global` - `Binary` or `Idf`; `Entropy` needs [`VectorModel::fit_labeled`]
    /// * `local` - local weighting applied per document
    /// * `voc` - vocabulary holding the corpus statistics
    pub fn fit(global: GlobalWeighting, local: LocalWeighting, voc: Vocabulary) -> Result<Self> {
        let weights = global.global_weights(&voc)?;
        log::debug!("vector model fitted: {:?}/{:?} over {} tokens", global, local, voc.len());
        Ok(Self {
            global,
            local,
            voc,
            weights,
            mindocs: 1,
        })
    }

    /// Fit an entropy weighted model from a labeled corpus
    ///
    /// # Arguments
    /// * `entropy` - entropy parameters
    /// * `local` - local weighting applied per document
    /// * `voc` - vocabulary the bags were counted with
    /// * `corpus` - one bag per document
    /// * `labels` - class of each document
    pub fn fit_labeled(
        entropy: EntropyWeighting,
        local: LocalWeighting,
        voc: Vocabulary,
        corpus: &[Bow],
        labels: &[u32],
    ) -> Result<Self> {
        let weights = entropy.weights(&voc, corpus, labels)?;
        log::debug!(
            "entropy model fitted over {} tokens, {} labeled documents",
            voc.len(),
            corpus.len()
        );
        Ok(Self {
            global: GlobalWeighting::Entropy(entropy),
            local,
            voc,
            weights,
            mindocs: 1,
        })
    }

    /// Set the minimum document frequency of the tokens used by `vectorize`
    pub fn with_mindocs(mut self, mindocs: u64) -> Self {
        self.mindocs = mindocs;
        self
    }

    #[inline]
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.voc
    }

    #[inline]
    pub fn global(&self) -> GlobalWeighting {
        self.global
    }

    #[inline]
    pub fn local(&self) -> LocalWeighting {
        self.local
    }

    #[inline]
    pub fn mindocs(&self) -> u64 {
        self.mindocs
    }

    /// Global weight table, indexed by token id
    #[inline]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Global weight of a token id, 0 for unknown ids
    #[inline]
    pub fn global_weight(&self, id: u32) -> f32 {
        self.weights.get(id as usize).copied().unwrap_or(0.0)
    }

    /// Number of tokens
    #[inline]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Vectorize a bag with the default options
    pub fn vectorize(&self, bow: &Bow) -> SparseVec {
        self.vectorize_with(bow, VectorizeOptions::default())
    }

    /// Vectorize a bag
    ///
    /// weight = global(id) * local(count) for every id known to the model
    /// whose document frequency reaches `mindocs`. Unknown ids are dropped
    /// silently.
    pub fn vectorize_with(&self, bow: &Bow, opts: VectorizeOptions) -> SparseVec {
        let mindocs = opts.mindocs.unwrap_or(self.mindocs);
        let doc = DocShape::of(bow);
        let mut vec = SparseVec::with_capacity(bow.len());
        for (id, count) in bow.iter() {
            let Some(&global) = self.weights.get(id as usize) else {
                continue;
            };
            if self.voc.ndocs(id) < mindocs {
                continue;
            }
            let w = global * self.local.local_weight(count, doc);
            if w >= opts.minweight {
                vec.insert(id, w);
            }
        }
        if opts.normalize {
            vec.normalize_mut();
        }
        vec
    }

    /// Tokenize and vectorize one text
    pub fn vectorize_text(&self, tokenizer: &mut Tokenizer, text: &str) -> Result<SparseVec> {
        self.check_tokenizer(tokenizer)?;
        let doc = tokenizer.tokenize(text);
        Ok(self.vectorize(&self.voc.bow(doc.iter())))
    }

    /// Tokenize and vectorize a corpus in parallel, one tokenizer clone per
    /// worker. Output order follows input order.
    pub fn vectorize_corpus<T>(&self, tokenizer: &Tokenizer, texts: &[T]) -> Result<Vec<SparseVec>>
    where
        T: AsRef<str> + Sync,
    {
        self.check_tokenizer(tokenizer)?;
        Ok(texts
            .par_iter()
            .map_init(
                || tokenizer.clone(),
                |tok, text| {
                    let doc = tok.tokenize(text.as_ref());
                    self.vectorize(&self.voc.bow(doc.iter()))
                },
            )
            .collect())
    }

    /// Tokens and weights of a vector, sorted by token id.
    /// Ids unknown to the model are skipped.
    pub fn decode(&self, vec: &SparseVec) -> Vec<(String, f32)> {
        vec.to_sorted()
            .into_iter()
            .filter_map(|(id, w)| self.voc.token_of(id).map(|t| (t.to_string(), w)))
            .collect()
    }

    /// New model without the tokens whose global weight is below `lowerweight`
    pub fn prune(&self, lowerweight: f32) -> VectorModel {
        let ids: Vec<u32> = self
            .weights
            .iter()
            .enumerate()
            .filter(|&(_, &w)| w >= lowerweight)
            .map(|(id, _)| id as u32)
            .collect();
        let pruned = self.restrict(&ids);
        log::debug!("pruned vector model: {} -> {} tokens", self.len(), pruned.len());
        pruned
    }

    /// New model with the heaviest tokens only, ties broken by ascending id.
    /// The kept tokens stay in their original relative order.
    pub fn prune_select_top(&self, selection: Selection) -> Result<VectorModel> {
        let n = self.len();
        let k = match selection {
            Selection::Top(k) => k.min(n),
            Selection::Ratio(r) => {
                if !(r > 0.0 && r <= 1.0) {
                    return Err(Error::invalid(format!("ratio must be in (0, 1], got {r}")));
                }
                ((r as f64 * n as f64).round() as usize).min(n)
            }
        };

        let mut order: Vec<u32> = (0..n as u32).collect();
        order.sort_by(|&a, &b| {
            self.weights[b as usize]
                .total_cmp(&self.weights[a as usize])
                .then(a.cmp(&b))
        });
        order.truncate(k);
        order.sort_unstable();

        let pruned = self.restrict(&order);
        log::debug!("selected top {} of {} tokens", pruned.len(), n);
        Ok(pruned)
    }

    /// Check the weight table against the vocabulary
    pub fn validate(&self) -> Result<()> {
        if self.weights.len() != self.voc.len() {
            return Err(Error::corrupt(format!(
                "{} global weights for {} vocabulary tokens",
                self.weights.len(),
                self.voc.len()
            )));
        }
        if let Some(id) = self.weights.iter().position(|w| !w.is_finite()) {
            return Err(Error::corrupt(format!("non finite global weight for token {id}")));
        }
        Ok(())
    }

    /// Reassemble a persisted model
    pub(crate) fn from_parts(
        global: GlobalWeighting,
        local: LocalWeighting,
        voc: Vocabulary,
        weights: Vec<f32>,
        mindocs: u64,
    ) -> Result<Self> {
        let model = Self {
            global,
            local,
            voc,
            weights,
            mindocs,
        };
        model.validate()?;
        Ok(model)
    }

    /// sorted, unique `ids` only
    fn restrict(&self, ids: &[u32]) -> VectorModel {
        VectorModel {
            global: self.global,
            local: self.local,
            voc: self.voc.retain_ids(ids),
            weights: ids.iter().map(|&id| self.weights[id as usize]).collect(),
            mindocs: self.mindocs,
        }
    }

    fn check_tokenizer(&self, tokenizer: &Tokenizer) -> Result<()> {
        if tokenizer.fingerprint() != self.voc.fingerprint() {
            return Err(Error::IncompatibleConfig {
                expected: self.voc.fingerprint(),
                found: tokenizer.fingerprint(),
            });
        }
        Ok(())
    }
}
