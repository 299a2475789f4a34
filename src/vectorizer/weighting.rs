use ahash::RandomState;
use dashmap::DashMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::vectorizer::bow::Bow;
use crate::vectorizer::vocabulary::Vocabulary;

/// Global weighting
/// corpus 全体の統計から token ごとに一度だけ計算される重み
pub trait GlobalWeight {
    /// Check the parameters
    fn validate(&self) -> Result<()>;

    /// Weight table indexed by token id
    ///
    /// # Arguments
    /// * `voc` - fitted vocabulary
    /// # Returns
    /// * `Vec<f32>` - one weight per token id, `voc.len()` entries
    fn global_weights(&self, voc: &Vocabulary) -> Result<Vec<f32>>;
}

/// Local weighting
/// 文書ごとに token の出現回数から計算される重み
pub trait LocalWeight {
    fn local_weight(&self, count: u32, doc: DocShape) -> f32;
}

/// Document level quantities needed by local weightings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DocShape {
    /// number of tokens, out of vocabulary ones included
    pub total: u64,
    /// largest count of a single token
    pub max_count: u32,
}

impl DocShape {
    pub fn of(bow: &Bow) -> Self {
        Self {
            total: bow.total(),
            max_count: bow.max_count(),
        }
    }
}

/// Global weighting schemes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GlobalWeighting {
    /// 1 for every known token
    Binary,
    /// `ln(1 + N / (ndocs + smooth))`
    Idf { smooth: f32 },
    /// normalized class entropy, needs labels (see [`EntropyWeighting`])
    Entropy(EntropyWeighting),
}

impl GlobalWeighting {
    /// Idf with the default smoothing of 1
    pub fn idf() -> Self {
        GlobalWeighting::Idf { smooth: 1.0 }
    }
}

impl Default for GlobalWeighting {
    fn default() -> Self {
        Self::idf()
    }
}

impl GlobalWeight for GlobalWeighting {
    fn validate(&self) -> Result<()> {
        match self {
            GlobalWeighting::Binary => Ok(()),
            GlobalWeighting::Idf { smooth } => {
                if !smooth.is_finite() || *smooth < 0.0 {
                    return Err(Error::invalid(format!("idf smooth must be finite and >= 0, got {smooth}")));
                }
                Ok(())
            }
            GlobalWeighting::Entropy(e) => e.validate(),
        }
    }

    fn global_weights(&self, voc: &Vocabulary) -> Result<Vec<f32>> {
        self.validate()?;
        match self {
            GlobalWeighting::Binary => Ok(vec![1.0; voc.len()]),
            GlobalWeighting::Idf { smooth } => {
                let n = voc.corpus_size() as f64;
                let smooth = *smooth as f64;
                let mut unseen = 0usize;
                let weights = voc
                    .iter()
                    .map(|(_, _, s)| {
                        let denom = s.ndocs as f64 + smooth;
                        // never seen and no smoothing: no evidence at all
                        if denom <= 0.0 {
                            unseen += 1;
                            0.0
                        } else {
                            (n / denom).ln_1p() as f32
                        }
                    })
                    .collect();
                if unseen > 0 {
                    log::warn!("{unseen} tokens never seen in a document got idf 0");
                }
                Ok(weights)
            }
            GlobalWeighting::Entropy(_) => Err(Error::invalid(
                "entropy weighting needs a labeled corpus, use VectorModel::fit_labeled",
            )),
        }
    }
}

/// How class counts are scaled before computing the entropy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClassWeights {
    /// inverse class frequency, normalized to sum 1
    #[default]
    Balance,
    /// every class counts the same
    Uniform,
}

/// Entropy based global weighting
///
/// For a token `t` and class `c`, `m_c = smooth + w_c * count_c(t)` where
/// `count_c(t)` is the number of documents of class `c` containing `t`.
/// The weight is `1 - H(p) / ln(C)` with `p_c = m_c / Σ m`; a token spread
/// evenly over the classes gets 0, a token seen in a single class gets 1.
/// Weights below `lowerweight` become 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntropyWeighting {
    pub smooth: f32,
    pub lowerweight: f32,
    pub class_weights: ClassWeights,
}

impl Default for EntropyWeighting {
    fn default() -> Self {
        Self {
            smooth: 0.0,
            lowerweight: 0.0,
            class_weights: ClassWeights::Balance,
        }
    }
}

impl EntropyWeighting {
    pub fn validate(&self) -> Result<()> {
        if !self.smooth.is_finite() || self.smooth < 0.0 {
            return Err(Error::invalid(format!("entropy smooth must be finite and >= 0, got {}", self.smooth)));
        }
        if !self.lowerweight.is_finite() {
            return Err(Error::invalid("entropy lowerweight must be finite"));
        }
        Ok(())
    }

    /// Weight table from a labeled corpus
    ///
    /// # Arguments
    /// * `voc` - vocabulary the bags were counted with
    /// * `corpus` - one bag per document
    /// * `labels` - class of each document, any u32 values
    pub fn weights(&self, voc: &Vocabulary, corpus: &[Bow], labels: &[u32]) -> Result<Vec<f32>> {
        self.validate()?;
        if corpus.len() != labels.len() {
            return Err(Error::invalid(format!(
                "{} labels for {} documents",
                labels.len(),
                corpus.len()
            )));
        }

        let mut classes: Vec<u32> = labels.to_vec();
        classes.sort_unstable();
        classes.dedup();
        let nclasses = classes.len();
        if nclasses <= 1 {
            return Ok(vec![1.0; voc.len()]);
        }

        let mut class_sizes = vec![0u64; nclasses];
        let class_of: Vec<usize> = labels
            .iter()
            .map(|l| classes.binary_search(l).unwrap_or(0))
            .collect();
        for &c in &class_of {
            class_sizes[c] += 1;
        }
        let class_weight: Vec<f64> = match self.class_weights {
            ClassWeights::Uniform => vec![1.0; nclasses],
            ClassWeights::Balance => {
                let inv: Vec<f64> = class_sizes.iter().map(|&n| 1.0 / n as f64).collect();
                let total: f64 = inv.iter().sum();
                inv.iter().map(|w| w / total).collect()
            }
        };

        // token id -> number of documents per class
        let counts: DashMap<u32, Vec<u64>, RandomState> = DashMap::with_hasher(RandomState::new());
        corpus
            .par_iter()
            .zip(class_of.par_iter())
            .for_each(|(bow, &c)| {
                for (id, _) in bow.iter() {
                    counts.entry(id).or_insert_with(|| vec![0; nclasses])[c] += 1;
                }
            });

        let smooth = self.smooth as f64;
        let maxent = (nclasses as f64).ln();
        let weights = (0..voc.len() as u32)
            .into_par_iter()
            .map(|id| {
                let mut mass = vec![smooth; nclasses];
                if let Some(row) = counts.get(&id) {
                    for (c, &n) in row.iter().enumerate() {
                        mass[c] += class_weight[c] * n as f64;
                    }
                }
                let total: f64 = mass.iter().sum();
                if total <= 0.0 {
                    return 0.0;
                }
                let entropy: f64 = mass
                    .iter()
                    .filter(|&&m| m > 0.0)
                    .map(|&m| {
                        let p = m / total;
                        -p * p.ln()
                    })
                    .sum();
                let w = (1.0 - entropy / maxent).clamp(0.0, 1.0) as f32;
                if w < self.lowerweight {
                    0.0
                } else {
                    w
                }
            })
            .collect();
        Ok(weights)
    }
}

/// Local weighting schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LocalWeighting {
    /// 1 for every present token
    Binary,
    /// raw count
    #[default]
    Tf,
    /// count / number of tokens of the document
    Tp,
    /// count / largest count in the document
    Freq,
}

impl LocalWeight for LocalWeighting {
    #[inline]
    fn local_weight(&self, count: u32, doc: DocShape) -> f32 {
        if count == 0 {
            return 0.0;
        }
        match self {
            LocalWeighting::Binary => 1.0,
            LocalWeighting::Tf => count as f32,
            LocalWeighting::Tp => count as f32 / doc.total.max(1) as f32,
            LocalWeighting::Freq => count as f32 / doc.max_count.max(1) as f32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::{TextConfig, Tokenizer};

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    fn sample() -> (Vocabulary, Vec<Bow>) {
        let tok = Tokenizer::new(TextConfig::unigrams());
        let texts = ["cat dog", "dog bird", "cat cat bird"];
        let voc = Vocabulary::from_texts(&tok, &texts).unwrap();
        let bows = voc.bows_from_texts(&tok, &texts).unwrap();
        (voc, bows)
    }

    #[test]
    fn idf_values() {
        let (voc, _) = sample();
        let w = GlobalWeighting::idf().global_weights(&voc).unwrap();
        // every token appears in 2 of 3 documents
        let expected = (1.0f64 + 3.0 / 3.0).ln() as f32;
        assert_eq!(w.len(), 3);
        assert!(w.iter().all(|&x| approx_eq(x, expected)));
    }

    #[test]
    fn idf_rejects_negative_smoothing() {
        let (voc, _) = sample();
        let r = GlobalWeighting::Idf { smooth: -1.0 }.global_weights(&voc);
        assert!(matches!(r, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn entropy_requires_labels_without_fit_labeled() {
        let (voc, _) = sample();
        let r = GlobalWeighting::Entropy(EntropyWeighting::default()).global_weights(&voc);
        assert!(matches!(r, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn entropy_rewards_class_specific_tokens() {
        let (voc, bows) = sample();
        // docs 0 and 2 are class 7, doc 1 is class 9
        let w = EntropyWeighting::default().weights(&voc, &bows, &[7, 9, 7]).unwrap();
        let cat = voc.id_of("cat").unwrap() as usize;
        let dog = voc.id_of("dog").unwrap() as usize;
        // cat only in class 7
        assert!(approx_eq(w[cat], 1.0));
        // dog in one document of each class; balance weights 1/3 and 2/3
        // give p = (1/3, 2/3)
        assert!((w[dog] - 0.081704).abs() < 1e-4);
    }

    #[test]
    fn entropy_uniform_class_weights_and_lowerweight() {
        let (voc, bows) = sample();
        let ew = EntropyWeighting {
            class_weights: ClassWeights::Uniform,
            lowerweight: 0.5,
            ..EntropyWeighting::default()
        };
        let w = ew.weights(&voc, &bows, &[1, 2, 2]).unwrap();
        let bird = voc.id_of("bird").unwrap() as usize;
        // bird only in class 2
        assert!(approx_eq(w[bird], 1.0));
        // cat: one doc per class, uniform weights make it even
        let cat = voc.id_of("cat").unwrap() as usize;
        assert_eq!(w[cat], 0.0);
    }

    #[test]
    fn entropy_label_count_mismatch() {
        let (voc, bows) = sample();
        let r = EntropyWeighting::default().weights(&voc, &bows, &[1, 2]);
        assert!(matches!(r, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn single_class_gives_unit_weights() {
        let (voc, bows) = sample();
        let w = EntropyWeighting::default().weights(&voc, &bows, &[3, 3, 3]).unwrap();
        assert_eq!(w, vec![1.0; 3]);
    }

    #[test]
    fn local_weights() {
        let doc = DocShape { total: 4, max_count: 2 };
        assert_eq!(LocalWeighting::Binary.local_weight(3, doc), 1.0);
        assert_eq!(LocalWeighting::Tf.local_weight(2, doc), 2.0);
        assert_eq!(LocalWeighting::Tp.local_weight(2, doc), 0.5);
        assert_eq!(LocalWeighting::Freq.local_weight(1, doc), 0.5);
        assert_eq!(LocalWeighting::Tf.local_weight(0, doc), 0.0);
    }
}
