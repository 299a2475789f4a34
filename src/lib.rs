//! This crate turns text into sparse weighted vectors and searches them with a
//! BM25 inverted file.

pub mod error;
pub mod index;
pub mod text;
pub mod utils;
pub mod vectorizer;

/// Error and Result
/// Every fallible operation returns [`Result`].
/// - `IncompatibleConfig`: artifacts produced by different text pipelines were mixed
/// - `InvalidParameter`: a weighting, pruning or scoring parameter is out of range
/// - `CorruptPersistedState`: a saved index is malformed or of an unknown version
/// - `IoFailure`: reading or writing a saved index failed
///
/// Out-of-vocabulary tokens are not errors; they are dropped.
pub use error::{Error, Result};

/// Text pipeline
/// `TextConfig` describes normalization (lowercase, diacritics, grouping of
/// numbers / urls / users / emojis, punctuation) and which tokens are
/// produced (word n-grams, character q-grams, skip-grams, collocations).
///
/// `Tokenizer` owns scratch buffers and is used by one thread at a time;
/// parallel helpers clone one per worker.
/// Every `TokenizedDocument` carries the `ConfigFingerprint` of its config.
pub use text::{normalize_text, ConfigFingerprint, Skipgram, TextConfig, Token, TokenKind, TokenizedDocument, Tokenizer};

/// Vocabulary
/// Maps tokens to dense `u32` ids (first-seen order) and keeps document and
/// collection frequencies.
/// Supports filter / merge / update and approximate lookup of unknown tokens
/// through a q-gram index.
pub use vectorizer::vocabulary::{approx::StringDistance, TokenStats, Vocabulary};

/// Bag of words
/// token id -> count for one document
pub use vectorizer::bow::Bow;

/// Vector Model
/// Global weighting (Binary, Idf, Entropy) times local weighting
/// (Binary, Tf, Tp, Freq), turning bags of words into sparse vectors.
pub use vectorizer::weighting::{ClassWeights, EntropyWeighting, GlobalWeight, GlobalWeighting, LocalWeight, LocalWeighting};
pub use vectorizer::{Selection, VectorModel, VectorizeOptions};

/// Sparse vector
/// token id -> weight, with dot / norm / normalize, elementwise algebra and
/// cosine / angle distances.
pub use utils::math::vector::{distance::Distance, math::centroid, SparseVec};

/// Sparse matrices
/// sprs CSC export of a vector corpus (one column per vector) and of an
/// `InvertedFile` (one column per token); dense and `CsVec` conversions
/// live on `SparseVec`.
pub use utils::math::matrix::{matrix_columns, sparse_matrix};

/// Inverted File
/// Postings per token id, BM25 top-k search, freeze, save / load.
/// `SharedIndex` wraps it for concurrent readers and writers.
pub use index::{search::HitEntry, search::Hits, shared::SharedIndex, Bm25Params, InvertedFile};
