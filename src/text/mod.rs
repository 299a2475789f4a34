//! Text preprocessing: normalization rules and tokenizers.
pub mod config;
pub mod normalizer;
pub mod tokenizer;

pub use config::{ConfigFingerprint, Skipgram, TextConfig};
pub use normalizer::normalize_text;
pub use tokenizer::{Token, TokenKind, TokenizedDocument, Tokenizer};
