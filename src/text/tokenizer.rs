use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::text::config::{ConfigFingerprint, Skipgram, TextConfig};
use crate::text::normalizer::normalize_text_into;

/// Kind of a produced token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    /// single word
    Unigram,
    /// several contiguous words
    Ngram,
    /// character substring
    Qgram,
    /// words with gaps
    Skipgram,
    /// word pair within a window
    Collocation,
}

impl TokenKind {
    /// Prefix written in front of the token text when `mark_token_type` is on.
    /// Normalized text never contains tabs so marked tokens cannot collide
    /// with words.
    pub fn marker(&self) -> &'static str {
        match self {
            TokenKind::Unigram | TokenKind::Ngram => "",
            TokenKind::Qgram => "\tq",
            TokenKind::Skipgram => "\ts",
            TokenKind::Collocation => "\tc",
        }
    }
}

/// A single token, its text already carries the kind marker if enabled
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub kind: TokenKind,
}

impl Token {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// Token sequence of one document together with the fingerprint of the
/// configuration that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenizedDocument {
    pub fingerprint: ConfigFingerprint,
    pub tokens: Vec<Token>,
}

impl TokenizedDocument {
    /// Wrap tokens produced elsewhere (e.g. an external tokenizer) as unigrams
    pub fn from_strs<T: AsRef<str>>(fingerprint: ConfigFingerprint, tokens: &[T]) -> Self {
        Self {
            fingerprint,
            tokens: tokens
                .iter()
                .map(|t| Token { text: t.as_ref().to_string(), kind: TokenKind::Unigram })
                .collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.tokens.iter().map(Token::as_str)
    }
}

/// Tokenizer
/// normalizes and splits text following a [`TextConfig`].
///
/// It owns scratch buffers that are overwritten on every call, so a tokenizer
/// is used by one worker at a time; parallel code clones one per worker
/// (see [`Tokenizer::tokenize_corpus`]).
#[derive(Debug, Clone)]
pub struct Tokenizer {
    config: TextConfig,
    fingerprint: ConfigFingerprint,
    nlist: Vec<u8>,
    /// normalized text buffer
    text: String,
    /// byte ranges of the words inside `text`
    words: Vec<(usize, usize)>,
    /// char buffer for q-grams
    chars: Vec<char>,
}

impl Tokenizer {
    pub fn new(config: TextConfig) -> Self {
        let fingerprint = config.fingerprint();
        let nlist = config.effective_nlist();
        Self {
            config,
            fingerprint,
            nlist,
            text: String::new(),
            words: Vec::new(),
            chars: Vec::new(),
        }
    }

    #[inline]
    pub fn config(&self) -> &TextConfig {
        &self.config
    }

    #[inline]
    pub fn fingerprint(&self) -> ConfigFingerprint {
        self.fingerprint
    }

    /// Tokenize one text
    pub fn tokenize(&mut self, text: &str) -> TokenizedDocument {
        let mut tokens = Vec::new();
        self.tokenize_into(text, &mut tokens);
        TokenizedDocument {
            fingerprint: self.fingerprint,
            tokens,
        }
    }

    /// Tokenize several texts (a multi-field document) into one token list
    pub fn tokenize_many<T: AsRef<str>>(&mut self, texts: &[T]) -> TokenizedDocument {
        let mut tokens = Vec::new();
        for text in texts {
            self.tokenize_into(text.as_ref(), &mut tokens);
        }
        TokenizedDocument {
            fingerprint: self.fingerprint,
            tokens,
        }
    }

    /// Tokenize a corpus in parallel, one tokenizer clone per rayon worker.
    /// Output order follows input order.
    pub fn tokenize_corpus<T>(&self, corpus: &[T]) -> Vec<TokenizedDocument>
    where
        T: AsRef<str> + Sync,
    {
        corpus
            .par_iter()
            .map_init(|| self.clone(), |tok, text| tok.tokenize(text.as_ref()))
            .collect()
    }

    fn tokenize_into(&mut self, text: &str, tokens: &mut Vec<Token>) {
        normalize_text_into(&self.config, text, &mut self.text);
        self.split_words();

        for i in 0..self.nlist.len() {
            let n = self.nlist[i] as usize;
            self.nwords(n, tokens);
        }
        for i in 0..self.config.qlist.len() {
            let q = self.config.qlist[i] as usize;
            self.qgrams(q, tokens);
        }
        for i in 0..self.config.slist.len() {
            let s = self.config.slist[i];
            self.skipgrams(s, tokens);
        }
        if self.config.collocations > 0 {
            self.collocations(self.config.collocations as usize, tokens);
        }
    }

    fn split_words(&mut self) {
        self.words.clear();
        let mut start = None;
        for (i, c) in self.text.char_indices() {
            match (c == ' ', start) {
                (true, Some(s)) => {
                    self.words.push((s, i));
                    start = None;
                }
                (false, None) => start = Some(i),
                _ => {}
            }
        }
        if let Some(s) = start {
            self.words.push((s, self.text.len()));
        }
    }

    #[inline]
    fn word(&self, i: usize) -> &str {
        let (s, e) = self.words[i];
        &self.text[s..e]
    }

    fn push(&self, kind: TokenKind, body: String, tokens: &mut Vec<Token>) {
        let text = if self.config.mark_token_type && !kind.marker().is_empty() {
            let mut t = String::with_capacity(body.len() + 2);
            t.push_str(kind.marker());
            t.push_str(&body);
            t
        } else {
            body
        };
        tokens.push(Token { text, kind });
    }

    /// word n-grams, words joined by a blank
    fn nwords(&self, n: usize, tokens: &mut Vec<Token>) {
        if n == 0 || self.words.len() < n {
            return;
        }
        let kind = if n == 1 { TokenKind::Unigram } else { TokenKind::Ngram };
        for i in 0..=(self.words.len() - n) {
            let mut body = String::from(self.word(i));
            for j in 1..n {
                body.push(' ');
                body.push_str(self.word(i + j));
            }
            self.push(kind, body, tokens);
        }
    }

    /// character q-grams over the normalized text, boundary blanks included
    fn qgrams(&mut self, q: usize, tokens: &mut Vec<Token>) {
        self.chars.clear();
        self.chars.extend(self.text.chars());
        if q == 0 || self.words.is_empty() || self.chars.len() < q {
            return;
        }
        for i in 0..=(self.chars.len() - q) {
            let body: String = self.chars[i..i + q].iter().collect();
            self.push(TokenKind::Qgram, body, tokens);
        }
    }

    /// `qsize` words taken every `skip + 1` positions
    fn skipgrams(&self, s: Skipgram, tokens: &mut Vec<Token>) {
        let qsize = s.qsize as usize;
        let step = s.skip as usize + 1;
        if qsize == 0 {
            return;
        }
        let span = (qsize - 1) * step;
        if self.words.len() <= span {
            return;
        }
        for i in 0..(self.words.len() - span) {
            let mut body = String::from(self.word(i));
            for j in 1..qsize {
                body.push(' ');
                body.push_str(self.word(i + j * step));
            }
            self.push(TokenKind::Skipgram, body, tokens);
        }
    }

    /// pairs of words at distance 1..=window
    fn collocations(&self, window: usize, tokens: &mut Vec<Token>) {
        let n = self.words.len();
        for i in 0..n {
            for j in (i + 1)..n.min(i + window + 1) {
                let mut body = String::from(self.word(i));
                body.push(' ');
                body.push_str(self.word(j));
                self.push(TokenKind::Collocation, body, tokens);
            }
        }
    }
}
