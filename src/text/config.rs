use std::fmt;

use serde::{Deserialize, Serialize};

/// A skip-gram joins `qsize` words separated by `skip` words into one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Skipgram {
    pub qsize: u8,
    pub skip: u8,
}

impl Skipgram {
    pub fn new(qsize: u8, skip: u8) -> Self {
        Self { qsize, skip }
    }
}

/// Preprocessing and tokenization pipeline definition
///
/// - `del_diac`: remove diacritic marks
/// - `del_dup`: collapse duplicated contiguous characters into one
/// - `del_punc`: remove punctuation
/// - `group_num`: replace numbers with `_num`
/// - `group_url`: replace urls with `_url`
/// - `group_usr`: replace `@user` mentions with `_usr`
/// - `group_emo`: replace emojis with `_emo`
/// - `lc`: lowercase
/// - `nlist`: word n-gram sizes
/// - `qlist`: character q-gram sizes
/// - `slist`: skip-gram definitions
/// - `collocations`: window for word collocations, 0 disables them
/// - `mark_token_type`: tag q-grams, skip-grams and collocations so they never
///   collide with equally spelled words
///
/// When `nlist`, `qlist`, `slist` are empty and `collocations` is 0 the
/// tokenizer falls back to unigrams (`nlist = [1]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    pub del_diac: bool,
    pub del_dup: bool,
    pub del_punc: bool,
    pub group_num: bool,
    pub group_url: bool,
    pub group_usr: bool,
    pub group_emo: bool,
    pub lc: bool,
    pub nlist: Vec<u8>,
    pub qlist: Vec<u8>,
    pub slist: Vec<Skipgram>,
    pub collocations: u8,
    pub mark_token_type: bool,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            del_diac: true,
            del_dup: false,
            del_punc: false,
            group_num: true,
            group_url: true,
            group_usr: false,
            group_emo: false,
            lc: true,
            nlist: Vec::new(),
            qlist: Vec::new(),
            slist: Vec::new(),
            collocations: 0,
            mark_token_type: true,
        }
    }
}

impl TextConfig {
    /// Word unigrams only, no grouping rules beyond the defaults
    pub fn unigrams() -> Self {
        Self {
            nlist: vec![1],
            ..Self::default()
        }
    }

    /// Character q-grams of the given sizes only
    pub fn qgrams(qlist: &[u8]) -> Self {
        Self {
            qlist: qlist.to_vec(),
            ..Self::default()
        }
    }

    /// Word n-gram sizes actually used by the tokenizer
    pub fn effective_nlist(&self) -> Vec<u8> {
        if self.nlist.is_empty() && self.qlist.is_empty() && self.slist.is_empty() && self.collocations == 0 {
            vec![1]
        } else {
            self.nlist.clone()
        }
    }

    /// Stable digest of every field that changes the produced token stream.
    /// Vocabularies and tokenized documents carry it so that mixing artifacts
    /// from different pipelines is detected.
    pub fn fingerprint(&self) -> ConfigFingerprint {
        let mut h = crc32fast::Hasher::new();
        let flags = [
            self.del_diac,
            self.del_dup,
            self.del_punc,
            self.group_num,
            self.group_url,
            self.group_usr,
            self.group_emo,
            self.lc,
            self.mark_token_type,
        ];
        h.update(&flags.map(u8::from));
        // section tags keep [1],[] apart from [],[1]
        h.update(b"n");
        h.update(&self.effective_nlist());
        h.update(b"q");
        h.update(&self.qlist);
        h.update(b"s");
        for s in &self.slist {
            h.update(&[s.qsize, s.skip]);
        }
        h.update(b"c");
        h.update(&[self.collocations]);
        ConfigFingerprint(h.finalize())
    }
}

/// Digest of a [`TextConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ConfigFingerprint(pub u32);

impl fmt::Display for ConfigFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}
