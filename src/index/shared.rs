use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::Result;
use crate::index::search::Hits;
use crate::index::InvertedFile;
use crate::text::Tokenizer;
use crate::utils::math::vector::SparseVec;

/// Inverted file shared between threads
///
/// Searches take the read lock for their whole run and appends take the
/// write lock, so a search sees the index exactly as it was when it started
/// (snapshot per call) and never a partially appended document. Any number
/// of searches run at the same time.
#[derive(Debug, Clone, Default)]
pub struct SharedIndex {
    inner: Arc<RwLock<InvertedFile>>,
}

impl SharedIndex {
    pub fn new(index: InvertedFile) -> Self {
        Self {
            inner: Arc::new(RwLock::new(index)),
        }
    }

    pub fn search(&self, query: &SparseVec, k: usize) -> Hits {
        self.inner.read().search(query, k)
    }

    pub fn search_with<F>(&self, query: &SparseVec, k: usize, accept_postinglist: F) -> Hits
    where
        F: Fn(u32) -> bool,
    {
        self.inner.read().search_with(query, k, accept_postinglist)
    }

    /// `tokenizer` is the caller's own (one per thread)
    pub fn search_text(&self, tokenizer: &mut Tokenizer, text: &str, k: usize) -> Result<Hits> {
        self.inner.read().search_text(tokenizer, text, k)
    }

    pub fn append(&self, vec: &SparseVec) -> Result<u32> {
        self.inner.write().append(vec)
    }

    pub fn extend(&self, vectors: &[SparseVec]) -> Result<Range<u32>> {
        self.inner.write().extend(vectors)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn freeze(&self) {
        self.inner.write().freeze();
    }

    pub fn save<P: AsRef<Path>>(&self, path: P, group: &str) -> Result<()> {
        self.inner.read().save(path, group)
    }

    /// Run `f` with read access to the index
    pub fn read<R>(&self, f: impl FnOnce(&InvertedFile) -> R) -> R {
        f(&self.inner.read())
    }

    /// Unwrap the index when this is the last handle
    pub fn into_inner(self) -> std::result::Result<InvertedFile, SharedIndex> {
        Arc::try_unwrap(self.inner)
            .map(RwLock::into_inner)
            .map_err(|inner| SharedIndex { inner })
    }
}

impl From<InvertedFile> for SharedIndex {
    fn from(index: InvertedFile) -> Self {
        Self::new(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn v(pairs: &[(u32, f32)]) -> SparseVec {
        SparseVec::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn concurrent_searches_and_appends() {
        let shared = SharedIndex::new(InvertedFile::new());
        shared.append(&v(&[(0, 1.0)])).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for _ in 0..50 {
                        if i % 2 == 0 {
                            shared.append(&v(&[(0, 1.0), (1, 0.5)])).unwrap();
                        } else {
                            let hits = shared.search(&v(&[(0, 1.0)]), 5);
                            assert!(!hits.is_empty());
                            assert!(hits.len() <= 5);
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(shared.len(), 101);
        let index = shared.into_inner().unwrap();
        assert_eq!(index.postings(0).len(), 101);
    }
}
