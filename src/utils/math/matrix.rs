//! Sparse matrix views of vector corpora and inverted files (sprs CSC).
//!
//! An inverted file is a sparse matrix stored by columns: column `t` is the
//! postings list of token `t` and row `d` is document `d`. A corpus of
//! vectors exports the other way round, one column per vector.

use sprs::CsMat;

use crate::error::{Error, Result};
use crate::index::InvertedFile;
use crate::utils::math::vector::SparseVec;

/// CSC matrix with `cols[j]` as column `j`
///
/// # Arguments
/// * `cols` - one sparse vector per column
/// * `m` - minimum number of rows; the result has `max(m, largest id + 1)`
pub fn sparse_matrix(cols: &[SparseVec], m: usize) -> CsMat<f32> {
    let nrows = cols.iter().map(|c| c.dim(0)).max().unwrap_or(0).max(m);
    let nnz = cols.iter().map(SparseVec::nnz).sum();
    let mut indptr = Vec::with_capacity(cols.len() + 1);
    let mut indices = Vec::with_capacity(nnz);
    let mut data = Vec::with_capacity(nnz);
    indptr.push(0);
    for col in cols {
        for (id, w) in col.to_sorted() {
            indices.push(id as usize);
            data.push(w);
        }
        indptr.push(indices.len());
    }
    CsMat::new_csc((nrows, cols.len()), indptr, indices, data)
}

/// Columns of a sparse matrix (CSC or CSR) as sparse vectors
pub fn matrix_columns(mat: &CsMat<f32>) -> Result<Vec<SparseVec>> {
    if mat.rows() > u32::MAX as usize + 1 {
        return Err(Error::invalid(format!("{} rows exceed the u32 id space", mat.rows())));
    }
    let mut cols = vec![SparseVec::new(); mat.cols()];
    for (&w, (row, col)) in mat.iter() {
        cols[col].add_pair(row as u32, w);
    }
    Ok(cols)
}

impl InvertedFile {
    /// Documents x tokens CSC matrix, column `t` holds the postings of `t`
    ///
    /// # Arguments
    /// * `m` - minimum number of columns; the result has
    ///   `max(m, largest posted token + 1)`
    pub fn to_sparse_matrix(&self, m: usize) -> CsMat<f32> {
        let tokens = self.tokens();
        let ncols = tokens.last().map_or(0, |&t| t as usize + 1).max(m);
        let mut indptr = Vec::with_capacity(ncols + 1);
        let mut indices = Vec::with_capacity(self.n_postings());
        let mut data = Vec::with_capacity(self.n_postings());
        indptr.push(0);
        for t in tokens {
            // empty columns up to t
            while indptr.len() <= t as usize {
                indptr.push(indices.len());
            }
            for p in self.postings(t) {
                indices.push(p.doc_id as usize);
                data.push(p.weight);
            }
            indptr.push(indices.len());
        }
        while indptr.len() <= ncols {
            indptr.push(indices.len());
        }
        CsMat::new_csc((self.len(), ncols), indptr, indices, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(pairs: &[(u32, f32)]) -> SparseVec {
        SparseVec::from_pairs(pairs.iter().copied())
    }

    fn corpus() -> Vec<SparseVec> {
        vec![
            v(&[(0, 1.0), (3, 0.5)]),
            v(&[]),
            v(&[(3, 2.0), (1, 0.25)]),
        ]
    }

    #[test]
    fn corpus_round_trip() {
        let vectors = corpus();
        let mat = sparse_matrix(&vectors, 0);
        assert_eq!((mat.rows(), mat.cols()), (4, 3));
        assert_eq!(mat.nnz(), 4);
        assert_eq!(mat.get(3, 2), Some(&2.0));
        assert_eq!(mat.get(2, 0), None);
        assert_eq!(matrix_columns(&mat).unwrap(), vectors);
        assert_eq!(sparse_matrix(&vectors, 10).rows(), 10);
    }

    #[test]
    fn inverted_file_is_the_transposed_corpus() {
        let vectors = corpus();
        let mut index = InvertedFile::new();
        index.extend(&vectors).unwrap();

        let by_token = index.to_sparse_matrix(0);
        let by_doc = sparse_matrix(&vectors, 0);
        assert_eq!((by_token.rows(), by_token.cols()), (3, 4));
        assert_eq!(by_token.nnz(), by_doc.nnz());
        for (&w, (doc, token)) in by_token.iter() {
            assert_eq!(by_doc.get(token, doc), Some(&w));
        }

        // frozen postings export the same matrix
        index.freeze();
        let frozen = index.to_sparse_matrix(0);
        assert_eq!(matrix_columns(&frozen).unwrap(), matrix_columns(&by_token).unwrap());
        assert_eq!(index.to_sparse_matrix(8).cols(), 8);
    }

    #[test]
    fn empty_inputs() {
        let mat = sparse_matrix(&[], 0);
        assert_eq!((mat.rows(), mat.cols()), (0, 0));
        assert!(matrix_columns(&mat).unwrap().is_empty());
        assert_eq!(InvertedFile::new().to_sparse_matrix(0).cols(), 0);
    }
}
