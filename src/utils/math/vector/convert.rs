use sprs::CsVec;

use super::SparseVec;
use crate::error::{Error, Result};

/// largest dimension addressable by u32 token ids
const MAX_DIM: usize = u32::MAX as usize + 1;

impl SparseVec {
    /// Dimension needed to hold every id, at least `m`
    #[inline]
    pub fn dim(&self, m: usize) -> usize {
        self.ids().max().map_or(0, |id| id as usize + 1).max(m)
    }

    /// sprs の疎ベクトルに変換します
    ///
    /// # Arguments
    /// * `m` - minimum dimension; the result has `max(m, largest id + 1)`
    pub fn to_csvec(&self, m: usize) -> CsVec<f32> {
        let (indices, data): (Vec<usize>, Vec<f32>) = self
            .to_sorted()
            .into_iter()
            .map(|(id, w)| (id as usize, w))
            .unzip();
        CsVec::new(self.dim(m), indices, data)
    }

    /// Build from a sprs sparse vector, explicit zeros are dropped
    pub fn from_csvec(vec: &CsVec<f32>) -> Result<SparseVec> {
        if vec.dim() > MAX_DIM {
            return Err(Error::invalid(format!("dimension {} exceeds the u32 id space", vec.dim())));
        }
        let mut out = SparseVec::with_capacity(vec.nnz());
        for (i, &w) in vec.iter() {
            out.insert(i as u32, w);
        }
        Ok(out)
    }

    /// Dense copy, entry `i` is the weight of id `i`
    ///
    /// # Arguments
    /// * `m` - minimum length; the result has `max(m, largest id + 1)`
    pub fn to_dense(&self, m: usize) -> Vec<f32> {
        let mut dense = vec![0.0; self.dim(m)];
        for (id, w) in self.iter() {
            dense[id as usize] = w;
        }
        dense
    }

    /// Build from a dense slice, zeros are skipped
    pub fn from_dense(dense: &[f32]) -> Result<SparseVec> {
        if dense.len() > MAX_DIM {
            return Err(Error::invalid(format!("length {} exceeds the u32 id space", dense.len())));
        }
        Ok(dense
            .iter()
            .enumerate()
            .filter(|&(_, &w)| w != 0.0)
            .map(|(i, &w)| (i as u32, w))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csvec_round_trip() {
        let a = SparseVec::from_pairs([(7, 0.5), (2, 1.5), (4, -1.0)]);
        let cs = a.to_csvec(0);
        assert_eq!(cs.dim(), 8);
        assert_eq!(cs.indices(), &[2, 4, 7]);
        assert_eq!(cs.data(), &[1.5, -1.0, 0.5]);
        assert_eq!(a.to_csvec(20).dim(), 20);
        assert_eq!(SparseVec::from_csvec(&cs).unwrap(), a);
    }

    #[test]
    fn dense_round_trip() {
        let a = SparseVec::from_pairs([(3, 2.0), (0, 1.0)]);
        assert_eq!(a.to_dense(0), vec![1.0, 0.0, 0.0, 2.0]);
        assert_eq!(a.to_dense(6).len(), 6);
        assert_eq!(SparseVec::from_dense(&a.to_dense(6)).unwrap(), a);
        assert!(SparseVec::new().to_dense(0).is_empty());
    }
}
