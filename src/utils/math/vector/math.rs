use std::ops::{Add, AddAssign, Div, Mul, Sub, SubAssign};

use super::SparseVec;

impl SparseVec {
    /// ドット積を計算するメソッド
    /// 小さい方を走査し、大きい方を引くので O(min(|a|, |b|))
    /// `a.dot(b) == b.dot(a)` holds exactly: with equal sizes the shared
    /// products are summed in ascending id order.
    ///
    /// # Arguments
    /// * `other` - 他のベクトル
    ///
    /// # Returns
    /// * `f64` - ドット積の結果
    #[inline]
    pub fn dot(&self, other: &Self) -> f64 {
        if self.nnz() == other.nnz() {
            let mut products: Vec<(u32, f64)> = self
                .iter()
                .filter(|&(id, _)| other.contains(id))
                .map(|(id, w)| (id, w as f64 * other.get(id) as f64))
                .collect();
            products.sort_unstable_by_key(|&(id, _)| id);
            return products.into_iter().map(|(_, p)| p).sum();
        }
        let (small, large) = if self.nnz() < other.nnz() { (self, other) } else { (other, self) };
        small
            .iter()
            .map(|(id, w)| w as f64 * large.get(id) as f64)
            .sum()
    }

    /// 二乗ノルム
    #[inline]
    pub fn norm_sq(&self) -> f64 {
        self.iter().map(|(_, w)| (w as f64) * (w as f64)).sum()
    }

    /// L2 norm
    #[inline]
    pub fn norm(&self) -> f64 {
        self.norm_sq().sqrt()
    }

    /// Divide every weight by the L2 norm, in place.
    /// A zero vector is left unchanged.
    pub fn normalize_mut(&mut self) -> &mut Self {
        let norm = self.norm();
        if norm > 0.0 {
            let inv = (1.0 / norm) as f32;
            for w in self.weights_mut() {
                *w *= inv;
            }
        }
        self
    }

    /// Normalized copy, see [`SparseVec::normalize_mut`]
    pub fn normalize(&self) -> Self {
        let mut out = self.clone();
        out.normalize_mut();
        out
    }

    /// `self += other`
    pub fn add_mut(&mut self, other: &Self) -> &mut Self {
        for (id, w) in other.iter() {
            self.add_pair(id, w);
        }
        self
    }

    /// `self -= other`
    pub fn sub_mut(&mut self, other: &Self) -> &mut Self {
        for (id, w) in other.iter() {
            self.add_pair(id, -w);
        }
        self
    }

    /// Multiply every weight by `factor`
    pub fn scale_mut(&mut self, factor: f32) -> &mut Self {
        if factor == 0.0 {
            self.clear();
        } else {
            for w in self.weights_mut() {
                *w *= factor;
            }
        }
        self
    }

    /// Divide every weight by `divisor`.
    /// Dividing by zero yields non-finite weights, callers guard against it.
    pub fn div_mut(&mut self, divisor: f32) -> &mut Self {
        for w in self.weights_mut() {
            *w /= divisor;
        }
        self
    }

    /// アダマール積 (要素ごとの積)
    /// 共通の id のみ残る
    pub fn hadamard(&self, other: &Self) -> Self {
        let (small, large) = if self.nnz() <= other.nnz() { (self, other) } else { (other, self) };
        let mut out = SparseVec::with_capacity(small.nnz());
        for (id, w) in small.iter() {
            let o = large.get(id);
            if o != 0.0 {
                out.insert(id, w * o);
            }
        }
        out
    }
}

/// Sum of a list of vectors; the empty list sums to the zero vector
pub fn sum<'a, I>(vectors: I) -> SparseVec
where
    I: IntoIterator<Item = &'a SparseVec>,
{
    let mut acc = SparseVec::new();
    for v in vectors {
        acc.add_mut(v);
    }
    acc
}

/// Elementwise mean of a list of vectors
pub fn centroid(vectors: &[SparseVec]) -> SparseVec {
    let mut acc = sum(vectors);
    if !vectors.is_empty() {
        acc.div_mut(vectors.len() as f32);
    }
    acc
}

impl Add for &SparseVec {
    type Output = SparseVec;

    fn add(self, rhs: Self) -> SparseVec {
        let mut out = self.clone();
        out.add_mut(rhs);
        out
    }
}

impl Sub for &SparseVec {
    type Output = SparseVec;

    fn sub(self, rhs: Self) -> SparseVec {
        let mut out = self.clone();
        out.sub_mut(rhs);
        out
    }
}

impl Mul for &SparseVec {
    type Output = SparseVec;

    fn mul(self, rhs: Self) -> SparseVec {
        self.hadamard(rhs)
    }
}

impl Mul<f32> for &SparseVec {
    type Output = SparseVec;

    fn mul(self, rhs: f32) -> SparseVec {
        let mut out = self.clone();
        out.scale_mut(rhs);
        out
    }
}

impl Div<f32> for &SparseVec {
    type Output = SparseVec;

    fn div(self, rhs: f32) -> SparseVec {
        let mut out = self.clone();
        out.div_mut(rhs);
        out
    }
}

impl AddAssign<&SparseVec> for SparseVec {
    fn add_assign(&mut self, rhs: &SparseVec) {
        self.add_mut(rhs);
    }
}

impl AddAssign<(u32, f32)> for SparseVec {
    fn add_assign(&mut self, (id, w): (u32, f32)) {
        self.add_pair(id, w);
    }
}

impl SubAssign<&SparseVec> for SparseVec {
    fn sub_assign(&mut self, rhs: &SparseVec) {
        self.sub_mut(rhs);
    }
}
