use serde::{Deserialize, Serialize};

use super::SparseVec;

/// Distance functions over sparse vectors
///
/// The `Normalized*` variants assume both inputs already have unit L2 norm
/// and skip the norm computation. Passing non-normalized vectors to them is a
/// caller error and is not checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distance {
    /// `1 - cos(a, b)`, in `[0, 2]`
    Cosine,
    /// `acos(cos(a, b))`, in `[0, π]`
    Angle,
    NormalizedCosine,
    NormalizedAngle,
}

impl Distance {
    /// Evaluate the distance between `a` and `b`
    #[inline]
    pub fn evaluate(&self, a: &SparseVec, b: &SparseVec) -> f64 {
        match self {
            Distance::Cosine => 1.0 - cosine_similarity(a, b),
            Distance::Angle => cosine_similarity(a, b).acos(),
            Distance::NormalizedCosine => 1.0 - clamp_cos(a.dot(b)),
            Distance::NormalizedAngle => clamp_cos(a.dot(b)).acos(),
        }
    }
}

/// cos(θ) = a・b / (|a||b|)
/// ゼロベクトルとの類似度は 0
#[inline]
pub fn cosine_similarity(a: &SparseVec, b: &SparseVec) -> f64 {
    let norm_a = a.norm();
    let norm_b = b.norm();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    clamp_cos(a.dot(b) / (norm_a * norm_b))
}

/// rounding can push |cos| slightly above 1, which would make acos NaN
#[inline]
fn clamp_cos(c: f64) -> f64 {
    c.clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(pairs: &[(u32, f32)]) -> SparseVec {
        SparseVec::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn cosine_distance_bounds() {
        let a = v(&[(0, 1.0), (1, 2.0)]);
        let b = v(&[(0, -1.0), (1, -2.0)]);
        let c = v(&[(2, 1.0)]);
        let d = Distance::Cosine;
        assert!(d.evaluate(&a, &a).abs() < 1e-6);
        assert!((d.evaluate(&a, &b) - 2.0).abs() < 1e-6);
        assert!((d.evaluate(&a, &c) - 1.0).abs() < 1e-6);
        for (x, y) in [(&a, &b), (&a, &c), (&b, &c)] {
            let dist = d.evaluate(x, y);
            assert!((0.0..=2.0).contains(&dist));
        }
    }

    #[test]
    fn angle_of_orthogonal_vectors() {
        let a = v(&[(0, 1.0)]);
        let b = v(&[(1, 5.0)]);
        let right = std::f64::consts::FRAC_PI_2;
        assert!((Distance::Angle.evaluate(&a, &b) - right).abs() < 1e-9);
        assert!((Distance::NormalizedAngle.evaluate(&a, &b.normalize()) - right).abs() < 1e-9);
    }

    #[test]
    fn normalized_variants_agree_on_unit_vectors() {
        let a = v(&[(0, 3.0), (1, 4.0), (3, 1.0)]).normalize();
        let b = v(&[(1, 1.0), (3, 2.0), (4, 2.0)]).normalize();
        let full = Distance::Cosine.evaluate(&a, &b);
        let fast = Distance::NormalizedCosine.evaluate(&a, &b);
        assert!((full - fast).abs() < 1e-5);
        // self angle stays finite even with rounding
        assert!(Distance::NormalizedAngle.evaluate(&a, &a).is_finite());
    }

    #[test]
    fn zero_vector_is_orthogonal_to_everything() {
        let a = v(&[(0, 1.0)]);
        assert_eq!(cosine_similarity(&a, &SparseVec::new()), 0.0);
    }
}
