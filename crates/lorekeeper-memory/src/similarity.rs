// SPDX-FileCopyrightText: 2026 Lorekeeper Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cosine similarity kernels.
//!
//! Norms are always recomputed: stored vectors are not guaranteed to be
//! unit length even though the encoder produces unit vectors.

use lorekeeper_core::error::LorekeeperError;

/// Fails with [`LorekeeperError::DimensionMismatch`] unless `actual == expected`.
pub fn check_dimensions(expected: usize, actual: usize) -> Result<(), LorekeeperError> {
    if expected == actual {
        Ok(())
    } else {
        Err(LorekeeperError::DimensionMismatch { expected, actual })
    }
}

#[inline]
fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[inline]
fn cosine_from_parts(dot: f32, norm_a: f32, norm_b: f32) -> f32 {
    let denom = norm_a * norm_b;
    if denom == 0.0 { 0.0 } else { dot / denom }
}

/// Cosine similarity of two vectors of equal length.
///
/// Returns 0.0 when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, LorekeeperError> {
    check_dimensions(a.len(), b.len())?;
    Ok(cosine_from_parts(dot(a, b), dot(a, a).sqrt(), dot(b, b).sqrt()))
}

/// Row-major matrix of equal-length vectors with precomputed norms.
struct Rows {
    data: Vec<f32>,
    norms: Vec<f32>,
    dim: usize,
}

impl Rows {
    fn pack(rows: &[Vec<f32>], dim: usize) -> Result<Self, LorekeeperError> {
        let mut data = Vec::with_capacity(rows.len() * dim);
        let mut norms = Vec::with_capacity(rows.len());
        for row in rows {
            check_dimensions(dim, row.len())?;
            norms.push(dot(row, row).sqrt());
            data.extend_from_slice(row);
        }
        Ok(Self { data, norms, dim })
    }

    fn iter(&self) -> impl Iterator<Item = (&[f32], f32)> {
        self.data
            .chunks_exact(self.dim.max(1))
            .zip(self.norms.iter().copied())
    }
}

/// For each target, the best cosine similarity against any query.
///
/// `result[j] == max_i cosine(queries[i], targets[j])`. Every pair is
/// evaluated; an empty `queries` or `targets` gives an empty result. All
/// vectors must share the first query's length.
pub fn max_similarity_matrix(
    queries: &[Vec<f32>],
    targets: &[Vec<f32>],
) -> Result<Vec<f32>, LorekeeperError> {
    let Some(first) = queries.first() else {
        return Ok(Vec::new());
    };
    if targets.is_empty() {
        return Ok(Vec::new());
    }

    let dim = first.len();
    let queries = Rows::pack(queries, dim)?;
    let targets = Rows::pack(targets, dim)?;

    if dim == 0 {
        return Ok(vec![0.0; targets.norms.len()]);
    }

    let mut best = vec![f32::NEG_INFINITY; targets.norms.len()];
    for (q, q_norm) in queries.iter() {
        for ((t, t_norm), slot) in targets.iter().zip(best.iter_mut()) {
            let s = cosine_from_parts(dot(q, t), q_norm, t_norm);
            if s > *slot {
                *slot = s;
            }
        }
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn normalized(v: Vec<f32>) -> Vec<f32> {
        let n = dot(&v, &v).sqrt();
        v.into_iter().map(|x| x / n).collect()
    }

    #[test]
    fn identical_unit_vectors_score_one() {
        let v = normalized(vec![0.3, -1.2, 0.5, 2.0]);
        assert!((cosine_similarity(&v, &v).unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_score_zero() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap().abs() < f32::EPSILON);
    }

    #[test]
    fn opposite_vectors_score_minus_one() {
        let s = cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]).unwrap();
        assert!((s + 1.0).abs() < 1e-6);
    }

    #[test]
    fn non_unit_vectors_are_normalized() {
        let s = cosine_similarity(&[10.0, 0.0], &[3.0, 3.0]).unwrap();
        assert!((s - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).unwrap(), 0.0);
    }

    #[test]
    fn mismatched_lengths_fail() {
        let err = cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0]).unwrap_err();
        assert!(matches!(
            err,
            LorekeeperError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn empty_inputs_give_empty_result() {
        let t = vec![vec![1.0, 0.0]];
        assert!(max_similarity_matrix(&[], &t).unwrap().is_empty());
        assert!(max_similarity_matrix(&t, &[]).unwrap().is_empty());
    }

    #[test]
    fn matrix_rejects_ragged_rows() {
        let q = vec![vec![1.0, 0.0]];
        let t = vec![vec![1.0, 0.0], vec![1.0, 0.0, 0.0]];
        assert!(matches!(
            max_similarity_matrix(&q, &t),
            Err(LorekeeperError::DimensionMismatch { .. })
        ));
        let q = vec![vec![1.0, 0.0], vec![1.0]];
        assert!(max_similarity_matrix(&q, &t[..1]).is_err());
    }

    #[test]
    fn any_query_can_claim_a_target() {
        let queries = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let targets = vec![vec![0.0, 2.0], vec![5.0, 0.0], vec![1.0, 1.0]];
        let best = max_similarity_matrix(&queries, &targets).unwrap();
        assert!((best[0] - 1.0).abs() < 1e-6);
        assert!((best[1] - 1.0).abs() < 1e-6);
        assert!((best[2] - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn brute_force_agreement_small() {
        // Fixed pseudo-random 3x8 queries and 5x8 targets.
        let mut seed = 0x2545_f491_u32;
        let mut next = move || {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            (seed % 2000) as f32 / 1000.0 - 1.0
        };
        let queries: Vec<Vec<f32>> = (0..3).map(|_| (0..8).map(|_| next()).collect()).collect();
        let targets: Vec<Vec<f32>> = (0..5).map(|_| (0..8).map(|_| next()).collect()).collect();

        let best = max_similarity_matrix(&queries, &targets).unwrap();
        assert_eq!(best.len(), 5);
        for (j, t) in targets.iter().enumerate() {
            let expected = queries
                .iter()
                .map(|q| cosine_similarity(q, t).unwrap())
                .fold(f32::NEG_INFINITY, f32::max);
            assert!((best[j] - expected).abs() < 1e-6, "target {j}");
        }
    }

    fn matrix(rows: std::ops::Range<usize>, dim: usize) -> impl Strategy<Value = Vec<Vec<f32>>> {
        prop::collection::vec(prop::collection::vec(-1.0f32..1.0, dim), rows)
    }

    proptest! {
        #[test]
        fn max_similarity_matches_pairwise_max(
            (queries, targets) in (1usize..6)
                .prop_flat_map(|dim| (matrix(1..5, dim), matrix(1..8, dim)))
        ) {
            let best = max_similarity_matrix(&queries, &targets).unwrap();
            prop_assert_eq!(best.len(), targets.len());
            for (j, t) in targets.iter().enumerate() {
                let expected = queries
                    .iter()
                    .map(|q| cosine_similarity(q, t).unwrap())
                    .fold(f32::NEG_INFINITY, f32::max);
                prop_assert!((best[j] - expected).abs() < 1e-6);
            }
        }
    }
}
