//! Vector math shared by the embedding backends and retrieval ranking.

/// Euclidean length.
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scale `v` to unit length in place. An all-zero vector is left as is.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = l2_norm(v);
    if norm == 0.0 {
        return;
    }
    v.iter_mut().for_each(|x| *x /= norm);
}

/// Component-wise mean of equally sized rows (token vectors to one sentence
/// vector). `None` when there are no rows or their widths differ.
pub fn mean_pool(rows: &[Vec<f32>]) -> Option<Vec<f32>> {
    let width = rows.first()?.len();
    if rows.iter().any(|r| r.len() != width) {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let count = rows.len() as f32;
    let pooled = (0..width)
        .map(|i| rows.iter().map(|r| r[i]).sum::<f32>() / count)
        .collect();
    Some(pooled)
}

/// Cosine similarity in `[-1, 1]`.
///
/// Vectors of different width (e.g. a chunk embedded by another backend)
/// and zero vectors score `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let (dot, aa, bb) = a
        .iter()
        .zip(b)
        .fold((0.0_f32, 0.0_f32, 0.0_f32), |(dot, aa, bb), (x, y)| {
            (dot + x * y, aa + x * x, bb + y * y)
        });
    let denom = aa.sqrt() * bb.sqrt();
    if denom == 0.0 {
        return 0.0;
    }
    (dot / denom).clamp(-1.0, 1.0)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn normalize_scales_to_unit_length() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!(close(v[0], 0.6) && close(v[1], 0.8));

        let mut zero = vec![0.0; 4];
        l2_normalize(&mut zero);
        assert!(zero.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn mean_pool_token_rows() {
        let pooled = mean_pool(&[vec![1.0, 0.0, 2.0], vec![3.0, 2.0, 0.0]]).unwrap();
        assert_eq!(pooled, vec![2.0, 1.0, 1.0]);
        assert!(mean_pool(&[]).is_none());
        assert!(mean_pool(&[vec![1.0], vec![1.0, 2.0]]).is_none());
    }

    #[test]
    fn cosine_reference_values() {
        assert!(close(cosine_similarity(&[0.6, 0.8], &[0.6, 0.8]), 1.0));
        assert!(close(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0));
        assert!(close(cosine_similarity(&[1.0, 0.0], &[-2.0, 0.0]), -1.0));
        let expected = 32.0 / (14.0_f32.sqrt() * 77.0_f32.sqrt());
        assert!(close(cosine_similarity(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]), expected));
    }

    #[test]
    fn foreign_width_scores_zero() {
        assert!(close(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0));
        assert!(close(cosine_similarity(&[], &[]), 0.0));
        assert!(close(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn normalized_vectors_have_unit_norm(v in proptest::collection::vec(-50.0f32..50.0, 1..48)) {
                let nonzero = v.iter().any(|x| *x != 0.0);
                let mut v = v;
                l2_normalize(&mut v);
                if nonzero {
                    prop_assert!((l2_norm(&v) - 1.0).abs() < 1e-4);
                }
            }

            #[test]
            fn cosine_is_symmetric_and_bounded(
                pairs in proptest::collection::vec((-50.0f32..50.0, -50.0f32..50.0), 2..24),
            ) {
                let (a, b): (Vec<f32>, Vec<f32>) = pairs.into_iter().unzip();
                let ab = cosine_similarity(&a, &b);
                prop_assert!((ab - cosine_similarity(&b, &a)).abs() < 1e-5);
                prop_assert!((-1.0..=1.0).contains(&ab));
            }
        }
    }
}
