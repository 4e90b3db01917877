//! Vector helpers shared by the re-ranker, the in-memory store and the chunker.

/// `dot(a,b) / (|a|·|b|)`; `0.0` when either norm is zero or lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() { return 0.0; }
    let (mut dot, mut na, mut nb) = (0f32, 0f32, 0f32);
    for (x, y) in a.iter().zip(b.iter()) { dot += x * y; na += x * x; nb += y * y; }
    let denom = na.sqrt() * nb.sqrt();
    if denom <= f32::EPSILON { return 0.0; }
    dot / denom
}

/// In-place L2 normalization; zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm <= f32::EPSILON { return; }
    for x in v.iter_mut() { *x /= norm; }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(left: f32, right: f32) -> bool { (left - right).abs() < 1e-5 }

    #[test]
    fn identical_vectors_score_one() {
        let v = vec![1.0, 2.0, 3.0, 4.0];
        assert!(approx_eq(cosine_similarity(&v, &v), 1.0));
    }

    #[test]
    fn orthogonal_vectors_score_zero() {
        assert!(approx_eq(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0));
    }

    #[test]
    fn zero_norm_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn normalize_yields_unit_norm() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!(approx_eq(v[0], 0.6) && approx_eq(v[1], 0.8));
    }
}
