use super::*;

fn naive_dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn scored(slot: SlotIndex, distance: f32) -> ScoredSlot {
    ScoredSlot { slot, distance }
}

#[test]
fn test_dot_matches_naive_for_all_tail_lengths() {
    for len in 0..13 {
        let a: Vec<f32> = (0..len).map(|i| i as f32 * 0.5 + 1.0).collect();
        let b: Vec<f32> = (0..len).map(|i| 3.0 - i as f32 * 0.25).collect();

        let expected = naive_dot(&a, &b);
        assert!((dot(&a, &b) - expected).abs() < 1e-4, "len {len}");

        let (d, na, nb) = dot_and_norms_sq(&a, &b);
        assert!((d - expected).abs() < 1e-4, "len {len}");
        assert!((na - naive_dot(&a, &a)).abs() < 1e-3, "len {len}");
        assert!((nb - naive_dot(&b, &b)).abs() < 1e-3, "len {len}");
    }
}

#[test]
fn test_cosine_identical_vectors() {
    let v = [1.0, 2.0, 3.0, 4.0, 5.0];
    assert!(cosine_distance(&v, &v).abs() < 1e-6);
}

#[test]
fn test_cosine_orthogonal_vectors() {
    let a = [1.0, 0.0, 0.0, 0.0];
    let b = [0.0, 1.0, 0.0, 0.0];
    assert!((cosine_distance(&a, &b) - 1.0).abs() < 1e-6);
}

#[test]
fn test_cosine_opposite_vectors() {
    let a = [1.0, 0.0];
    let b = [-1.0, 0.0];
    assert!((cosine_distance(&a, &b) - 2.0).abs() < 1e-6);
}

#[test]
fn test_cosine_scaled_vectors() {
    let a = [1.0, 2.0, 3.0];
    let b = [2.0, 4.0, 6.0];
    assert!(cosine_distance(&a, &b).abs() < 1e-6);
}

#[test]
fn test_zero_norm_is_max_distance() {
    let zero = [0.0; 4];
    let v = [1.0, 2.0, 3.0, 4.0];

    assert_eq!(cosine_distance(&zero, &v), MAX_DISTANCE);
    assert_eq!(cosine_distance(&v, &zero), MAX_DISTANCE);
    assert_eq!(cosine_distance(&zero, &zero), MAX_DISTANCE);
    assert!(cosine_similarity(&zero, &v).is_none());
}

#[test]
fn test_length_mismatch_and_empty_are_max_distance() {
    assert_eq!(cosine_distance(&[1.0, 2.0], &[1.0, 2.0, 3.0]), MAX_DISTANCE);
    assert_eq!(cosine_distance(&[], &[]), MAX_DISTANCE);
}

#[test]
fn test_non_finite_input_does_not_leak_nan() {
    let a = [f32::INFINITY, 1.0, 0.0, 0.0];
    let b = [1.0, 1.0, 0.0, 0.0];
    let distance = cosine_distance(&a, &b);
    assert!(distance.is_finite());
}

#[test]
fn test_select_top_k_fewer_than_k_sorts_all() {
    let result = select_top_k(vec![scored(0, 0.5), scored(1, 0.1), scored(2, 0.3)], 10);
    let slots: Vec<_> = result.iter().map(|s| s.slot).collect();
    assert_eq!(slots, vec![1, 2, 0]);
}

#[test]
fn test_select_top_k_truncates() {
    let candidates = (0..100).map(|i| scored(i, (100 - i) as f32)).collect();
    let result = select_top_k(candidates, 3);
    let slots: Vec<_> = result.iter().map(|s| s.slot).collect();
    assert_eq!(slots, vec![99, 98, 97]);
}

#[test]
fn test_select_top_k_ties_keep_encounter_order() {
    let candidates = vec![
        scored(7, 0.2),
        scored(3, 0.1),
        scored(9, 0.2),
        scored(1, 0.2),
        scored(4, 0.5),
    ];

    let partial = select_top_k(candidates.clone(), 3);
    let slots: Vec<_> = partial.iter().map(|s| s.slot).collect();
    assert_eq!(slots, vec![3, 7, 9]);

    let full = select_top_k(candidates, 5);
    let slots: Vec<_> = full.iter().map(|s| s.slot).collect();
    assert_eq!(slots, vec![3, 7, 9, 1, 4]);
}

#[test]
fn test_select_top_k_zero() {
    assert!(select_top_k(vec![scored(0, 0.0)], 0).is_empty());
}

#[test]
fn test_engine_ranks_identical_vector_first() {
    let engine = SimilarityEngine::new();
    let embeddings: [[f32; 4]; 3] = [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0]];
    let candidates = embeddings
        .iter()
        .enumerate()
        .map(|(i, e)| (i as SlotIndex, e.as_slice(), norm(e)));

    let result = engine.top_k(&[1.0, 0.0, 0.0, 0.0], candidates, 1);

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].slot, 0);
    assert!(result[0].distance.abs() < 1e-6);
}

#[test]
fn test_engine_zero_query_scores_max_distance() {
    let engine = SimilarityEngine::new();
    let e = [1.0f32, 0.0, 0.0, 0.0];
    let result = engine.top_k(&[0.0; 4], [(0, e.as_slice(), norm(&e))], 5);

    assert_eq!(result[0].distance, MAX_DISTANCE);
}

#[test]
fn test_engine_empty_candidates() {
    let engine = SimilarityEngine::new();
    let result = engine.top_k(&[1.0, 0.0], std::iter::empty(), 5);
    assert!(result.is_empty());
}
