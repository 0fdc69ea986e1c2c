use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;

/// Selection weight of each of the first `k` ranks: 1, 1/2, 1/3, ...
pub fn rank_weights(k: usize) -> Vec<f64> {
    (0..k).map(|i| 1.0 / (i as f64 + 1.0)).collect()
}

/// Choose one of the top-K entries of a best-first ranking, rank i drawn
/// with probability proportional to 1/(i+1).
pub fn choose_weighted<T: Clone, R: Rng + ?Sized>(ranked: &[T], topk: usize, rng: &mut R) -> Option<T> {
    if ranked.is_empty() { return None; }
    let k = topk.max(1).min(ranked.len());
    let dist = WeightedIndex::new(rank_weights(k)).ok()?;
    Some(ranked[dist.sample(rng)].clone())
}

/// Uniform pick, used when the ranking itself can't be trusted.
pub fn choose_uniform<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Option<T> {
    items.choose(rng).cloned()
}
