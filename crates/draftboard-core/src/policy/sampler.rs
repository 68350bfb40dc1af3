// Discrete rank-weighted sampler for CPU picks.

use rand::rngs::SmallRng;
use rand::Rng;

/// Picks a shortlist index with fixed, decreasing weights by rank.
#[derive(Debug, Clone, PartialEq)]
pub struct PickSampler {
    weights: Vec<f64>,
}

impl PickSampler {
    pub fn new(weights: Vec<f64>) -> Self {
        PickSampler { weights }
    }

    /// Probabilities for a shortlist of `n` candidates: the first `n` weights
    /// renormalized, or uniform when they sum to zero. Ranks beyond the weight
    /// table get zero weight.
    pub fn probabilities(&self, n: usize) -> Vec<f64> {
        if n == 0 {
            return Vec::new();
        }
        let mut probs: Vec<f64> = (0..n)
            .map(|i| self.weights.get(i).copied().unwrap_or(0.0).max(0.0))
            .collect();
        let sum: f64 = probs.iter().sum();
        if sum > 0.0 {
            for p in probs.iter_mut() {
                *p /= sum;
            }
        } else {
            probs = vec![1.0 / n as f64; n];
        }
        probs
    }

    /// Sample an index in `0..n`. Returns `None` only when `n == 0`.
    pub fn sample(&self, n: usize, rng: &mut SmallRng) -> Option<usize> {
        let probs = self.probabilities(n);
        if probs.is_empty() {
            return None;
        }
        let r: f64 = rng.gen();
        let mut cum = 0.0;
        for (i, &p) in probs.iter().enumerate() {
            cum += p;
            if r < cum {
                return Some(i);
            }
        }
        // Rounding left `cum` just under 1.0; take the last weighted rank.
        probs.iter().rposition(|&p| p > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn default_sampler() -> PickSampler {
        PickSampler::new(vec![0.60, 0.20, 0.10, 0.05, 0.02, 0.01, 0.005, 0.005, 0.005, 0.005])
    }

    #[test]
    fn truncated_weights_are_renormalized() {
        let probs = default_sampler().probabilities(2);
        assert!((probs[0] - 0.75).abs() < 1e-9);
        assert!((probs[1] - 0.25).abs() < 1e-9);
    }

    #[test]
    fn zero_weights_fall_back_to_uniform() {
        let sampler = PickSampler::new(vec![0.0, 0.0]);
        assert_eq!(sampler.probabilities(4), vec![0.25; 4]);
    }

    #[test]
    fn empty_shortlist_samples_nothing() {
        let mut rng = SmallRng::seed_from_u64(7);
        assert_eq!(default_sampler().sample(0, &mut rng), None);
    }

    #[test]
    fn single_candidate_always_chosen() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..50 {
            assert_eq!(default_sampler().sample(1, &mut rng), Some(0));
        }
    }

    #[test]
    fn same_seed_same_sequence() {
        let sampler = default_sampler();
        let mut a = SmallRng::seed_from_u64(42);
        let mut b = SmallRng::seed_from_u64(42);
        let xs: Vec<_> = (0..100).map(|_| sampler.sample(10, &mut a)).collect();
        let ys: Vec<_> = (0..100).map(|_| sampler.sample(10, &mut b)).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn top_rank_dominates() {
        let sampler = default_sampler();
        let mut rng = SmallRng::seed_from_u64(1);
        let firsts = (0..2000)
            .filter(|_| sampler.sample(10, &mut rng) == Some(0))
            .count();
        // Expected 1200.
        assert!(firsts > 1050 && firsts < 1350, "firsts = {}", firsts);
    }
}
