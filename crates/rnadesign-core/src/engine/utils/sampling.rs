use rand::{distributions::WeightedIndex, prelude::*};
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("Weight list is empty, cannot perform sampling")]
    EmptyWeights,
    #[error("Cannot draw {requested} distinct items from {available} with non-zero weight")]
    NotEnoughItems { requested: usize, available: usize },
    #[error("Failed to create weighted distribution: {source}")]
    DistributionError {
        #[from]
        source: rand::distributions::WeightedError,
    },
}

/// Draws one index with probability proportional to its weight.
pub fn weighted_choice(weights: &[f64], rng: &mut impl Rng) -> Result<usize, SamplingError> {
    if weights.is_empty() {
        return Err(SamplingError::EmptyWeights);
    }
    let dist = WeightedIndex::new(weights)?;
    Ok(dist.sample(rng))
}

/// Draws `count` distinct indices, each step proportional to the remaining weights.
///
/// Indices are returned in draw order.
#[instrument(level = "trace", skip_all, fields(count = count))]
pub fn weighted_sample_without_replacement(
    weights: &[f64],
    count: usize,
    rng: &mut impl Rng,
) -> Result<Vec<usize>, SamplingError> {
    if weights.is_empty() {
        return Err(SamplingError::EmptyWeights);
    }
    let available = weights.iter().filter(|&&w| w > 0.0).count();
    if count > available {
        return Err(SamplingError::NotEnoughItems {
            requested: count,
            available,
        });
    }

    let mut remaining = weights.to_vec();
    let mut chosen = Vec::with_capacity(count);
    for _ in 0..count {
        let dist = WeightedIndex::new(&remaining)?;
        let index = dist.sample(rng);
        remaining[index] = 0.0;
        chosen.push(index);
    }
    Ok(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    #[test]
    fn weighted_choice_never_picks_zero_weight() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..200 {
            let idx = weighted_choice(&[0.0, 1.0, 0.0, 3.0], &mut rng).unwrap();
            assert!(idx == 1 || idx == 3);
        }
    }

    #[test]
    fn weighted_choice_rejects_empty_and_zero_weights() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        assert!(matches!(
            weighted_choice(&[], &mut rng),
            Err(SamplingError::EmptyWeights)
        ));
        assert!(matches!(
            weighted_choice(&[0.0, 0.0], &mut rng),
            Err(SamplingError::DistributionError { .. })
        ));
    }

    #[test]
    fn sample_without_replacement_returns_distinct_indices() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let weights = vec![1.0; 10];
        let picks = weighted_sample_without_replacement(&weights, 10, &mut rng).unwrap();
        let unique: HashSet<_> = picks.iter().collect();
        assert_eq!(unique.len(), 10);
    }

    #[test]
    fn sample_without_replacement_is_reproducible_for_a_seed() {
        let weights = [0.1, 0.5, 1.0, 0.3, 0.9, 0.2];
        let a = weighted_sample_without_replacement(&weights, 3, &mut ChaCha8Rng::seed_from_u64(3))
            .unwrap();
        let b = weighted_sample_without_replacement(&weights, 3, &mut ChaCha8Rng::seed_from_u64(3))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn sample_without_replacement_rejects_oversized_requests() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(matches!(
            weighted_sample_without_replacement(&[1.0, 0.0, 2.0], 3, &mut rng),
            Err(SamplingError::NotEnoughItems {
                requested: 3,
                available: 2
            })
        ));
    }
}
