use crate::core::models::sequence::{Base, Sequence};
use crate::core::models::variant::{GenerationStrategy, PointMutation, RawCandidate};
use crate::engine::config::{GenerationConfig, MutationCount, MutationWeights};
use crate::engine::error::EngineError;
use crate::engine::tasks::conservation::ConservationProfile;
use crate::engine::utils::sampling::{weighted_choice, weighted_sample_without_replacement};
use rand::Rng;

const MIN_POSITION_TOLERANCE: f64 = 0.1;
const SHORT_SCAFFOLD_LENGTH: usize = 30;

/// Conservation-guided point mutator for one scaffold.
///
/// Position weights are `bias * clamp(tolerance, 0.1, 1) + (1 - bias)`, so even
/// fully conserved positions keep a small chance of mutating unless the bias is 1.
#[derive(Debug, Clone)]
pub struct Mutator<'a> {
    wild_type: &'a Sequence,
    position_weights: Vec<f64>,
    count: &'a MutationCount,
    base_weights: MutationWeights,
}

impl<'a> Mutator<'a> {
    pub fn new(
        wild_type: &'a Sequence,
        profile: Option<&ConservationProfile>,
        config: &'a GenerationConfig,
    ) -> Self {
        let bias = config.conservation_bias;
        let position_weights = (0..wild_type.len())
            .map(|position| {
                let tolerance = profile
                    .and_then(|p| p.tolerance(position))
                    .unwrap_or(1.0)
                    .clamp(MIN_POSITION_TOLERANCE, 1.0);
                bias * tolerance + (1.0 - bias)
            })
            .collect();
        Self {
            wild_type,
            position_weights,
            count: &config.mutation_count,
            base_weights: config.mutation_weights,
        }
    }

    pub fn position_weights(&self) -> &[f64] {
        &self.position_weights
    }

    /// Number of mutations for the next candidate, capped at a third of short
    /// scaffolds and a quarter of longer ones.
    pub fn mutation_count(&self, rng: &mut impl Rng) -> Result<usize, EngineError> {
        let requested = match self.count {
            MutationCount::Fixed(n) => *n,
            MutationCount::Weighted(weights) => weighted_choice(weights, rng)? + 1,
        };
        let length = self.wild_type.len();
        let cap = if length <= SHORT_SCAFFOLD_LENGTH {
            length / 3
        } else {
            length / 4
        };
        Ok(requested.min(cap).max(1).min(length))
    }

    pub fn mutate(&self, run_index: usize, rng: &mut impl Rng) -> Result<RawCandidate, EngineError> {
        let count = self.mutation_count(rng)?;
        let positions = weighted_sample_without_replacement(&self.position_weights, count, rng)?;

        let mut bases = self.wild_type.bases().to_vec();
        let mut mutations = Vec::with_capacity(count);
        for position in positions {
            let from = bases[position];
            let to = self.replacement_base(from, rng)?;
            bases[position] = to;
            mutations.push(PointMutation { position, from, to });
        }

        Ok(RawCandidate {
            sequence: Sequence::from_bases(bases)?,
            run_index,
            strategy: GenerationStrategy::ConservationGuided,
            mutations,
        })
    }

    fn replacement_base(&self, current: Base, rng: &mut impl Rng) -> Result<Base, EngineError> {
        let alternatives: Vec<Base> = current.alternatives().collect();
        let mut weights: Vec<f64> = alternatives
            .iter()
            .map(|&b| self.base_weights.weight(b))
            .collect();
        if weights.iter().all(|&w| w <= 0.0) {
            weights = vec![1.0; alternatives.len()];
        }
        Ok(alternatives[weighted_choice(&weights, rng)?])
    }
}
