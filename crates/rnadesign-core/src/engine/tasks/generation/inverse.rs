use crate::core::models::sequence::Sequence;
use crate::core::models::structure::Structure;
use crate::core::models::variant::{GenerationStrategy, RawCandidate};
use crate::engine::oracle::OracleClient;
use std::collections::HashSet;
use tracing::{debug, trace};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InverseRun {
    pub candidates: Vec<RawCandidate>,
    pub attempts: usize,
    pub failures: usize,
}

/// Calls the inverse folder against `target` until `count` distinct sequences
/// are collected or `max_attempts` calls have been made.
///
/// Failed calls are dropped and still count as attempts.
pub fn run(
    client: &OracleClient,
    target: &Structure,
    count: usize,
    max_attempts: usize,
    run_index: usize,
) -> InverseRun {
    let mut seen: HashSet<Sequence> = HashSet::with_capacity(count);
    let mut output = InverseRun::default();

    while output.candidates.len() < count && output.attempts < max_attempts {
        output.attempts += 1;
        match client.inverse_fold(target) {
            Ok(sequence) => {
                if seen.insert(sequence.clone()) {
                    output.candidates.push(RawCandidate {
                        sequence,
                        run_index,
                        strategy: GenerationStrategy::InverseFolding,
                        mutations: Vec::new(),
                    });
                } else {
                    trace!(run_index, "Duplicate inverse-fold result dropped.");
                }
            }
            Err(e) => {
                debug!(run_index, error = %e, "Inverse fold failed, candidate skipped.");
                output.failures += 1;
            }
        }
    }
    output
}
