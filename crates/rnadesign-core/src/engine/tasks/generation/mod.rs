//! Raw candidate generation.
//!
//! A round executes `n_runs` independent runs. Conservation-guided runs each own
//! a random stream derived from the master seed, so the proposed mutations depend
//! only on the seed, the round and the run index. Inverse-folding runs draw their
//! randomness inside the oracle and are not reproducible. Runs are merged in run
//! order and de-duplicated by first occurrence.

pub mod inverse;
pub mod mutation;

use crate::core::models::sequence::Sequence;
use crate::core::models::variant::{GenerationStrategy, RawCandidate};
use crate::engine::context::DesignContext;
use crate::engine::error::EngineError;
use crate::engine::progress::Progress;
use crate::engine::tasks::conservation::ConservationProfile;
use mutation::Mutator;
use std::collections::HashSet;
use tracing::{info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    pub strategy: GenerationStrategy,
    pub runs: usize,
    /// Candidates produced across all runs, duplicates included.
    pub produced: usize,
    pub unique: usize,
    pub oracle_failures: usize,
    pub empty_runs: usize,
}

#[derive(Debug)]
struct RunOutput {
    candidates: Vec<RawCandidate>,
    failures: usize,
}

#[instrument(skip_all, name = "generation", fields(round = round, strategy = %strategy))]
pub fn run(
    context: &DesignContext,
    strategy: GenerationStrategy,
    profile: Option<&ConservationProfile>,
    round: usize,
) -> Result<(Vec<RawCandidate>, GenerationReport), EngineError> {
    let config = &context.config.generation;
    let n_runs = config.n_runs;

    context.reporter.report(Progress::PhaseStart { name: "Generation" });
    context.reporter.report(Progress::TaskStart {
        total_steps: n_runs as u64,
    });
    info!(
        n_runs,
        per_run = config.candidates_per_run,
        "Generating raw candidates."
    );

    let mutator = Mutator::new(&context.wild_type.sequence, profile, config);

    #[cfg(not(feature = "parallel"))]
    let iterator = 0..n_runs;

    #[cfg(feature = "parallel")]
    let iterator = (0..n_runs).into_par_iter();

    let outputs: Vec<Result<RunOutput, EngineError>> = iterator
        .map(|run_index| {
            let output = execute_run(context, strategy, &mutator, round, run_index);
            context.reporter.report(Progress::TaskIncrement);
            output
        })
        .collect();

    context.reporter.report(Progress::TaskFinish);

    let mut seen: HashSet<Sequence> = HashSet::new();
    let mut candidates = Vec::new();
    let mut report = GenerationReport {
        strategy,
        runs: n_runs,
        produced: 0,
        unique: 0,
        oracle_failures: 0,
        empty_runs: 0,
    };

    for (run_index, output) in outputs.into_iter().enumerate() {
        let output = output?;
        report.oracle_failures += output.failures;
        report.produced += output.candidates.len();
        if output.candidates.is_empty() {
            warn!(run_index, "Generation run produced no candidates.");
            report.empty_runs += 1;
        }
        for candidate in output.candidates {
            if seen.insert(candidate.sequence.clone()) {
                candidates.push(candidate);
            }
        }
    }
    report.unique = candidates.len();

    context.reporter.report(Progress::PhaseFinish);

    if candidates.is_empty() {
        return Err(EngineError::InsufficientCandidates {
            stage: "generation",
            required: 1,
            available: 0,
        });
    }

    info!(
        produced = report.produced,
        unique = report.unique,
        oracle_failures = report.oracle_failures,
        "Generation finished."
    );
    Ok((candidates, report))
}

fn execute_run(
    context: &DesignContext,
    strategy: GenerationStrategy,
    mutator: &Mutator,
    round: usize,
    run_index: usize,
) -> Result<RunOutput, EngineError> {
    let config = &context.config.generation;
    match strategy {
        GenerationStrategy::InverseFolding => {
            let output = inverse::run(
                context.client,
                &context.wild_type.structure,
                config.candidates_per_run,
                config.inverse_max_attempts,
                run_index,
            );
            Ok(RunOutput {
                candidates: output.candidates,
                failures: output.failures,
            })
        }
        GenerationStrategy::ConservationGuided => {
            let mut rng = context.seeds.run_rng(round, run_index);
            let candidates = (0..config.candidates_per_run)
                .map(|_| mutator.mutate(run_index, &mut rng))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(RunOutput {
                candidates,
                failures: 0,
            })
        }
    }
}
