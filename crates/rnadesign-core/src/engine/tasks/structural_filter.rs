use crate::core::metrics::{hamming_distance, longest_common_substring};
use crate::core::models::pool::CandidatePool;
use crate::core::models::sequence::Sequence;
use crate::core::models::variant::{RawCandidate, Variant, VariantMetrics};
use crate::core::oracle::{FoldResult, OracleError};
use crate::engine::cache::CacheKey;
use crate::engine::config::FilterConfig;
use crate::engine::context::DesignContext;
use crate::engine::progress::Progress;
use crate::engine::state::WildType;
use std::convert::Infallible;
use std::fmt;
use tracing::{debug, info, instrument, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    Length,
    GcContent,
    Homopolymer,
    FoldFailed,
    Structure,
    Confidence,
    EnsembleDiversity,
    FreeEnergy,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Rejection::Length => "length",
            Rejection::GcContent => "gc-content",
            Rejection::Homopolymer => "homopolymer",
            Rejection::FoldFailed => "fold-failed",
            Rejection::Structure => "structure",
            Rejection::Confidence => "confidence",
            Rejection::EnsembleDiversity => "ensemble-diversity",
            Rejection::FreeEnergy => "free-energy",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterReport {
    pub examined: usize,
    pub accepted: usize,
    pub rejected_length: usize,
    pub rejected_gc: usize,
    pub rejected_homopolymer: usize,
    pub fold_failures: usize,
    pub rejected_structure: usize,
    pub rejected_confidence: usize,
    pub rejected_diversity: usize,
    pub rejected_mfe: usize,
}

impl FilterReport {
    fn record(&mut self, rejection: Rejection) {
        let counter = match rejection {
            Rejection::Length => &mut self.rejected_length,
            Rejection::GcContent => &mut self.rejected_gc,
            Rejection::Homopolymer => &mut self.rejected_homopolymer,
            Rejection::FoldFailed => &mut self.fold_failures,
            Rejection::Structure => &mut self.rejected_structure,
            Rejection::Confidence => &mut self.rejected_confidence,
            Rejection::EnsembleDiversity => &mut self.rejected_diversity,
            Rejection::FreeEnergy => &mut self.rejected_mfe,
        };
        *counter += 1;
    }

    pub fn rejected(&self) -> usize {
        self.examined - self.accepted
    }
}

/// Tests that need only the sequence. Run before folding to spare oracle calls.
pub fn check_sequence(
    sequence: &Sequence,
    wild_type: &Sequence,
    config: &FilterConfig,
) -> Result<(), Rejection> {
    if sequence.len() != wild_type.len() {
        return Err(Rejection::Length);
    }
    let (gc_min, gc_max) = config.gc_content_range;
    let gc = sequence.gc_content();
    if gc < gc_min || gc > gc_max {
        return Err(Rejection::GcContent);
    }
    if sequence.max_homopolymer_run() > config.max_homopolymer_run {
        return Err(Rejection::Homopolymer);
    }
    Ok(())
}

/// Tests on the fold: structure match, confidence, then the optional ensemble
/// diversity and free-energy limits.
pub fn check_fold(
    fold: &FoldResult,
    wild_type: &WildType,
    config: &FilterConfig,
) -> Result<(), Rejection> {
    let distance = fold
        .structure
        .base_pair_distance(&wild_type.structure)
        .map_err(|_| Rejection::Structure)?;
    if distance > config.structure_tolerance {
        return Err(Rejection::Structure);
    }
    if fold.confidence < config.min_confidence {
        return Err(Rejection::Confidence);
    }
    if let (Some(limit), Some(diversity)) = (config.max_ensemble_diversity, fold.ensemble_diversity)
    {
        if diversity > limit {
            return Err(Rejection::EnsembleDiversity);
        }
    }
    if let Some(tolerance) = config.mfe_tolerance {
        if (fold.mfe - wild_type.mfe).abs() > tolerance {
            return Err(Rejection::FreeEnergy);
        }
    }
    Ok(())
}

/// Folds the raw candidates and keeps those passing every test, in generation order.
///
/// Folds for candidates that pass the sequence tests are requested as one
/// batch (parallel when enabled); acceptance itself is decided sequentially.
#[instrument(skip_all, name = "structural_filter")]
pub fn run(context: &DesignContext, candidates: Vec<RawCandidate>) -> (CandidatePool, FilterReport) {
    let config = &context.config.filter;
    let wild_type = context.wild_type;

    context.reporter.report(Progress::PhaseStart {
        name: "Structural Filter",
    });
    context.reporter.report(Progress::TaskStart {
        total_steps: candidates.len() as u64,
    });

    let sequence_checks: Vec<Result<(), Rejection>> = candidates
        .iter()
        .map(|c| check_sequence(&c.sequence, &wild_type.sequence, config))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let iterator = candidates.iter().zip(&sequence_checks);

    #[cfg(feature = "parallel")]
    let iterator = candidates.par_iter().zip(&sequence_checks);

    let folds: Vec<Option<Result<FoldResult, OracleError>>> = iterator
        .map(|(candidate, check)| {
            let fold = check.is_ok().then(|| context.client.fold(&candidate.sequence));
            context.reporter.report(Progress::TaskIncrement);
            fold
        })
        .collect();

    context.reporter.report(Progress::TaskFinish);

    let mut pool = CandidatePool::with_capacity(candidates.len());
    let mut report = FilterReport {
        examined: candidates.len(),
        ..FilterReport::default()
    };

    for ((candidate, check), fold) in candidates.into_iter().zip(sequence_checks).zip(folds) {
        let outcome = check.and_then(|()| match fold {
            Some(Ok(fold)) => check_fold(&fold, wild_type, config).map(|()| fold),
            Some(Err(e)) => {
                debug!(sequence = %candidate.sequence, error = %e, "Fold failed, candidate skipped.");
                Err(Rejection::FoldFailed)
            }
            None => Err(Rejection::FoldFailed),
        });
        match outcome {
            Ok(fold) => {
                pool.push(enrich(context, candidate, fold));
            }
            Err(rejection) => {
                trace!(sequence = %candidate.sequence, reason = %rejection, "Candidate rejected.");
                report.record(rejection);
            }
        }
    }
    report.accepted = pool.len();

    info!(
        examined = report.examined,
        accepted = report.accepted,
        structure = report.rejected_structure,
        gc = report.rejected_gc,
        homopolymer = report.rejected_homopolymer,
        confidence = report.rejected_confidence,
        fold_failures = report.fold_failures,
        "Structural filter finished."
    );
    context.reporter.report(Progress::PhaseFinish);
    (pool, report)
}

fn enrich(context: &DesignContext, candidate: RawCandidate, fold: FoldResult) -> Variant {
    let wild_type = &context.wild_type.sequence;
    let sequence = candidate.sequence;
    let lmax_to_wild_type = context
        .metrics
        .get_or_compute(&CacheKey::wild_type_lmax(&sequence), || {
            Ok::<_, Infallible>(longest_common_substring(sequence.bases(), wild_type.bases()))
        })
        .unwrap_or_else(|never| match never {});

    Variant {
        metrics: VariantMetrics {
            gc_content: sequence.gc_content(),
            max_homopolymer_run: sequence.max_homopolymer_run(),
            hamming_to_wild_type: hamming_distance(sequence.bases(), wild_type.bases()),
            lmax_to_wild_type,
            lmax_to_pool: None,
        },
        sequence,
        structure: fold.structure,
        mfe: fold.mfe,
        confidence: fold.confidence,
        ensemble_diversity: fold.ensemble_diversity,
        run_index: candidate.run_index,
        strategy: candidate.strategy,
    }
}
