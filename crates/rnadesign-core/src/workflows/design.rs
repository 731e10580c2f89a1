use crate::core::metrics::group_diversity;
use crate::core::models::group::Group;
use crate::core::models::pool::CandidatePool;
use crate::core::models::variant::GenerationStrategy;
use crate::engine::cache::Cache;
use crate::engine::config::DesignConfig;
use crate::engine::context::DesignContext;
use crate::engine::error::EngineError;
use crate::engine::oracle::OracleClient;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::state::{DesignReport, RoundSummary, WildType};
use crate::engine::tasks;
use crate::engine::tasks::conservation::ConservationProfile;
use crate::engine::tasks::lmax_filter::NonRepetitivenessFilter;
use crate::engine::utils::seeding::SeedPlan;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone)]
pub struct DesignResult {
    pub wild_type: WildType,
    /// The accepted pool handed to grouping, in acceptance order.
    pub pool: CandidatePool,
    pub groups: Vec<Group>,
    /// Profile computed from the final pool.
    pub profile: Option<ConservationProfile>,
    pub report: DesignReport,
}

/// Runs the full design pipeline.
///
/// When `num_cores` is set and the `parallel` feature is enabled, every stage
/// runs inside a dedicated thread pool of that size.
#[instrument(skip_all, name = "design_workflow")]
pub fn run(
    config: &DesignConfig,
    client: &OracleClient,
    reporter: &ProgressReporter,
) -> Result<DesignResult, EngineError> {
    #[cfg(feature = "parallel")]
    if let Some(threads) = config.num_cores {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| EngineError::Internal(format!("failed to build thread pool: {e}")))?;
        return pool.install(|| execute(config, client, reporter));
    }
    execute(config, client, reporter)
}

fn execute(
    config: &DesignConfig,
    client: &OracleClient,
    reporter: &ProgressReporter,
) -> Result<DesignResult, EngineError> {
    // === Phase 0: Reference fold and random streams ===
    reporter.report(Progress::PhaseStart {
        name: "Folding Wild Type",
    });
    let wild_type = fold_wild_type(config, client)?;
    reporter.report(Progress::PhaseFinish);

    let strategy = config.strategy();
    let seeds = SeedPlan::from_config(config.random_seed, config.generation.n_runs);
    info!(
        master_seed = seeds.master(),
        strategy = %strategy,
        length = wild_type.len(),
        "Starting design workflow."
    );
    if config.random_seed.is_none() {
        info!(
            master_seed = seeds.master(),
            "No seed configured, drew one from the operating system."
        );
    }
    if strategy == GenerationStrategy::InverseFolding {
        warn!("Inverse folding draws its randomness inside the oracle; candidates are not reproducible from the seed.");
    }

    let metrics = Cache::new();
    let context = DesignContext::new(config, client, &wild_type, seeds, reporter, &metrics);

    // === Phase 1: Optional point-mutation scan ===
    let mut profile = if config.generation.initial_scan {
        Some(tasks::conservation::scan_point_mutations(&context)?)
    } else {
        None
    };

    // === Phase 2: Generate / filter / profile rounds ===
    let (pool, rounds) = run_rounds(&context, strategy, &mut profile)?;

    if pool.is_empty() {
        return Err(EngineError::InsufficientCandidates {
            stage: "filtering",
            required: config.grouping.required_variants(),
            available: 0,
        });
    }

    // === Phase 3: Optional diverse subset ===
    let accepted = pool.len();
    let pool = match config.target_variant_count {
        Some(target) => tasks::grouping::select_diverse_subset(pool, target),
        None => pool,
    };
    let subset_dropped = accepted - pool.len();

    // === Phase 4: Grouping ===
    reporter.report(Progress::PhaseStart { name: "Grouping" });
    let mut rng = seeds.grouping_rng();
    let groups = tasks::grouping::group(&pool, &config.grouping, &mut rng)?;
    reporter.report(Progress::PhaseFinish);

    // === Phase 5: Diversity summary ===
    let group_sequences: Vec<_> = groups.iter().map(|g| g.sequences(&pool)).collect();
    let diversity = group_diversity(&group_sequences);

    let report = DesignReport {
        master_seed: seeds.master(),
        strategy,
        rounds,
        subset_dropped,
        group_diversity: diversity,
        cache: client.cache().stats(),
    };

    info!(
        pool_size = pool.len(),
        groups = groups.len(),
        mean_intra_hamming = report.group_diversity.mean_intra_hamming,
        mean_inter_hamming = report.group_diversity.mean_inter_hamming,
        cache_hits = report.cache.hits,
        cache_misses = report.cache.misses,
        "Design workflow complete."
    );

    Ok(DesignResult {
        wild_type,
        pool,
        groups,
        profile,
        report,
    })
}

fn fold_wild_type(config: &DesignConfig, client: &OracleClient) -> Result<WildType, EngineError> {
    let fold = client
        .fold(&config.wild_type)
        .map_err(|source| EngineError::WildTypeFold { source })?;
    if fold.confidence < config.filter.min_confidence {
        warn!(
            confidence = fold.confidence,
            threshold = config.filter.min_confidence,
            "Wild-type fold confidence is below the acceptance threshold."
        );
    }
    info!(structure = %fold.structure, mfe = fold.mfe, "Wild type folded.");
    Ok(WildType::new(config.wild_type.clone(), fold))
}

/// Rounds share one Lmax filter, so every round is filtered against the
/// survivors of all earlier rounds. A later round that yields nothing ends
/// the loop early; an empty first round is fatal.
fn run_rounds(
    context: &DesignContext,
    strategy: GenerationStrategy,
    profile: &mut Option<ConservationProfile>,
) -> Result<(CandidatePool, Vec<RoundSummary>), EngineError> {
    let config = context.config;
    let total = config.generation.feedback_rounds + 1;
    let mut lmax_filter =
        NonRepetitivenessFilter::new(&context.wild_type.sequence, config.filter.lmax_threshold);
    let mut pool = CandidatePool::new();
    let mut rounds = Vec::with_capacity(total);

    for round in 0..total {
        context.reporter.report(Progress::RoundStart { round, total });
        info!(round, total, "Starting round.");

        let (candidates, generation) =
            match tasks::generation::run(context, strategy, profile.as_ref(), round) {
                Ok(output) => output,
                Err(EngineError::InsufficientCandidates { .. }) if round > 0 => {
                    warn!(round, "Round produced no candidates, stopping feedback loop.");
                    break;
                }
                Err(e) => return Err(e),
            };

        let (filtered, structural) = tasks::structural_filter::run(context, candidates);
        let (survivors, lmax) = lmax_filter.filter(filtered);
        pool.extend(survivors.into_variants());

        rounds.push(RoundSummary {
            round,
            generation,
            structural,
            lmax,
            pool_size: pool.len(),
        });

        *profile = Some(tasks::conservation::profile(
            &pool,
            context.wild_type,
            config.filter.structure_tolerance,
        ));
        info!(round, pool_size = pool.len(), "Round finished.");
    }

    Ok((pool, rounds))
}
