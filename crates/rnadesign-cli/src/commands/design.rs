use crate::cli::DesignArgs;
use crate::config::{self, AppConfig};
use crate::error::{CliError, Result};
use crate::oracle::ViennaRnaOracle;
use crate::utils::progress::CliProgressHandler;
use rnadesign::core::io::fasta::{FastaFile, group_records, pool_records};
use rnadesign::core::io::traits::SequenceFile;
use rnadesign::core::oracle::FoldingOracle;
use rnadesign::engine::cache::FoldCache;
use rnadesign::engine::error::EngineError;
use rnadesign::engine::oracle::OracleClient;
use rnadesign::engine::progress::ProgressReporter;
use rnadesign::workflows::design::{self, DesignResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub fn run(args: DesignArgs, quiet: bool) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let app = config::build_config(&args)?;

    let oracle = ViennaRnaOracle::new(&app.oracle.rnafold, &app.oracle.rnainverse)
        .with_temperature(app.oracle.temperature);
    let version = oracle.check_available().map_err(EngineError::Oracle)?;
    info!("Using ViennaRNA: {}", version);

    let progress_handler = if quiet {
        CliProgressHandler::hidden()
    } else {
        CliProgressHandler::new()
    };

    println!(
        "Designing {} group(s) of {} variants for a {}-nt scaffold...",
        app.core_config.grouping.n_groups,
        app.core_config.grouping.group_size,
        app.core_config.wild_type.len()
    );
    let result = execute(&app, Arc::new(oracle), &progress_handler)?;

    let written = write_outputs(&result, &app.output_dir)?;
    print_summary(&result);
    for path in &written {
        println!("  wrote {}", path.display());
    }
    Ok(())
}

/// Runs the workflow against `oracle`, loading and saving the fold cache
/// around it when one is configured.
pub fn execute(
    app: &AppConfig,
    oracle: Arc<dyn FoldingOracle>,
    progress_handler: &CliProgressHandler,
) -> Result<DesignResult> {
    let cache = Arc::new(FoldCache::new());
    if let Some(path) = app.cache_file.as_deref().filter(|p| p.exists()) {
        let loaded = cache.load_csv(path).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        info!("Loaded {} cached fold(s) from {:?}", loaded, path);
    }

    let client = OracleClient::with_cache(oracle, Arc::clone(&cache), app.core_config.oracle.clone());
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    info!("Invoking the core design workflow...");
    let outcome = design::run(&app.core_config, &client, &reporter);

    // Folds are worth keeping even when the run itself failed.
    if let Some(path) = app.cache_file.as_deref() {
        match cache.save_csv(path) {
            Ok(saved) => info!("Saved {} fold(s) to {:?}", saved, path),
            Err(e) => warn!("Failed to save fold cache to {:?}: {}", path, e),
        }
    }

    outcome.map_err(CliError::from)
}

/// Writes `variants.fasta`, one `group_{g}.fasta` per group, and
/// `conservation.csv` when a profile exists. Returns the paths written.
pub fn write_outputs(result: &DesignResult, output_dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;
    let mut written = Vec::new();

    let variants_path = output_dir.join("variants.fasta");
    FastaFile::write_to_path(&pool_records(&result.pool), &variants_path).map_err(|e| {
        CliError::Output {
            path: variants_path.clone(),
            source: e.into(),
        }
    })?;
    written.push(variants_path);

    for group in &result.groups {
        let path = output_dir.join(format!("group_{}.fasta", group.index() + 1));
        FastaFile::write_to_path(&group_records(&result.pool, group), &path).map_err(|e| {
            CliError::Output {
                path: path.clone(),
                source: e.into(),
            }
        })?;
        written.push(path);
    }

    if let Some(profile) = &result.profile {
        let path = output_dir.join("conservation.csv");
        profile
            .write_csv_path(&result.wild_type.sequence, &path)
            .map_err(|e| CliError::Output {
                path: path.clone(),
                source: e.into(),
            })?;
        written.push(path);
    }

    info!("Wrote {} output file(s) to {:?}", written.len(), output_dir);
    Ok(written)
}

fn print_summary(result: &DesignResult) {
    let report = &result.report;
    println!("Design complete (seed {}, {}).", report.master_seed, report.strategy);
    println!(
        "  wild type  : {} ({:.2} kcal/mol)",
        result.wild_type.structure, result.wild_type.mfe
    );
    for round in &report.rounds {
        println!(
            "  round {:>3}  : {} generated, {} folded, {} non-repetitive, pool {}",
            round.round + 1,
            round.generation.unique,
            round.structural.accepted,
            round.lmax.accepted,
            round.pool_size
        );
    }
    if report.subset_dropped > 0 {
        println!("  subset     : dropped {} variant(s)", report.subset_dropped);
    }
    let diversity = &report.group_diversity;
    println!(
        "  hamming    : intra {:.2}, inter {:.2}",
        diversity.mean_intra_hamming, diversity.mean_inter_hamming
    );
    println!(
        "  lmax       : intra {:.2}, inter {:.2}",
        diversity.mean_intra_lmax, diversity.mean_inter_lmax
    );
    println!(
        "  fold cache : {} hit(s), {} miss(es)",
        report.cache.hits, report.cache.misses
    );
}
