use super::defaults::DefaultsConfig;
use super::file::{FileConfig, FileLimit};
use super::models::{AppConfig, OracleSettings};
use crate::cli::DesignArgs;
use crate::error::{CliError, Result};
use rnadesign::core::models::sequence::Sequence;
use rnadesign::engine::config::{self as core_config, DesignConfigBuilder, GenerationMethod};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

fn set<T>(
    builder: DesignConfigBuilder,
    value: Option<T>,
    setter: impl FnOnce(DesignConfigBuilder, T) -> DesignConfigBuilder,
) -> DesignConfigBuilder {
    match value {
        Some(v) => setter(builder, v),
        None => builder,
    }
}

pub fn build_config(args: &DesignArgs) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = if let Some(config_path) = &args.config {
        FileConfig::from_file(config_path)?
    } else {
        FileConfig::default()
    };

    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let scaffold_file = file_config.scaffold.take().unwrap_or_default();
    let generation_file = file_config.generation.take().unwrap_or_default();
    let filter_file = file_config.filter.take().unwrap_or_default();
    let grouping_file = file_config.grouping.take().unwrap_or_default();
    let oracle_file = file_config.oracle.take().unwrap_or_default();
    let run_file = file_config.run.take().unwrap_or_default();

    let scaffold = args
        .scaffold
        .as_deref()
        .or(scaffold_file.wild_type.as_deref())
        .unwrap_or(&defaults.wild_type);
    let wild_type: Sequence = scaffold
        .parse()
        .map_err(|e| CliError::Config(format!("Invalid wild-type scaffold '{scaffold}': {e}")))?;

    let method = match (args.mode, generation_file.method.as_deref()) {
        (Some(mode), _) => Some(mode),
        (None, Some(name)) => Some(
            name.parse::<GenerationMethod>()
                .map_err(|e| CliError::Config(e.to_string()))?,
        ),
        (None, None) => None,
    };

    let mutation_count = match (
        generation_file.mutation_count_weights,
        generation_file.mutation_count,
    ) {
        (Some(weights), _) => Some(core_config::MutationCount::Weighted(weights)),
        (None, Some(count)) => Some(core_config::MutationCount::Fixed(count)),
        (None, None) => None,
    };
    let mutation_weights = generation_file
        .mutation_weights
        .map(|w| w.merge(core_config::MutationWeights::default()));

    let filter_defaults = core_config::FilterConfig::default();
    let max_ensemble_diversity = filter_file
        .max_ensemble_diversity
        .map(|limit| limit.resolve(filter_defaults.max_ensemble_diversity));
    let mfe_tolerance = filter_file
        .mfe_tolerance
        .map(|limit| limit.resolve(filter_defaults.mfe_tolerance));

    let initial_scan = if args.initial_scan {
        Some(true)
    } else {
        generation_file.initial_scan
    };

    let mut builder = DesignConfigBuilder::new()
        .wild_type(wild_type)
        .group_size(
            args.group_size
                .or(grouping_file.group_size)
                .unwrap_or(defaults.group_size),
        )
        .n_groups(
            args.n_groups
                .or(grouping_file.n_groups)
                .unwrap_or(defaults.n_groups),
        )
        .random_seed(args.seed.or(run_file.random_seed))
        .num_cores(run_file.num_cores)
        .target_variant_count(run_file.target_variant_count)
        .oracle_timeout(oracle_file.timeout_ms.map(Duration::from_millis));

    builder = set(builder, method, DesignConfigBuilder::generation_method);
    builder = set(
        builder,
        generation_file.auto_switch_length,
        DesignConfigBuilder::auto_switch_length,
    );
    builder = set(
        builder,
        args.n_runs.or(generation_file.n_runs),
        DesignConfigBuilder::n_runs,
    );
    builder = set(
        builder,
        generation_file.candidates_per_run,
        DesignConfigBuilder::candidates_per_run,
    );
    builder = set(
        builder,
        generation_file.inverse_max_attempts,
        DesignConfigBuilder::inverse_max_attempts,
    );
    builder = set(builder, mutation_count, DesignConfigBuilder::mutation_count);
    builder = set(builder, mutation_weights, DesignConfigBuilder::mutation_weights);
    builder = set(
        builder,
        generation_file.conservation_bias,
        DesignConfigBuilder::conservation_bias,
    );
    builder = set(
        builder,
        args.feedback_rounds.or(generation_file.feedback_rounds),
        DesignConfigBuilder::feedback_rounds,
    );
    builder = set(
        builder,
        generation_file.conservation_attempts,
        DesignConfigBuilder::conservation_attempts,
    );
    builder = set(builder, initial_scan, DesignConfigBuilder::initial_scan);

    builder = set(
        builder,
        args.lmax.or(filter_file.lmax_threshold),
        DesignConfigBuilder::lmax_threshold,
    );
    builder = set(builder, filter_file.gc_content_range, |b, (min, max)| {
        b.gc_content_range(min, max)
    });
    builder = set(
        builder,
        filter_file.max_homopolymer_run,
        DesignConfigBuilder::max_homopolymer_run,
    );
    builder = set(
        builder,
        filter_file.min_confidence,
        DesignConfigBuilder::min_confidence,
    );
    builder = set(
        builder,
        filter_file.structure_tolerance,
        DesignConfigBuilder::structure_tolerance,
    );
    builder = set(
        builder,
        max_ensemble_diversity,
        DesignConfigBuilder::max_ensemble_diversity,
    );
    builder = set(builder, mfe_tolerance, DesignConfigBuilder::mfe_tolerance);

    builder = set(
        builder,
        grouping_file.max_iterations,
        DesignConfigBuilder::max_iterations,
    );
    builder = set(
        builder,
        grouping_file.improvement_tolerance,
        DesignConfigBuilder::improvement_tolerance,
    );
    builder = set(
        builder,
        grouping_file.inter_weight,
        DesignConfigBuilder::inter_weight,
    );
    builder = set(
        builder,
        grouping_file.kmeans_max_iterations,
        DesignConfigBuilder::kmeans_max_iterations,
    );
    builder = set(builder, oracle_file.max_retries, DesignConfigBuilder::max_retries);

    let core_config = builder
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    let oracle = OracleSettings {
        rnafold: oracle_file
            .rnafold
            .unwrap_or_else(|| PathBuf::from(&defaults.rnafold)),
        rnainverse: oracle_file
            .rnainverse
            .unwrap_or_else(|| PathBuf::from(&defaults.rnainverse)),
        temperature: oracle_file.temperature,
    };

    Ok(AppConfig {
        core_config,
        output_dir: args
            .output
            .clone()
            .or(run_file.output_dir)
            .unwrap_or_else(|| PathBuf::from(&defaults.output_dir)),
        cache_file: args.cache_file.clone().or(run_file.cache_file),
        oracle,
    })
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid value for {}: {}", key, value)))
}

fn parse_limit(key: &str, value: &str) -> Result<FileLimit> {
    FileLimit::parse(value)
        .ok_or_else(|| CliError::Config(format!("Invalid value for {}: {}", key, value)))
}

/// Parses `MIN,MAX`.
fn parse_range(key: &str, value: &str) -> Result<(f64, f64)> {
    let (min, max) = value.split_once(',').ok_or_else(|| {
        CliError::Config(format!(
            "Invalid value for {}: {}. Expected MIN,MAX.",
            key, value
        ))
    })?;
    Ok((parse_value(key, min)?, parse_value(key, max)?))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    if set_values.is_empty() {
        return Ok(config);
    }
    for kv_pair in set_values {
        let Some((key, value)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };

        apply_section_value(&mut config, key, value)?;
    }
    Ok(config)
}

fn apply_section_value(config: &mut FileConfig, key: &str, value: &str) -> Result<()> {
    match key.split_once('.') {
        Some(("scaffold", "wild-type")) => {
            config
                .scaffold
                .get_or_insert_with(Default::default)
                .wild_type = Some(value.trim().to_string());
        }
        Some(("generation", field)) => {
            let generation = config.generation.get_or_insert_with(Default::default);
            match field {
                "method" => generation.method = Some(value.trim().to_string()),
                "n-runs" => generation.n_runs = Some(parse_value(key, value)?),
                "candidates-per-run" => {
                    generation.candidates_per_run = Some(parse_value(key, value)?)
                }
                "mutation-count" => generation.mutation_count = Some(parse_value(key, value)?),
                "conservation-bias" => {
                    generation.conservation_bias = Some(parse_value(key, value)?)
                }
                "feedback-rounds" => generation.feedback_rounds = Some(parse_value(key, value)?),
                "conservation-attempts" => {
                    generation.conservation_attempts = Some(parse_value(key, value)?)
                }
                "initial-scan" => generation.initial_scan = Some(parse_value(key, value)?),
                _ => return Err(unsupported(key)),
            }
        }
        Some(("filter", field)) => {
            let filter = config.filter.get_or_insert_with(Default::default);
            match field {
                "lmax-threshold" => filter.lmax_threshold = Some(parse_value(key, value)?),
                "gc-content-range" => filter.gc_content_range = Some(parse_range(key, value)?),
                "max-homopolymer-run" => {
                    filter.max_homopolymer_run = Some(parse_value(key, value)?)
                }
                "min-confidence" => filter.min_confidence = Some(parse_value(key, value)?),
                "structure-tolerance" => {
                    filter.structure_tolerance = Some(parse_value(key, value)?)
                }
                "max-ensemble-diversity" => {
                    filter.max_ensemble_diversity = Some(parse_limit(key, value)?)
                }
                "mfe-tolerance" => filter.mfe_tolerance = Some(parse_limit(key, value)?),
                _ => return Err(unsupported(key)),
            }
        }
        Some(("grouping", field)) => {
            let grouping = config.grouping.get_or_insert_with(Default::default);
            match field {
                "group-size" => grouping.group_size = Some(parse_value(key, value)?),
                "n-groups" => grouping.n_groups = Some(parse_value(key, value)?),
                "max-iterations" => grouping.max_iterations = Some(parse_value(key, value)?),
                "inter-weight" => grouping.inter_weight = Some(parse_value(key, value)?),
                _ => return Err(unsupported(key)),
            }
        }
        Some(("oracle", field)) => {
            let oracle = config.oracle.get_or_insert_with(Default::default);
            match field {
                "max-retries" => oracle.max_retries = Some(parse_value(key, value)?),
                "timeout-ms" => oracle.timeout_ms = Some(parse_value(key, value)?),
                "temperature" => oracle.temperature = Some(parse_value(key, value)?),
                _ => return Err(unsupported(key)),
            }
        }
        Some(("run", field)) => {
            let run = config.run.get_or_insert_with(Default::default);
            match field {
                "random-seed" => run.random_seed = Some(parse_value(key, value)?),
                "num-cores" => run.num_cores = Some(parse_value(key, value)?),
                "target-variant-count" => {
                    run.target_variant_count = Some(parse_value(key, value)?)
                }
                _ => return Err(unsupported(key)),
            }
        }
        _ => return Err(unsupported(key)),
    }
    Ok(())
}

fn unsupported(key: &str) -> CliError {
    CliError::Config(format!(
        "Unsupported configuration key for --set: '{}'",
        key
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rnadesign::core::models::variant::GenerationStrategy;
    use std::fs;
    use tempfile::tempdir;

    fn base_design_args() -> DesignArgs {
        DesignArgs {
            scaffold: None,
            config: None,
            output: None,
            mode: None,
            n_runs: None,
            feedback_rounds: None,
            initial_scan: false,
            seed: None,
            lmax: None,
            group_size: None,
            n_groups: None,
            cache_file: None,
            set_values: vec![],
        }
    }

    #[test]
    fn build_config_without_file_uses_defaults() {
        let app = build_config(&base_design_args()).expect("build ok");
        let defaults = DefaultsConfig::default();
        let cfg = app.core_config;

        assert_eq!(cfg.wild_type.to_string(), defaults.wild_type);
        assert_eq!(cfg.grouping.group_size, defaults.group_size);
        assert_eq!(cfg.grouping.n_groups, defaults.n_groups);
        assert_eq!(cfg.generation, core_config::GenerationConfig::default());
        assert_eq!(cfg.filter, core_config::FilterConfig::default());
        assert_eq!(cfg.random_seed, None);
        assert_eq!(app.output_dir, PathBuf::from(defaults.output_dir));
        assert_eq!(app.oracle.rnafold, PathBuf::from("RNAfold"));
        assert!(app.cache_file.is_none());
    }

    #[test]
    fn build_config_reads_file_and_merges() {
        let dir = tempdir().unwrap();
        let cfg_path = dir.path().join("config.toml");
        let toml = r#"
            [scaffold]
            wild-type = "gggaaacccuuuagggaaaccc"

            [generation]
            method = "inverse"
            n-runs = 3
            candidates-per-run = 40
            mutation-count = 4

            [filter]
            lmax-threshold = 7
            gc-content-range = [0.2, 0.8]
            max-ensemble-diversity = false

            [grouping]
            group-size = 5
            n-groups = 2
            inter-weight = 0.5

            [oracle]
            rnafold = "/opt/vienna/RNAfold"
            max-retries = 2
            timeout-ms = 1500

            [run]
            random-seed = 99
            output-dir = "designs"
        "#;
        fs::write(&cfg_path, toml).unwrap();

        let mut args = base_design_args();
        args.config = Some(cfg_path);

        let app = build_config(&args).expect("build ok");
        let cfg = &app.core_config;
        assert_eq!(cfg.wild_type.to_string(), "GGGAAACCCUUUAGGGAAACCC");
        assert_eq!(cfg.strategy(), GenerationStrategy::InverseFolding);
        assert_eq!(cfg.generation.n_runs, 3);
        assert_eq!(cfg.generation.candidates_per_run, 40);
        assert_eq!(
            cfg.generation.mutation_count,
            core_config::MutationCount::Fixed(4)
        );
        assert_eq!(cfg.filter.lmax_threshold, 7);
        assert_eq!(cfg.filter.gc_content_range, (0.2, 0.8));
        assert_eq!(cfg.filter.max_ensemble_diversity, None);
        assert_eq!(cfg.grouping.group_size, 5);
        assert_eq!(cfg.grouping.n_groups, 2);
        assert_eq!(cfg.grouping.inter_weight, 0.5);
        assert_eq!(cfg.oracle.max_retries, 2);
        assert_eq!(cfg.oracle.timeout, Some(Duration::from_millis(1500)));
        assert_eq!(cfg.random_seed, Some(99));
        assert_eq!(app.output_dir, PathBuf::from("designs"));
        assert_eq!(app.oracle.rnafold, PathBuf::from("/opt/vienna/RNAfold"));
        assert_eq!(app.oracle.rnainverse, PathBuf::from("RNAinverse"));
    }

    #[test]
    fn cli_overrides_set_values_which_override_file() {
        let dir = tempdir().unwrap();
        let cfg_path = dir.path().join("config.toml");
        fs::write(
            &cfg_path,
            "[filter]\nlmax-threshold = 7\n[generation]\nn-runs = 3\n[grouping]\ngroup-size = 4\n",
        )
        .unwrap();

        let mut args = base_design_args();
        args.config = Some(cfg_path);
        args.set_values = vec![
            "filter.lmax-threshold=9".to_string(),
            "generation.n-runs=6".to_string(),
        ];
        args.n_runs = Some(8);
        args.mode = Some(GenerationMethod::Conservation);

        let cfg = build_config(&args).unwrap().core_config;
        assert_eq!(cfg.filter.lmax_threshold, 9);
        assert_eq!(cfg.generation.n_runs, 8);
        assert_eq!(cfg.grouping.group_size, 4);
        assert_eq!(cfg.generation.method, GenerationMethod::Conservation);
    }

    #[test]
    fn weighted_mutation_count_takes_precedence() {
        let dir = tempdir().unwrap();
        let cfg_path = dir.path().join("config.toml");
        fs::write(
            &cfg_path,
            "[generation]\nmutation-count = 3\nmutation-count-weights = [1.0, 2.0]\n",
        )
        .unwrap();
        let mut args = base_design_args();
        args.config = Some(cfg_path);

        let cfg = build_config(&args).unwrap().core_config;
        assert_eq!(
            cfg.generation.mutation_count,
            core_config::MutationCount::Weighted(vec![1.0, 2.0])
        );
    }

    #[test]
    fn invalid_set_values_are_rejected() {
        let mut args = base_design_args();
        args.set_values = vec!["filter.lmax-threshold".to_string()];
        assert!(matches!(build_config(&args), Err(CliError::Config(_))));

        args.set_values = vec!["filter.bogus=1".to_string()];
        assert!(matches!(build_config(&args), Err(CliError::Config(_))));

        args.set_values = vec!["grouping.group-size=many".to_string()];
        assert!(matches!(build_config(&args), Err(CliError::Config(_))));
    }

    #[test]
    fn set_values_can_switch_off_optional_limits() {
        let mut args = base_design_args();
        args.set_values = vec![
            "filter.max-ensemble-diversity=off".to_string(),
            "filter.mfe-tolerance=1.5".to_string(),
            "filter.gc-content-range=0.25, 0.75".to_string(),
            "scaffold.wild-type=GGGAAACCCGGGAAACCC".to_string(),
        ];
        let cfg = build_config(&args).unwrap().core_config;
        assert_eq!(cfg.filter.max_ensemble_diversity, None);
        assert_eq!(cfg.filter.mfe_tolerance, Some(1.5));
        assert_eq!(cfg.filter.gc_content_range, (0.25, 0.75));
        assert_eq!(cfg.wild_type.len(), 18);
    }

    #[test]
    fn invalid_scaffold_and_core_validation_surface_as_config_errors() {
        let mut args = base_design_args();
        args.scaffold = Some("ACGX".to_string());
        assert!(matches!(build_config(&args), Err(CliError::Config(_))));

        let mut args = base_design_args();
        args.lmax = Some(0);
        assert!(matches!(build_config(&args), Err(CliError::Config(_))));

        let mut args = base_design_args();
        args.set_values = vec!["generation.method=sideways".to_string()];
        assert!(matches!(build_config(&args), Err(CliError::Config(_))));
    }
}
