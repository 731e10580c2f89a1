use crate::error::{CliError, Result};
use rnadesign::engine::config as core_config;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// An optional numeric limit: a number sets it, `false` switches it off.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(untagged)]
pub enum FileLimit {
    Value(f64),
    Enabled(bool),
}

impl FileLimit {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "off" | "none" | "false" => Some(FileLimit::Enabled(false)),
            other => other.parse().ok().map(FileLimit::Value),
        }
    }

    /// Resolves against the library default, which applies for `true`.
    pub fn resolve(self, default: Option<f64>) -> Option<f64> {
        match self {
            FileLimit::Value(v) => Some(v),
            FileLimit::Enabled(true) => default,
            FileLimit::Enabled(false) => None,
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct FileMutationWeights {
    pub a: Option<f64>,
    pub c: Option<f64>,
    pub g: Option<f64>,
    pub u: Option<f64>,
}

impl FileMutationWeights {
    pub fn merge(self, base: core_config::MutationWeights) -> core_config::MutationWeights {
        core_config::MutationWeights {
            a: self.a.unwrap_or(base.a),
            c: self.c.unwrap_or(base.c),
            g: self.g.unwrap_or(base.g),
            u: self.u.unwrap_or(base.u),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileScaffoldConfig {
    pub wild_type: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileGenerationConfig {
    pub method: Option<String>,
    pub auto_switch_length: Option<usize>,
    pub n_runs: Option<usize>,
    pub candidates_per_run: Option<usize>,
    pub inverse_max_attempts: Option<usize>,
    pub mutation_count: Option<usize>,
    /// Relative weights for 1, 2, 3, ... mutations; takes precedence over `mutation-count`.
    pub mutation_count_weights: Option<Vec<f64>>,
    pub mutation_weights: Option<FileMutationWeights>,
    pub conservation_bias: Option<f64>,
    pub feedback_rounds: Option<usize>,
    pub conservation_attempts: Option<usize>,
    pub initial_scan: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileFilterConfig {
    pub lmax_threshold: Option<usize>,
    pub gc_content_range: Option<(f64, f64)>,
    pub max_homopolymer_run: Option<usize>,
    pub min_confidence: Option<f64>,
    pub structure_tolerance: Option<usize>,
    pub max_ensemble_diversity: Option<FileLimit>,
    pub mfe_tolerance: Option<FileLimit>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileGroupingConfig {
    pub group_size: Option<usize>,
    pub n_groups: Option<usize>,
    pub max_iterations: Option<usize>,
    pub improvement_tolerance: Option<f64>,
    pub inter_weight: Option<f64>,
    pub kmeans_max_iterations: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileOracleConfig {
    pub rnafold: Option<PathBuf>,
    pub rnainverse: Option<PathBuf>,
    pub temperature: Option<f64>,
    pub max_retries: Option<usize>,
    pub timeout_ms: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileRunConfig {
    pub num_cores: Option<usize>,
    pub random_seed: Option<u64>,
    pub target_variant_count: Option<usize>,
    pub output_dir: Option<PathBuf>,
    pub cache_file: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub scaffold: Option<FileScaffoldConfig>,
    pub generation: Option<FileGenerationConfig>,
    pub filter: Option<FileFilterConfig>,
    pub grouping: Option<FileGroupingConfig>,
    pub oracle: Option<FileOracleConfig>,
    pub run: Option<FileRunConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}
