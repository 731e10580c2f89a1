use crate::core::models::sequence::{Base, Sequence};
use crate::core::models::variant::GenerationStrategy;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },
}

fn invalid(parameter: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        parameter,
        reason: reason.into(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationMethod {
    #[default]
    Auto,
    Inverse,
    Conservation,
}

impl GenerationMethod {
    /// Picks the concrete strategy for a scaffold of `length` bases.
    pub fn resolve(self, length: usize, auto_switch_length: usize) -> GenerationStrategy {
        match self {
            GenerationMethod::Inverse => GenerationStrategy::InverseFolding,
            GenerationMethod::Conservation => GenerationStrategy::ConservationGuided,
            GenerationMethod::Auto if length < auto_switch_length => {
                GenerationStrategy::InverseFolding
            }
            GenerationMethod::Auto => GenerationStrategy::ConservationGuided,
        }
    }
}

impl FromStr for GenerationMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(GenerationMethod::Auto),
            "inverse" => Ok(GenerationMethod::Inverse),
            "conservation" => Ok(GenerationMethod::Conservation),
            other => Err(invalid(
                "generation.method",
                format!("'{other}' is not one of auto, inverse, conservation"),
            )),
        }
    }
}

impl fmt::Display for GenerationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationMethod::Auto => write!(f, "auto"),
            GenerationMethod::Inverse => write!(f, "inverse"),
            GenerationMethod::Conservation => write!(f, "conservation"),
        }
    }
}

/// How many point mutations a conservation-guided candidate receives.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationCount {
    Fixed(usize),
    /// Relative weights for 1, 2, 3, ... mutations.
    Weighted(Vec<f64>),
}

impl Default for MutationCount {
    fn default() -> Self {
        MutationCount::Fixed(20)
    }
}

/// Relative preference for each replacement base.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MutationWeights {
    pub a: f64,
    pub c: f64,
    pub g: f64,
    pub u: f64,
}

impl MutationWeights {
    pub fn weight(&self, base: Base) -> f64 {
        match base {
            Base::A => self.a,
            Base::C => self.c,
            Base::G => self.g,
            Base::U => self.u,
        }
    }

    fn as_array(&self) -> [f64; 4] {
        [self.a, self.c, self.g, self.u]
    }
}

impl Default for MutationWeights {
    fn default() -> Self {
        Self {
            a: 1.0,
            c: 1.0,
            g: 1.0,
            u: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub method: GenerationMethod,
    pub auto_switch_length: usize,
    pub n_runs: usize,
    pub candidates_per_run: usize,
    /// Upper bound on inverse-fold calls within one run.
    pub inverse_max_attempts: usize,
    pub mutation_count: MutationCount,
    pub mutation_weights: MutationWeights,
    pub conservation_bias: f64,
    /// Extra generate/filter/profile rounds after the first.
    pub feedback_rounds: usize,
    /// Folds per point mutant in the wild-type scan.
    pub conservation_attempts: usize,
    pub initial_scan: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            method: GenerationMethod::Auto,
            auto_switch_length: 30,
            n_runs: 10,
            candidates_per_run: 500,
            inverse_max_attempts: 10_000,
            mutation_count: MutationCount::default(),
            mutation_weights: MutationWeights::default(),
            conservation_bias: 0.7,
            feedback_rounds: 0,
            conservation_attempts: 100,
            initial_scan: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterConfig {
    pub lmax_threshold: usize,
    /// Inclusive GC fraction bounds.
    pub gc_content_range: (f64, f64),
    pub max_homopolymer_run: usize,
    pub min_confidence: f64,
    /// Allowed base-pair distance from the wild-type structure.
    pub structure_tolerance: usize,
    pub max_ensemble_diversity: Option<f64>,
    /// Allowed absolute MFE deviation from the wild type, kcal/mol.
    pub mfe_tolerance: Option<f64>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            lmax_threshold: 10,
            gc_content_range: (0.40, 0.60),
            max_homopolymer_run: 3,
            min_confidence: 0.7,
            structure_tolerance: 0,
            max_ensemble_diversity: Some(20.0),
            mfe_tolerance: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupingConfig {
    pub group_size: usize,
    pub n_groups: usize,
    pub max_iterations: usize,
    pub improvement_tolerance: f64,
    pub inter_weight: f64,
    pub kmeans_max_iterations: usize,
}

impl GroupingConfig {
    pub fn required_variants(&self) -> usize {
        self.group_size * self.n_groups
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OracleCallConfig {
    /// Additional attempts after a failed call.
    pub max_retries: usize,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DesignConfig {
    pub wild_type: Sequence,
    pub generation: GenerationConfig,
    pub filter: FilterConfig,
    pub grouping: GroupingConfig,
    pub oracle: OracleCallConfig,
    pub num_cores: Option<usize>,
    pub random_seed: Option<u64>,
    /// Cap on the pool handed to grouping; `None` keeps every accepted variant.
    pub target_variant_count: Option<usize>,
}

impl DesignConfig {
    pub fn strategy(&self) -> GenerationStrategy {
        self.generation
            .method
            .resolve(self.wild_type.len(), self.generation.auto_switch_length)
    }
}

#[derive(Default)]
pub struct DesignConfigBuilder {
    wild_type: Option<Sequence>,
    group_size: Option<usize>,
    n_groups: Option<usize>,
    generation: GenerationConfig,
    filter: FilterConfig,
    max_iterations: Option<usize>,
    improvement_tolerance: Option<f64>,
    inter_weight: Option<f64>,
    kmeans_max_iterations: Option<usize>,
    oracle: OracleCallConfig,
    num_cores: Option<usize>,
    random_seed: Option<u64>,
    target_variant_count: Option<usize>,
}

impl DesignConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wild_type(mut self, sequence: Sequence) -> Self {
        self.wild_type = Some(sequence);
        self
    }
    pub fn group_size(mut self, size: usize) -> Self {
        self.group_size = Some(size);
        self
    }
    pub fn n_groups(mut self, n: usize) -> Self {
        self.n_groups = Some(n);
        self
    }

    pub fn generation_method(mut self, method: GenerationMethod) -> Self {
        self.generation.method = method;
        self
    }
    pub fn auto_switch_length(mut self, length: usize) -> Self {
        self.generation.auto_switch_length = length;
        self
    }
    pub fn n_runs(mut self, n: usize) -> Self {
        self.generation.n_runs = n;
        self
    }
    pub fn candidates_per_run(mut self, n: usize) -> Self {
        self.generation.candidates_per_run = n;
        self
    }
    pub fn inverse_max_attempts(mut self, n: usize) -> Self {
        self.generation.inverse_max_attempts = n;
        self
    }
    pub fn mutation_count(mut self, count: MutationCount) -> Self {
        self.generation.mutation_count = count;
        self
    }
    pub fn mutation_weights(mut self, weights: MutationWeights) -> Self {
        self.generation.mutation_weights = weights;
        self
    }
    pub fn conservation_bias(mut self, bias: f64) -> Self {
        self.generation.conservation_bias = bias;
        self
    }
    pub fn feedback_rounds(mut self, rounds: usize) -> Self {
        self.generation.feedback_rounds = rounds;
        self
    }
    pub fn conservation_attempts(mut self, attempts: usize) -> Self {
        self.generation.conservation_attempts = attempts;
        self
    }
    pub fn initial_scan(mut self, enabled: bool) -> Self {
        self.generation.initial_scan = enabled;
        self
    }

    pub fn lmax_threshold(mut self, threshold: usize) -> Self {
        self.filter.lmax_threshold = threshold;
        self
    }
    pub fn gc_content_range(mut self, min: f64, max: f64) -> Self {
        self.filter.gc_content_range = (min, max);
        self
    }
    pub fn max_homopolymer_run(mut self, run: usize) -> Self {
        self.filter.max_homopolymer_run = run;
        self
    }
    pub fn min_confidence(mut self, confidence: f64) -> Self {
        self.filter.min_confidence = confidence;
        self
    }
    pub fn structure_tolerance(mut self, distance: usize) -> Self {
        self.filter.structure_tolerance = distance;
        self
    }
    pub fn max_ensemble_diversity(mut self, diversity: Option<f64>) -> Self {
        self.filter.max_ensemble_diversity = diversity;
        self
    }
    pub fn mfe_tolerance(mut self, tolerance: Option<f64>) -> Self {
        self.filter.mfe_tolerance = tolerance;
        self
    }

    pub fn max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = Some(iterations);
        self
    }
    pub fn improvement_tolerance(mut self, tolerance: f64) -> Self {
        self.improvement_tolerance = Some(tolerance);
        self
    }
    pub fn inter_weight(mut self, weight: f64) -> Self {
        self.inter_weight = Some(weight);
        self
    }
    pub fn kmeans_max_iterations(mut self, iterations: usize) -> Self {
        self.kmeans_max_iterations = Some(iterations);
        self
    }

    pub fn max_retries(mut self, retries: usize) -> Self {
        self.oracle.max_retries = retries;
        self
    }
    pub fn oracle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.oracle.timeout = timeout;
        self
    }
    pub fn num_cores(mut self, cores: Option<usize>) -> Self {
        self.num_cores = cores;
        self
    }
    pub fn random_seed(mut self, seed: Option<u64>) -> Self {
        self.random_seed = seed;
        self
    }
    pub fn target_variant_count(mut self, count: Option<usize>) -> Self {
        self.target_variant_count = count;
        self
    }

    pub fn build(self) -> Result<DesignConfig, ConfigError> {
        let wild_type = self
            .wild_type
            .ok_or(ConfigError::MissingParameter("wild_type"))?;
        let grouping = GroupingConfig {
            group_size: self
                .group_size
                .ok_or(ConfigError::MissingParameter("group_size"))?,
            n_groups: self
                .n_groups
                .ok_or(ConfigError::MissingParameter("n_groups"))?,
            max_iterations: self.max_iterations.unwrap_or(1000),
            improvement_tolerance: self.improvement_tolerance.unwrap_or(1e-9),
            inter_weight: self.inter_weight.unwrap_or(1.0),
            kmeans_max_iterations: self.kmeans_max_iterations.unwrap_or(100),
        };

        let config = DesignConfig {
            wild_type,
            generation: self.generation,
            filter: self.filter,
            grouping,
            oracle: self.oracle,
            num_cores: self.num_cores,
            random_seed: self.random_seed,
            target_variant_count: self.target_variant_count,
        };
        validate(&config)?;
        Ok(config)
    }
}

fn validate(config: &DesignConfig) -> Result<(), ConfigError> {
    let generation = &config.generation;
    let filter = &config.filter;
    let grouping = &config.grouping;

    if filter.lmax_threshold == 0 {
        return Err(invalid("filter.lmax_threshold", "must be greater than zero"));
    }
    let (gc_min, gc_max) = filter.gc_content_range;
    if !(0.0..=1.0).contains(&gc_min) || !(0.0..=1.0).contains(&gc_max) {
        return Err(invalid(
            "filter.gc_content_range",
            format!("bounds ({gc_min}, {gc_max}) must be fractions in [0, 1]"),
        ));
    }
    if gc_min > gc_max {
        return Err(invalid(
            "filter.gc_content_range",
            format!("minimum {gc_min} exceeds maximum {gc_max}"),
        ));
    }
    if filter.max_homopolymer_run == 0 {
        return Err(invalid("filter.max_homopolymer_run", "must be at least 1"));
    }
    if !(0.0..=1.0).contains(&filter.min_confidence) {
        return Err(invalid("filter.min_confidence", "must lie in [0, 1]"));
    }
    if filter.max_ensemble_diversity.is_some_and(|d| !d.is_finite() || d < 0.0) {
        return Err(invalid(
            "filter.max_ensemble_diversity",
            "must be a non-negative number",
        ));
    }
    if filter.mfe_tolerance.is_some_and(|t| !t.is_finite() || t < 0.0) {
        return Err(invalid("filter.mfe_tolerance", "must be a non-negative number"));
    }

    if generation.n_runs == 0 {
        return Err(invalid("generation.n_runs", "must be at least 1"));
    }
    if generation.candidates_per_run == 0 {
        return Err(invalid("generation.candidates_per_run", "must be at least 1"));
    }
    if !(0.0..=1.0).contains(&generation.conservation_bias) {
        return Err(invalid("generation.conservation_bias", "must lie in [0, 1]"));
    }
    match &generation.mutation_count {
        MutationCount::Fixed(0) => {
            return Err(invalid("generation.mutation_count", "must be at least 1"));
        }
        MutationCount::Weighted(weights) => {
            if weights.is_empty()
                || weights.iter().any(|w| !w.is_finite() || *w < 0.0)
                || weights.iter().sum::<f64>() <= 0.0
            {
                return Err(invalid(
                    "generation.mutation_count",
                    "weights must be non-negative with a positive sum",
                ));
            }
        }
        MutationCount::Fixed(_) => {}
    }
    let base_weights = generation.mutation_weights.as_array();
    if base_weights.iter().any(|w| !w.is_finite() || *w < 0.0) || base_weights.iter().sum::<f64>() <= 0.0 {
        return Err(invalid(
            "generation.mutation_weights",
            "weights must be non-negative with a positive sum",
        ));
    }
    if generation.initial_scan && generation.conservation_attempts == 0 {
        return Err(invalid(
            "generation.conservation_attempts",
            "must be at least 1 when the initial scan is enabled",
        ));
    }

    if grouping.group_size == 0 {
        return Err(invalid("grouping.group_size", "must be at least 1"));
    }
    if grouping.n_groups == 0 {
        return Err(invalid("grouping.n_groups", "must be at least 1"));
    }
    if !grouping.improvement_tolerance.is_finite() || grouping.improvement_tolerance < 0.0 {
        return Err(invalid(
            "grouping.improvement_tolerance",
            "must be a non-negative number",
        ));
    }
    if !grouping.inter_weight.is_finite() || grouping.inter_weight < 0.0 {
        return Err(invalid("grouping.inter_weight", "must be a non-negative number"));
    }

    if config.num_cores == Some(0) {
        return Err(invalid("num_cores", "must be at least 1"));
    }
    if let Some(target) = config.target_variant_count {
        if target < grouping.required_variants() {
            return Err(invalid(
                "target_variant_count",
                format!(
                    "{target} is smaller than group_size * n_groups = {}",
                    grouping.required_variants()
                ),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_builder() -> DesignConfigBuilder {
        DesignConfigBuilder::new()
            .wild_type("GGGAAACCC".parse().unwrap())
            .group_size(2)
            .n_groups(2)
    }

    #[test]
    fn build_applies_defaults() {
        let config = base_builder().build().unwrap();
        assert_eq!(config.filter.lmax_threshold, 10);
        assert_eq!(config.filter.gc_content_range, (0.40, 0.60));
        assert_eq!(config.generation.n_runs, 10);
        assert_eq!(config.generation.auto_switch_length, 30);
        assert_eq!(config.grouping.max_iterations, 1000);
        assert_eq!(config.random_seed, None);
    }

    #[test]
    fn build_requires_wild_type_and_group_shape() {
        let err = DesignConfigBuilder::new().group_size(2).n_groups(1).build();
        assert_eq!(err.unwrap_err(), ConfigError::MissingParameter("wild_type"));

        let err = DesignConfigBuilder::new()
            .wild_type("ACGU".parse().unwrap())
            .n_groups(1)
            .build();
        assert_eq!(err.unwrap_err(), ConfigError::MissingParameter("group_size"));
    }

    #[test]
    fn build_rejects_inverted_gc_range() {
        let err = base_builder().gc_content_range(0.6, 0.4).build().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                parameter: "filter.gc_content_range",
                ..
            }
        ));
    }

    #[test]
    fn build_rejects_zero_lmax_threshold() {
        let err = base_builder().lmax_threshold(0).build().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                parameter: "filter.lmax_threshold",
                ..
            }
        ));
    }

    #[test]
    fn build_rejects_target_below_group_requirement() {
        let err = base_builder()
            .target_variant_count(Some(3))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                parameter: "target_variant_count",
                ..
            }
        ));
    }

    #[test]
    fn build_rejects_degenerate_mutation_weights() {
        let zero = MutationWeights {
            a: 0.0,
            c: 0.0,
            g: 0.0,
            u: 0.0,
        };
        assert!(base_builder().mutation_weights(zero).build().is_err());
        assert!(
            base_builder()
                .mutation_count(MutationCount::Weighted(vec![0.0, 0.0]))
                .build()
                .is_err()
        );
    }

    #[test]
    fn auto_method_switches_on_scaffold_length() {
        assert_eq!(
            GenerationMethod::Auto.resolve(20, 30),
            GenerationStrategy::InverseFolding
        );
        assert_eq!(
            GenerationMethod::Auto.resolve(30, 30),
            GenerationStrategy::ConservationGuided
        );
        assert_eq!(
            GenerationMethod::Inverse.resolve(100, 30),
            GenerationStrategy::InverseFolding
        );
    }

    #[test]
    fn generation_method_parses_case_insensitively() {
        assert_eq!("Conservation".parse::<GenerationMethod>(), Ok(GenerationMethod::Conservation));
        assert!("random".parse::<GenerationMethod>().is_err());
    }
}
