use thiserror::Error;

use super::cache::CacheError;
use super::config::ConfigError;
use super::tasks::conservation::ProfileError;
use super::utils::sampling::SamplingError;
use crate::core::models::group::PartitionError;
use crate::core::models::sequence::SequenceError;
use crate::core::oracle::OracleError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("Oracle failure: {0}")]
    Oracle(#[from] OracleError),

    #[error("Wild-type scaffold could not be folded: {source}")]
    WildTypeFold { source: OracleError },

    #[error(
        "Insufficient candidates after {stage}: {available} available, {required} required"
    )]
    InsufficientCandidates {
        stage: &'static str,
        required: usize,
        available: usize,
    },

    #[error(
        "Insufficient variants for {n_groups} group(s) of {group_size}: {available} available, {required} required"
    )]
    InsufficientVariants {
        required: usize,
        group_size: usize,
        n_groups: usize,
        available: usize,
    },

    #[error("Invalid group partition: {0}")]
    Partition(#[from] PartitionError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Conservation profile error: {0}")]
    Profile(#[from] ProfileError),

    #[error("Sampling failed: {0}")]
    Sampling(#[from] SamplingError),

    #[error("Sequence error: {0}")]
    Sequence(#[from] SequenceError),

    #[error("Internal logic error: {0}")]
    Internal(String),
}
