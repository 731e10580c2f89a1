//! The secondary-structure prediction boundary.
//!
//! Folding and inverse folding are delegated to an external collaborator through
//! the [`FoldingOracle`] trait. Implementations are expected to be slow, may fail
//! for individual calls, and are not reproducible even when the library itself is
//! seeded. The library never shares its own random streams with an oracle.

use crate::core::models::sequence::Sequence;
use crate::core::models::structure::Structure;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct FoldResult {
    pub structure: Structure,
    /// Minimum free energy in kcal/mol.
    pub mfe: f64,
    /// Probability of the predicted structure in the thermodynamic ensemble, in `[0, 1]`.
    pub confidence: f64,
    /// Mean base-pair distance within the ensemble, when the oracle reports it.
    pub ensemble_diversity: Option<f64>,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum OracleError {
    #[error("Folding failed for '{sequence}': {reason}")]
    Fold { sequence: String, reason: String },

    #[error("Inverse folding failed for target '{target}': {reason}")]
    InverseFold { target: String, reason: String },

    #[error("Oracle returned invalid output: {0}")]
    InvalidOutput(String),

    #[error("Oracle call '{operation}' exceeded the {limit_ms} ms timeout")]
    Timeout {
        operation: &'static str,
        limit_ms: u128,
    },

    #[error("Oracle is unavailable: {0}")]
    Unavailable(String),
}

pub trait FoldingOracle: Send + Sync {
    fn fold(&self, sequence: &Sequence) -> Result<FoldResult, OracleError>;

    fn inverse_fold(&self, target: &Structure) -> Result<Sequence, OracleError>;
}

/// Checks an oracle fold result against the sequence it was computed for.
pub fn validate_fold(sequence: &Sequence, result: &FoldResult) -> Result<(), OracleError> {
    if result.structure.len() != sequence.len() {
        return Err(OracleError::InvalidOutput(format!(
            "structure of length {} returned for sequence of length {}",
            result.structure.len(),
            sequence.len()
        )));
    }
    if !result.confidence.is_finite() || !(0.0..=1.0).contains(&result.confidence) {
        return Err(OracleError::InvalidOutput(format!(
            "confidence {} is outside [0, 1]",
            result.confidence
        )));
    }
    if !result.mfe.is_finite() {
        return Err(OracleError::InvalidOutput(format!(
            "free energy {} is not finite",
            result.mfe
        )));
    }
    Ok(())
}
