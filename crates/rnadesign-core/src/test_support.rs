use crate::core::models::sequence::Sequence;
use crate::core::models::structure::Structure;
use crate::core::models::variant::{GenerationStrategy, Variant, VariantMetrics};
use crate::core::oracle::{FoldResult, FoldingOracle, OracleError};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

type FoldFn = dyn Fn(&Sequence) -> Result<FoldResult, OracleError> + Send + Sync;

/// An accepted variant with an all-unpaired structure and default metrics.
pub(crate) fn variant_from(sequence: &str) -> Variant {
    let sequence: Sequence = sequence.parse().unwrap();
    let structure: Structure = ".".repeat(sequence.len()).parse().unwrap();
    Variant {
        metrics: VariantMetrics {
            gc_content: sequence.gc_content(),
            max_homopolymer_run: sequence.max_homopolymer_run(),
            hamming_to_wild_type: 0,
            lmax_to_wild_type: 0,
            lmax_to_pool: None,
        },
        sequence,
        structure,
        mfe: -1.0,
        confidence: 0.9,
        ensemble_diversity: None,
        run_index: 0,
        strategy: GenerationStrategy::ConservationGuided,
    }
}

pub(crate) fn fold_result(structure: &str, mfe: f64, confidence: f64) -> FoldResult {
    FoldResult {
        structure: structure.parse().unwrap(),
        mfe,
        confidence,
        ensemble_diversity: None,
    }
}

/// Deterministic oracle driven by a fold rule and a script of inverse-fold answers.
pub(crate) struct MockOracle {
    fold_fn: Box<FoldFn>,
    inverse_script: Mutex<VecDeque<Result<Sequence, OracleError>>>,
    fold_calls: AtomicUsize,
    inverse_calls: AtomicUsize,
}

impl MockOracle {
    pub(crate) fn with_fold<F>(fold_fn: F) -> Self
    where
        F: Fn(&Sequence) -> Result<FoldResult, OracleError> + Send + Sync + 'static,
    {
        Self {
            fold_fn: Box::new(fold_fn),
            inverse_script: Mutex::new(VecDeque::new()),
            fold_calls: AtomicUsize::new(0),
            inverse_calls: AtomicUsize::new(0),
        }
    }

    /// Folds every sequence to `structure` with the given confidence.
    pub(crate) fn folding_to(structure: &str, confidence: f64) -> Self {
        let structure = structure.to_string();
        Self::with_fold(move |_| Ok(fold_result(&structure, -3.0, confidence)))
    }

    pub(crate) fn with_inverse_script(self, script: Vec<Result<Sequence, OracleError>>) -> Self {
        *self.inverse_script.lock().unwrap() = script.into();
        self
    }

    pub(crate) fn fold_calls(&self) -> usize {
        self.fold_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn inverse_calls(&self) -> usize {
        self.inverse_calls.load(Ordering::SeqCst)
    }
}

impl FoldingOracle for MockOracle {
    fn fold(&self, sequence: &Sequence) -> Result<FoldResult, OracleError> {
        self.fold_calls.fetch_add(1, Ordering::SeqCst);
        (self.fold_fn)(sequence)
    }

    fn inverse_fold(&self, target: &Structure) -> Result<Sequence, OracleError> {
        self.inverse_calls.fetch_add(1, Ordering::SeqCst);
        self.inverse_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(OracleError::InverseFold {
                    target: target.to_string(),
                    reason: "script exhausted".to_string(),
                })
            })
    }
}
