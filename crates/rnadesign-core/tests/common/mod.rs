#![allow(dead_code)]

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rnadesign::core::models::sequence::{Base, Sequence};
use rnadesign::core::models::structure::Structure;
use rnadesign::core::oracle::{FoldResult, FoldingOracle, OracleError};
use rnadesign::engine::config::{DesignConfigBuilder, GenerationMethod};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const SCAFFOLD: &str = "GUGAACUGCCGAGUAGGUAGCUGAUAAC";

/// Folds every sequence to an unpaired structure of its own length and
/// answers inverse folds from a fixed list, cycling in call order.
pub struct UnpairedOracle {
    designs: Vec<Sequence>,
    next_design: Mutex<usize>,
    folds: AtomicUsize,
}

impl UnpairedOracle {
    pub fn new() -> Self {
        Self::with_designs(Vec::new())
    }

    pub fn with_designs(designs: Vec<Sequence>) -> Self {
        Self {
            designs,
            next_design: Mutex::new(0),
            folds: AtomicUsize::new(0),
        }
    }

    pub fn folds(&self) -> usize {
        self.folds.load(Ordering::SeqCst)
    }
}

impl FoldingOracle for UnpairedOracle {
    fn fold(&self, sequence: &Sequence) -> Result<FoldResult, OracleError> {
        self.folds.fetch_add(1, Ordering::SeqCst);
        Ok(FoldResult {
            structure: ".".repeat(sequence.len()).parse().unwrap(),
            mfe: -2.0,
            confidence: 0.9,
            ensemble_diversity: Some(1.5),
        })
    }

    fn inverse_fold(&self, target: &Structure) -> Result<Sequence, OracleError> {
        if self.designs.is_empty() {
            return Err(OracleError::InverseFold {
                target: target.to_string(),
                reason: "no designs".to_string(),
            });
        }
        let mut next = self.next_design.lock().unwrap();
        let design = self.designs[*next % self.designs.len()].clone();
        *next += 1;
        Ok(design)
    }
}

pub fn random_sequences(count: usize, length: usize, seed: u64) -> Vec<Sequence> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let bases = (0..length)
                .map(|_| Base::ALL[rng.gen_range(0..4)])
                .collect();
            Sequence::from_bases(bases).unwrap()
        })
        .collect()
}

/// A conservation-guided configuration small enough for tests.
pub fn conservation_builder() -> DesignConfigBuilder {
    DesignConfigBuilder::new()
        .wild_type(SCAFFOLD.parse().unwrap())
        .group_size(2)
        .n_groups(2)
        .generation_method(GenerationMethod::Conservation)
        .n_runs(4)
        .candidates_per_run(25)
        .gc_content_range(0.3, 0.7)
        .max_homopolymer_run(4)
        .lmax_threshold(12)
        .random_seed(Some(7))
}
