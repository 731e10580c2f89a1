//! Per-position mutation tolerance.
//!
//! A [`ConservationProfile`] scores each scaffold position in `[0, 1]`: high
//! scores mark positions that can change without breaking the fold, low scores
//! mark positions that should be left alone. Profiles come either from an
//! accepted pool ([`profile`]) or from an exhaustive point-mutation scan of the
//! wild type ([`scan_point_mutations`]).

use crate::core::models::pool::CandidatePool;
use crate::core::models::sequence::{Base, Sequence};
use crate::engine::context::DesignContext;
use crate::engine::error::EngineError;
use crate::engine::progress::Progress;
use crate::engine::state::WildType;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Conservation profile is empty")]
    Empty,
    #[error("Tolerance {value} at position {position} is outside [0, 1]")]
    OutOfRange { position: usize, value: f64 },
    #[error("Profile covers {found} positions, scaffold has {expected}")]
    LengthMismatch { expected: usize, found: usize },
    #[error("Profile rows are not in position order at row {row}")]
    OutOfOrder { row: usize },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConservationProfile {
    tolerances: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ProfileRecord {
    position: usize,
    base: char,
    tolerance: f64,
}

impl ConservationProfile {
    /// Every position equally tolerant.
    pub fn uniform(length: usize) -> Self {
        Self {
            tolerances: vec![1.0; length],
        }
    }

    pub fn from_scores(tolerances: Vec<f64>) -> Result<Self, ProfileError> {
        if tolerances.is_empty() {
            return Err(ProfileError::Empty);
        }
        if let Some((position, &value)) = tolerances
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || !(0.0..=1.0).contains(*v))
        {
            return Err(ProfileError::OutOfRange { position, value });
        }
        Ok(Self { tolerances })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tolerances.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tolerances.is_empty()
    }

    pub fn tolerance(&self, position: usize) -> Option<f64> {
        self.tolerances.get(position).copied()
    }

    pub fn conservation(&self, position: usize) -> Option<f64> {
        self.tolerance(position).map(|t| 1.0 - t)
    }

    pub fn scores(&self) -> &[f64] {
        &self.tolerances
    }

    pub fn check_length(&self, expected: usize) -> Result<(), ProfileError> {
        if self.len() != expected {
            return Err(ProfileError::LengthMismatch {
                expected,
                found: self.len(),
            });
        }
        Ok(())
    }

    /// Writes `position,base,tolerance` rows using the wild-type bases.
    pub fn write_csv<W: Write>(&self, wild_type: &Sequence, writer: W) -> Result<(), ProfileError> {
        self.check_length(wild_type.len())?;
        let mut csv_writer = csv::Writer::from_writer(writer);
        for (position, (&tolerance, base)) in
            self.tolerances.iter().zip(wild_type.bases()).enumerate()
        {
            csv_writer.serialize(ProfileRecord {
                position,
                base: base.to_char(),
                tolerance,
            })?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn read_csv<R: Read>(reader: R) -> Result<Self, ProfileError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut tolerances = Vec::new();
        for (row, record) in csv_reader.deserialize().enumerate() {
            let record: ProfileRecord = record?;
            if record.position != row {
                return Err(ProfileError::OutOfOrder { row });
            }
            tolerances.push(record.tolerance);
        }
        Self::from_scores(tolerances)
    }

    pub fn write_csv_path<P: AsRef<Path>>(
        &self,
        wild_type: &Sequence,
        path: P,
    ) -> Result<(), ProfileError> {
        self.write_csv(wild_type, File::create(path)?)
    }

    pub fn read_csv_path<P: AsRef<Path>>(path: P) -> Result<Self, ProfileError> {
        Self::read_csv(File::open(path)?)
    }
}

/// Estimates tolerance from how often each position differs from the wild type
/// among pool members whose structure stays within `structure_tolerance` base
/// pairs of the wild-type structure.
///
/// Scores are normalised so the most variable position is 1.0. Falls back to a
/// uniform profile when no member qualifies or no position varies.
#[instrument(skip_all, name = "conservation_profile")]
pub fn profile(
    pool: &CandidatePool,
    wild_type: &WildType,
    structure_tolerance: usize,
) -> ConservationProfile {
    let length = wild_type.len();
    let mut differing = vec![0usize; length];
    let mut matching = 0usize;

    for variant in pool.variants() {
        if variant.sequence.len() != length {
            continue;
        }
        let within = variant
            .structure
            .base_pair_distance(&wild_type.structure)
            .is_ok_and(|d| d <= structure_tolerance);
        if !within {
            continue;
        }
        matching += 1;
        for (count, (a, b)) in differing
            .iter_mut()
            .zip(variant.sequence.bases().iter().zip(wild_type.sequence.bases()))
        {
            if a != b {
                *count += 1;
            }
        }
    }

    if matching == 0 {
        warn!(
            pool_size = pool.len(),
            "No structure-matching variants to profile. Using a uniform profile."
        );
        return ConservationProfile::uniform(length);
    }

    let max = differing.iter().copied().max().unwrap_or(0);
    if max == 0 {
        warn!("No position varies across the pool. Using a uniform profile.");
        return ConservationProfile::uniform(length);
    }

    let tolerances = differing
        .iter()
        .map(|&count| count as f64 / max as f64)
        .collect();
    info!(matching, positions = length, "Conservation profile computed.");
    ConservationProfile { tolerances }
}

/// Folds every single point mutant of the wild type `conservation_attempts`
/// times and scores each position by the mean acceptance rate of its three
/// alternative bases.
///
/// Folds bypass the cache: repeated folds of one mutant sample the oracle's
/// own variability.
#[instrument(skip_all, name = "point_mutation_scan")]
pub fn scan_point_mutations(context: &DesignContext) -> Result<ConservationProfile, EngineError> {
    let wild_type = context.wild_type;
    let attempts = context.config.generation.conservation_attempts;
    let length = wild_type.len();

    context.reporter.report(Progress::PhaseStart {
        name: "Point Mutation Scan",
    });
    context.reporter.report(Progress::TaskStart {
        total_steps: length as u64,
    });
    info!(
        positions = length,
        attempts, "Scanning single point mutants of the wild type."
    );

    #[cfg(not(feature = "parallel"))]
    let iterator = 0..length;

    #[cfg(feature = "parallel")]
    let iterator = (0..length).into_par_iter();

    let scores: Vec<Result<f64, EngineError>> = iterator
        .map(|position| {
            let score = score_position(context, position, attempts);
            context.reporter.report(Progress::TaskIncrement);
            score
        })
        .collect();

    context.reporter.report(Progress::TaskFinish);
    let tolerances = scores.into_iter().collect::<Result<Vec<_>, _>>()?;
    let profile = ConservationProfile::from_scores(tolerances)?;
    context.reporter.report(Progress::PhaseFinish);
    Ok(profile)
}

fn score_position(
    context: &DesignContext,
    position: usize,
    attempts: usize,
) -> Result<f64, EngineError> {
    let wild_type = context.wild_type;
    let current = wild_type
        .sequence
        .base(position)
        .ok_or_else(|| EngineError::Internal(format!("scan position {position} out of range")))?;

    let alternatives: Vec<Base> = current.alternatives().collect();
    let mut total = 0.0;
    for &alternative in &alternatives {
        let mutant = wild_type.sequence.with_substitution(position, alternative)?;
        let accepted = (0..attempts)
            .filter(|_| mutant_is_acceptable(context, &mutant))
            .count();
        total += accepted as f64 / attempts as f64;
    }
    Ok(total / alternatives.len() as f64)
}

fn mutant_is_acceptable(context: &DesignContext, mutant: &Sequence) -> bool {
    let filter = &context.config.filter;
    let (gc_min, gc_max) = filter.gc_content_range;
    let gc = mutant.gc_content();
    if gc < gc_min || gc > gc_max || mutant.max_homopolymer_run() > filter.max_homopolymer_run {
        return false;
    }
    let fold = match context.client.fold_uncached(mutant) {
        Ok(fold) => fold,
        Err(e) => {
            debug!(mutant = %mutant, error = %e, "Point mutant fold failed.");
            return false;
        }
    };
    let structure_ok = fold
        .structure
        .base_pair_distance(&context.wild_type.structure)
        .is_ok_and(|d| d <= filter.structure_tolerance);
    let mfe_ok = filter
        .mfe_tolerance
        .is_none_or(|tol| (fold.mfe - context.wild_type.mfe).abs() <= tol);
    structure_ok && mfe_ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::structure::Structure;
    use crate::core::models::variant::Variant;
    use crate::engine::config::DesignConfigBuilder;
    use crate::engine::cache::Cache;
    use crate::engine::oracle::OracleClient;
    use crate::engine::progress::ProgressReporter;
    use crate::engine::utils::seeding::SeedPlan;
    use crate::test_support::{MockOracle, fold_result, variant_from};
    use std::sync::Arc;

    fn wild_type(seq: &str, structure: &str) -> WildType {
        WildType::new(seq.parse().unwrap(), fold_result(structure, -2.0, 0.9))
    }

    fn folded(seq: &str, structure: &str) -> Variant {
        let mut v = variant_from(seq);
        v.structure = structure.parse::<Structure>().unwrap();
        v
    }

    #[test]
    fn profile_scores_positions_by_observed_variation() {
        let wt = wild_type("AAAA", "....");
        let pool: CandidatePool = vec![folded("CAAA", "...."), folded("CAAG", "....")]
            .into_iter()
            .collect();
        let p = profile(&pool, &wt, 0);
        assert_eq!(p.scores(), &[1.0, 0.0, 0.0, 0.5]);
        assert_eq!(p.conservation(1), Some(1.0));
    }

    #[test]
    fn profile_ignores_members_with_broken_structure() {
        let wt = wild_type("GAAAC", "(...)");
        let pool: CandidatePool = vec![folded("GAUAC", "(...)"), folded("CAAAC", ".....")]
            .into_iter()
            .collect();
        let p = profile(&pool, &wt, 0);
        assert_eq!(p.scores(), &[0.0, 0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn profile_of_empty_pool_is_uniform() {
        let wt = wild_type("GGGAAACCC", "(((...)))");
        let p = profile(&CandidatePool::new(), &wt, 0);
        assert_eq!(p, ConservationProfile::uniform(9));
    }

    #[test]
    fn from_scores_rejects_out_of_range_values() {
        assert!(matches!(
            ConservationProfile::from_scores(vec![0.2, 1.5]),
            Err(ProfileError::OutOfRange { position: 1, .. })
        ));
        assert!(matches!(
            ConservationProfile::from_scores(vec![]),
            Err(ProfileError::Empty)
        ));
    }

    #[test]
    fn csv_export_reads_back() {
        let wt: Sequence = "GGAU".parse().unwrap();
        let p = ConservationProfile::from_scores(vec![0.0, 0.25, 1.0, 0.5]).unwrap();
        let mut out = Vec::new();
        p.write_csv(&wt, &mut out).unwrap();
        let text = String::from_utf8(out.clone()).unwrap();
        assert!(text.starts_with("position,base,tolerance\n0,G,0.0\n"));
        assert_eq!(ConservationProfile::read_csv(out.as_slice()).unwrap(), p);
    }

    #[test]
    fn write_csv_rejects_length_mismatch() {
        let wt: Sequence = "GGAU".parse().unwrap();
        let p = ConservationProfile::uniform(3);
        assert!(matches!(
            p.write_csv(&wt, Vec::new()),
            Err(ProfileError::LengthMismatch {
                expected: 4,
                found: 3
            })
        ));
    }

    #[test]
    fn scan_marks_structure_breaking_positions_as_conserved() {
        // Any change at position 0 unfolds the hairpin; every other mutant keeps it.
        let oracle = MockOracle::with_fold(|s: &Sequence| {
            let structure = if s.base(0) == Some(Base::G) {
                "((((....))))"
            } else {
                "............"
            };
            Ok(fold_result(structure, -4.0, 0.9))
        });
        let client = OracleClient::new(Arc::new(oracle), Default::default());
        let config = DesignConfigBuilder::new()
            .wild_type("GCAUGAAACAUG".parse().unwrap())
            .group_size(1)
            .n_groups(1)
            .gc_content_range(0.0, 1.0)
            .conservation_attempts(2)
            .build()
            .unwrap();
        let wt = WildType::new(config.wild_type.clone(), fold_result("((((....))))", -4.0, 0.9));
        let reporter = ProgressReporter::new();
        let metrics = Cache::new();
        let context = DesignContext::new(&config, &client, &wt, SeedPlan::new(0, 1), &reporter, &metrics);

        let p = scan_point_mutations(&context).unwrap();
        assert_eq!(p.tolerance(0), Some(0.0));
        assert!(p.scores()[1..].iter().all(|&t| t > 0.0));
    }
}
