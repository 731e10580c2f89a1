//! The non-repetitiveness (Lmax) filter.
//!
//! Acceptance is greedy and order dependent: a candidate is kept only if it
//! shares no contiguous substring longer than the threshold with the wild type
//! or with any variant accepted before it, so earlier candidates take priority.
//! Two sequences share a substring longer than `t` exactly when they share a
//! `(t + 1)`-mer, which lets the test run against a k-mer index instead of a
//! pairwise scan of the accepted set.

use crate::core::metrics::longest_common_substring;
use crate::core::models::pool::CandidatePool;
use crate::core::models::sequence::{Base, Sequence};
use std::collections::HashSet;
use tracing::{info, instrument, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Clone, Default)]
pub struct KmerIndex {
    k: usize,
    kmers: HashSet<Box<[Base]>>,
}

impl KmerIndex {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            kmers: HashSet::new(),
        }
    }

    pub fn insert(&mut self, sequence: &Sequence) {
        if self.k == 0 {
            return;
        }
        for window in sequence.bases().windows(self.k) {
            if !self.kmers.contains(window) {
                self.kmers.insert(window.into());
            }
        }
    }

    /// Whether any k-mer of `sequence` is already indexed.
    pub fn shares_kmer(&self, sequence: &Sequence) -> bool {
        self.k > 0
            && sequence
                .bases()
                .windows(self.k)
                .any(|window| self.kmers.contains(window))
    }

    pub fn len(&self) -> usize {
        self.kmers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kmers.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LmaxReport {
    pub examined: usize,
    pub accepted: usize,
    pub rejected_wild_type: usize,
    pub rejected_pool: usize,
}

/// Stateful Lmax filter. Variants accepted in one call stay in the accepted
/// set for every later call, so successive rounds are filtered against all
/// earlier survivors.
#[derive(Debug, Clone)]
pub struct NonRepetitivenessFilter {
    threshold: usize,
    wild_type_index: KmerIndex,
    pool_index: KmerIndex,
    accepted: Vec<Sequence>,
}

impl NonRepetitivenessFilter {
    pub fn new(wild_type: &Sequence, threshold: usize) -> Self {
        let mut wild_type_index = KmerIndex::new(threshold + 1);
        wild_type_index.insert(wild_type);
        Self {
            threshold,
            wild_type_index,
            pool_index: KmerIndex::new(threshold + 1),
            accepted: Vec::new(),
        }
    }

    #[inline]
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn accepted(&self) -> &[Sequence] {
        &self.accepted
    }

    pub fn would_accept(&self, sequence: &Sequence) -> bool {
        !self.wild_type_index.shares_kmer(sequence) && !self.pool_index.shares_kmer(sequence)
    }

    fn max_lmax_to_accepted(&self, sequence: &Sequence) -> usize {
        #[cfg(not(feature = "parallel"))]
        let iterator = self.accepted.iter();

        #[cfg(feature = "parallel")]
        let iterator = self.accepted.par_iter();

        iterator
            .map(|other| longest_common_substring(sequence.bases(), other.bases()))
            .max()
            .unwrap_or(0)
    }

    /// Filters `pool` in order, returning the survivors with `lmax_to_pool` set.
    #[instrument(skip_all, name = "lmax_filter", fields(threshold = self.threshold))]
    pub fn filter(&mut self, pool: CandidatePool) -> (CandidatePool, LmaxReport) {
        let mut report = LmaxReport {
            examined: pool.len(),
            ..LmaxReport::default()
        };
        let mut survivors = CandidatePool::with_capacity(pool.len());

        for variant in pool.into_variants() {
            if self.wild_type_index.shares_kmer(&variant.sequence) {
                trace!(sequence = %variant.sequence, "Rejected: repeat shared with wild type.");
                report.rejected_wild_type += 1;
                continue;
            }
            if self.pool_index.shares_kmer(&variant.sequence) {
                trace!(sequence = %variant.sequence, "Rejected: repeat shared with accepted pool.");
                report.rejected_pool += 1;
                continue;
            }
            let lmax_to_pool = self.max_lmax_to_accepted(&variant.sequence);
            self.pool_index.insert(&variant.sequence);
            self.accepted.push(variant.sequence.clone());
            survivors.push(variant.with_pool_lmax(lmax_to_pool));
        }
        report.accepted = survivors.len();

        info!(
            examined = report.examined,
            accepted = report.accepted,
            rejected_wild_type = report.rejected_wild_type,
            rejected_pool = report.rejected_pool,
            "Lmax filter finished."
        );
        (survivors, report)
    }
}

/// Runs a fresh filter over `pool` with only the wild type pre-accepted.
pub fn filter_pool(
    pool: CandidatePool,
    wild_type: &Sequence,
    threshold: usize,
) -> (CandidatePool, LmaxReport) {
    NonRepetitivenessFilter::new(wild_type, threshold).filter(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metrics::lmax_matrix;
    use crate::test_support::variant_from;

    fn seqs(pool: &CandidatePool) -> Vec<String> {
        pool.variants().map(|v| v.sequence.to_string()).collect()
    }

    #[test]
    fn rejects_candidate_sharing_five_mer_with_wild_type() {
        let wt: Sequence = "GGGAAACCC".parse().unwrap();
        let pool: CandidatePool = ["GGGAAUUUU", "UGGAAUUUU"].into_iter().map(variant_from).collect();
        let (survivors, report) = filter_pool(pool, &wt, 4);
        assert_eq!(seqs(&survivors), vec!["UGGAAUUUU"]);
        assert_eq!(report.rejected_wild_type, 1);
    }

    #[test]
    fn earlier_candidates_take_priority() {
        let wt: Sequence = "AAAAAAAAAA".parse().unwrap();
        let pool: CandidatePool = ["CGUCGUCGUC", "GUCGUCGUCG", "UCCGGUUCCG"]
            .into_iter()
            .map(variant_from)
            .collect();
        let (survivors, report) = filter_pool(pool, &wt, 4);
        assert_eq!(seqs(&survivors), vec!["CGUCGUCGUC", "UCCGGUUCCG"]);
        assert_eq!(report.rejected_pool, 1);
    }

    #[test]
    fn survivors_respect_threshold_pairwise_and_against_wild_type() {
        let wt: Sequence = "GUGAACUGCCGAGUAGGUAGCUGAUAAC".parse().unwrap();
        let pool: CandidatePool = [
            "GUGAACUGCGGAGUACCUAGCUGAUAAC",
            "CACUUGACCGCUCAUCCAUCGACUAUUG",
            "GAGAUCUCCCGAGAAGGAACCAGACAAC",
            "CUCAACAGCCUAGUUGGUUGCAGUUAAG",
            "GUCAACUCCCGUGUAGCUAGGUGAGAAC",
        ]
        .into_iter()
        .map(variant_from)
        .collect();
        let threshold = 6;
        let (survivors, _) = filter_pool(pool, &wt, threshold);

        let mut all: Vec<&Sequence> = survivors.sequences();
        all.push(&wt);
        let matrix = lmax_matrix(&all);
        for i in 0..all.len() {
            for j in 0..all.len() {
                assert!(matrix.get(i, j) <= threshold);
            }
        }
    }

    #[test]
    fn filtering_a_filtered_pool_rejects_nothing() {
        let wt: Sequence = "GGGAAACCC".parse().unwrap();
        let pool: CandidatePool = ["UGGAAUUUU", "CCCUUUGGA", "ACGUACGUA", "UGGAAUUCC"]
            .into_iter()
            .map(variant_from)
            .collect();
        let (once, _) = filter_pool(pool, &wt, 4);
        let (twice, report) = filter_pool(once.clone(), &wt, 4);
        assert_eq!(seqs(&once), seqs(&twice));
        assert_eq!(report.accepted, report.examined);
    }

    #[test]
    fn accepted_set_persists_across_calls() {
        let wt: Sequence = "AAAAAAAAAA".parse().unwrap();
        let mut filter = NonRepetitivenessFilter::new(&wt, 4);
        let first: CandidatePool = ["CGUCGUCGUC"].into_iter().map(variant_from).collect();
        let (kept, _) = filter.filter(first);
        assert_eq!(kept.len(), 1);

        let second: CandidatePool = ["GUCGUCGUCG", "UCCGGUUCCG"].into_iter().map(variant_from).collect();
        let (kept, report) = filter.filter(second);
        assert_eq!(seqs(&kept), vec!["UCCGGUUCCG"]);
        assert_eq!(report.rejected_pool, 1);
        assert_eq!(filter.accepted().len(), 2);
    }

    #[test]
    fn lmax_to_pool_is_recorded_for_survivors() {
        let wt: Sequence = "AAAAAAAAAA".parse().unwrap();
        let pool: CandidatePool = ["CGUCGUCGUC", "UCCGGUUCCG"].into_iter().map(variant_from).collect();
        let (survivors, _) = filter_pool(pool, &wt, 4);
        let lmax: Vec<Option<usize>> = survivors.variants().map(|v| v.metrics.lmax_to_pool).collect();
        let expected = longest_common_substring(
            "UCCGGUUCCG".parse::<Sequence>().unwrap().bases(),
            "CGUCGUCGUC".parse::<Sequence>().unwrap().bases(),
        );
        assert_eq!(lmax, vec![Some(0), Some(expected)]);
    }

    #[test]
    fn sequences_shorter_than_window_always_pass() {
        let wt: Sequence = "ACGU".parse().unwrap();
        let filter = NonRepetitivenessFilter::new(&wt, 10);
        assert!(filter.would_accept(&"ACGU".parse().unwrap()));
    }
}
