use super::cache::CacheStats;
use super::tasks::generation::GenerationReport;
use super::tasks::lmax_filter::LmaxReport;
use super::tasks::structural_filter::FilterReport;
use crate::core::metrics::GroupDiversity;
use crate::core::models::sequence::Sequence;
use crate::core::models::structure::Structure;
use crate::core::models::variant::GenerationStrategy;
use crate::core::oracle::FoldResult;

/// The scaffold and its folded reference structure.
#[derive(Debug, Clone, PartialEq)]
pub struct WildType {
    pub sequence: Sequence,
    pub structure: Structure,
    pub mfe: f64,
    pub confidence: f64,
    pub ensemble_diversity: Option<f64>,
}

impl WildType {
    pub fn new(sequence: Sequence, fold: FoldResult) -> Self {
        Self {
            sequence,
            structure: fold.structure,
            mfe: fold.mfe,
            confidence: fold.confidence,
            ensemble_diversity: fold.ensemble_diversity,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoundSummary {
    pub round: usize,
    pub generation: GenerationReport,
    pub structural: FilterReport,
    pub lmax: LmaxReport,
    /// Pool size once the round's survivors were appended.
    pub pool_size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DesignReport {
    pub master_seed: u64,
    pub strategy: GenerationStrategy,
    pub rounds: Vec<RoundSummary>,
    /// Variants dropped by diverse subset selection before grouping.
    pub subset_dropped: usize,
    pub group_diversity: GroupDiversity,
    pub cache: CacheStats,
}

impl DesignReport {
    pub fn total_generated(&self) -> usize {
        self.rounds.iter().map(|r| r.generation.unique).sum()
    }

    pub fn total_accepted(&self) -> usize {
        self.rounds.iter().map(|r| r.lmax.accepted).sum()
    }
}
