use super::sequence::{Base, Sequence};
use super::structure::Structure;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationStrategy {
    InverseFolding,
    ConservationGuided,
}

impl fmt::Display for GenerationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationStrategy::InverseFolding => write!(f, "inverse-folding"),
            GenerationStrategy::ConservationGuided => write!(f, "conservation-guided"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointMutation {
    pub position: usize,
    pub from: Base,
    pub to: Base,
}

/// A generated sequence that has not been folded or filtered yet.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCandidate {
    pub sequence: Sequence,
    pub run_index: usize,
    pub strategy: GenerationStrategy,
    pub mutations: Vec<PointMutation>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariantMetrics {
    pub gc_content: f64,
    pub max_homopolymer_run: usize,
    pub hamming_to_wild_type: usize,
    pub lmax_to_wild_type: usize,
    /// Longest substring shared with any variant accepted before this one.
    /// `None` until the variant has passed the non-repetitiveness filter.
    pub lmax_to_pool: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub sequence: Sequence,
    pub structure: Structure,
    pub mfe: f64,
    pub confidence: f64,
    pub ensemble_diversity: Option<f64>,
    pub metrics: VariantMetrics,
    pub run_index: usize,
    pub strategy: GenerationStrategy,
}

impl Variant {
    pub fn with_pool_lmax(mut self, lmax: usize) -> Self {
        self.metrics.lmax_to_pool = Some(lmax);
        self
    }

    /// Free-text annotation used in sequence record headers.
    pub fn annotation(&self) -> String {
        let mut parts = vec![
            format!("structure={}", self.structure),
            format!("mfe={:.2}", self.mfe),
            format!("confidence={:.3}", self.confidence),
            format!("gc={:.3}", self.metrics.gc_content),
            format!("homopolymer={}", self.metrics.max_homopolymer_run),
            format!("hamming_wt={}", self.metrics.hamming_to_wild_type),
            format!("lmax_wt={}", self.metrics.lmax_to_wild_type),
        ];
        if let Some(lmax) = self.metrics.lmax_to_pool {
            parts.push(format!("lmax_pool={}", lmax));
        }
        parts.push(format!("run={}", self.run_index));
        parts.push(format!("strategy={}", self.strategy));
        parts.join(" ")
    }
}
