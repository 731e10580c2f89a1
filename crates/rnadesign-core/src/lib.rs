//! # RNA Designer Core Library
//!
//! A library for designing families of RNA sequence variants that fold into the
//! secondary structure of a wild-type scaffold while remaining mutually dissimilar
//! enough to be synthesized or expressed together without recombination-prone repeats.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Sequence`, `Structure`,
//!   `Variant`, `CandidatePool`, `Group`), the [`core::oracle::FoldingOracle`] boundary,
//!   pure pairwise metrics, and FASTA I/O.
//!
//! - **[`engine`]: The Logic Core.** Configuration, caching, the oracle-call boundary,
//!   seeded random streams, and the pipeline stages: variant generation, structural
//!   filtering, the non-repetitiveness (Lmax) filter, conservation analysis, and
//!   diversity grouping.
//!
//! - **[`workflows`]: The Public API.** Ties `engine` and `core` together into the
//!   complete generate → filter → group procedure, including the conservation
//!   feedback loop across rounds.
//!
//! ## Reproducibility
//!
//! All choices made by the library itself (mutation positions and bases, clustering
//! initialization, sampling) are driven by seeded random streams. The folding oracle
//! is an external collaborator and is treated as non-reproducible.

pub mod core;
pub mod engine;
pub mod workflows;

#[cfg(test)]
pub(crate) mod test_support;
