//! # Core Module
//!
//! The stateless foundation of the library: nucleotide sequences and dot-bracket
//! structures, the variant and pool models, the folding oracle boundary, pairwise
//! sequence metrics, and sequence record I/O.
//!
//! ## Architecture
//!
//! - **Models** ([`models`]) - Sequences, structures, variants, pools and groups
//! - **Oracle Boundary** ([`oracle`]) - The interface to secondary-structure prediction
//! - **Metrics** ([`metrics`]) - Hamming distance, Lmax, distance matrices, group diversity
//! - **File I/O** ([`io`]) - FASTA reading and writing for variants and groups

pub mod io;
pub mod metrics;
pub mod models;
pub mod oracle;
