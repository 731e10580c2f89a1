//! Reading and writing sequence record files.
//!
//! Variants and groups leave the pipeline as FASTA records: an identifier, an
//! optional free-text description, and the sequence itself. Group boundaries are
//! file boundaries.

pub mod fasta;
pub mod traits;
