//! # Engine Module
//!
//! The stateful layer of the design pipeline. It validates configuration,
//! mediates every call to the folding oracle, memoizes results, and implements
//! the individual pipeline stages that the [`crate::workflows`] layer chains
//! together.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - immutable, validated pipeline parameters
//! - **Oracle boundary** ([`oracle`], [`cache`]) - retries, timeouts, and the shared fold cache
//! - **Stages** ([`tasks`]) - generation, structural filter, Lmax filter, conservation analysis, grouping
//! - **State** ([`state`]) - wild-type reference data and run reports
//! - **Progress** ([`progress`]) and **errors** ([`error`])

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod oracle;
pub mod progress;
pub mod state;
pub mod tasks;
pub mod utils;
