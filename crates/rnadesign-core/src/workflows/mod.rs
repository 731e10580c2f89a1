//! # Workflows Module
//!
//! High-level entry points that run the complete design pipeline.
//!
//! ## Overview
//!
//! A workflow owns the order of the stages: it folds the scaffold, derives the
//! random streams, runs one or more generate → filter → profile rounds, and
//! finally groups the accepted pool. Callers supply a validated
//! [`crate::engine::config::DesignConfig`], an [`crate::engine::oracle::OracleClient`]
//! and a [`crate::engine::progress::ProgressReporter`].
//!
//! - **Design Workflow** ([`design`]) - variant generation, filtering, the
//!   conservation feedback loop, and diversity grouping.

pub mod design;
