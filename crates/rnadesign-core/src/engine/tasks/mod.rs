//! The pipeline stages.
//!
//! Data flows generation -> structural filter -> Lmax filter -> grouping, with
//! conservation analysis feeding the next generation round. Only generation and
//! distance computations run in parallel; both filters are sequential and keep
//! generation order.

pub mod conservation;
pub mod generation;
pub mod grouping;
pub mod lmax_filter;
pub mod structural_filter;
