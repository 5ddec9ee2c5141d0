//! Statistical reductions over ensemble axes
//!
//! This module provides the reductions (mean, standard deviation, min, max)
//! that turn a raw per-member ensemble into its aggregated statistical
//! variables, computed in parallel over the reduced axis.
//!
//! # Organization
//!
//! This module is organized into submodules:
//! - [`operations`]: Core statistical operations and traits
//! - [`parallel`]: Parallel computation implementations

pub mod operations;
pub mod parallel;

// Re-export the main types and functions for convenience
pub use operations::{StatOperation, StatisticalReduction};
pub use parallel::{parallel_max_axis, parallel_mean_axis, parallel_min_axis, parallel_std_axis};
