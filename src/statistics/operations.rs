//! Core statistical operations and traits
//!
//! This module defines the fundamental types and traits for statistical
//! reductions over an ensemble axis.

use crate::errors::{Result, ClimEnsError};
use ndarray::ArrayD;

/// Supported statistical operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatOperation {
    /// Arithmetic mean
    Mean,
    /// Population standard deviation
    StdDev,
    /// Minimum value
    Min,
    /// Maximum value
    Max,
}

impl StatOperation {
    /// All operations, in the order aggregated variables are derived.
    pub const ALL: [StatOperation; 4] = [Self::Mean, Self::StdDev, Self::Min, Self::Max];

    /// Suffix appended to a variable name reduced with this operation
    /// (`tas` reduced with [`Mean`](Self::Mean) becomes `tas_mean`).
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::StdDev => "stdev",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

/// Trait for types that can perform statistical reductions along an axis
pub trait StatisticalReduction<T> {
    /// Perform a statistical reduction along the specified axis
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The axis is out of bounds for the array
    /// - The operation cannot be performed on the data type
    /// - Memory allocation fails
    fn reduce_along_axis(&self, axis: usize, operation: StatOperation) -> Result<ArrayD<T>>;
}

impl StatisticalReduction<f32> for ArrayD<f32> {
    fn reduce_along_axis(&self, axis: usize, operation: StatOperation) -> Result<ArrayD<f32>> {
        if axis >= self.ndim() {
            return Err(ClimEnsError::StatisticsError(format!(
                "Axis {axis} is out of bounds for array with {} dimensions",
                self.ndim()
            )));
        }

        match operation {
            StatOperation::Mean => super::parallel::parallel_mean_axis(self, axis),
            StatOperation::StdDev => super::parallel::parallel_std_axis(self, axis),
            StatOperation::Min => super::parallel::parallel_min_axis(self, axis),
            StatOperation::Max => super::parallel::parallel_max_axis(self, axis),
        }
    }
}
