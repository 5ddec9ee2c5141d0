//! Parallel computation implementations for statistical operations
//!
//! This module contains the actual parallel reduction logic. Mean and
//! standard deviation accumulate in f64 to avoid precision loss and run in
//! parallel over the output lanes; min and max use ndarray's `fold_axis`.
//! Non-finite samples are skipped everywhere, and a lane with no finite
//! sample reduces to NaN.

use crate::errors::Result;
use ndarray::{ArrayD, ArrayViewD, Axis, Zip};

/// Computes the mean along an axis using parallel processing.
///
/// # Errors
///
/// Returns an error if the axis is invalid.
pub fn parallel_mean_axis(data: &ArrayD<f32>, axis: usize) -> Result<ArrayD<f32>> {
    let view: ArrayViewD<f32> = data.view();
    let result = Zip::from(view.lanes(Axis(axis))).par_map_collect(|lane| {
        let mut sum = 0.0_f64;
        let mut count = 0_u32;
        for &x in lane.iter() {
            if x.is_finite() {
                sum += f64::from(x);
                count += 1;
            }
        }
        if count > 0 {
            #[allow(clippy::cast_possible_truncation)]
            {
                (sum / f64::from(count)) as f32
            }
        } else {
            f32::NAN
        }
    });

    Ok(result)
}

/// Computes the population standard deviation along an axis using parallel
/// processing.
///
/// # Errors
///
/// Returns an error if the axis is invalid.
pub fn parallel_std_axis(data: &ArrayD<f32>, axis: usize) -> Result<ArrayD<f32>> {
    let view: ArrayViewD<f32> = data.view();
    let result = Zip::from(view.lanes(Axis(axis))).par_map_collect(|lane| {
        let mut sum = 0.0_f64;
        let mut count = 0_u32;
        for &x in lane.iter() {
            if x.is_finite() {
                sum += f64::from(x);
                count += 1;
            }
        }
        if count == 0 {
            return f32::NAN;
        }
        let mean = sum / f64::from(count);

        let mut sq_sum = 0.0_f64;
        for &x in lane.iter() {
            if x.is_finite() {
                let diff = f64::from(x) - mean;
                sq_sum += diff * diff;
            }
        }
        #[allow(clippy::cast_possible_truncation)]
        {
            (sq_sum / f64::from(count)).sqrt() as f32
        }
    });

    Ok(result)
}

/// Computes the minimum along an axis using ndarray's `fold_axis`.
///
/// # Errors
///
/// Returns an error if the axis is invalid.
pub fn parallel_min_axis(data: &ArrayD<f32>, axis: usize) -> Result<ArrayD<f32>> {
    let result = data.fold_axis(Axis(axis), f32::INFINITY, |&acc, &x| {
        if x.is_finite() {
            acc.min(x)
        } else {
            acc // Skip NaN and infinite values
        }
    });

    // Convert INFINITY to NaN where no valid values were found
    let final_result = result.mapv(|x| if x == f32::INFINITY { f32::NAN } else { x });
    Ok(final_result.into_dyn())
}

/// Computes the maximum along an axis using ndarray's `fold_axis`.
///
/// # Errors
///
/// Returns an error if the axis is invalid.
pub fn parallel_max_axis(data: &ArrayD<f32>, axis: usize) -> Result<ArrayD<f32>> {
    let result = data.fold_axis(Axis(axis), f32::NEG_INFINITY, |&acc, &x| {
        if x.is_finite() {
            acc.max(x)
        } else {
            acc // Skip NaN and infinite values
        }
    });

    // Convert NEG_INFINITY to NaN where no valid values were found
    let final_result = result.mapv(|x| if x == f32::NEG_INFINITY { f32::NAN } else { x });
    Ok(final_result.into_dyn())
}
