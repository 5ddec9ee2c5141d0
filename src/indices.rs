//! Extreme-temperature climate indices
//!
//! This module derives the fixed set of extreme-temperature indices from an
//! ensemble's daily minimum/maximum temperature variables:
//!
//! | name   | index |
//! |--------|-------|
//! | `dtr`  | mean diurnal temperature range |
//! | `dtrv` | mean absolute day-to-day variation of the diurnal range |
//! | `etr`  | extreme temperature range (max `tasmax` − min `tasmin`) |
//! | `hwf`  | heat wave frequency (number of events) |
//! | `hwi`  | heat wave index (days in `tasmax` spells) |
//! | `hwtl` | heat wave total length (days in events) |
//! | `hsf`  | hot spell frequency (number of `tasmax` spells) |
//! | `hwml` | heat wave max length (longest event) |
//!
//! Thresholds are the reference defaults, expressed in degrees Celsius; they
//! are public constants so the assumptions are visible at the call site. A
//! warm-spell duration index (`wsdi`) is deliberately not part of the set:
//! it needs a calibration-period percentile baseline this crate does not
//! carry. The per-index functions below leave room to add one.
//!
//! Every reduction removes the `time` axis. Non-finite samples never satisfy
//! a threshold (they break spells) and are skipped by the averaging indices;
//! a series with no usable sample reduces to NaN.

use crate::ensemble::{Ensemble, EnsembleVariable};
use crate::errors::{ClimEnsError, Result};
use crate::loader::TIME_DIM;
use ndarray::{ArrayD, ArrayView1, Axis, Zip};

/// Minimum daily-minimum temperature of a heat wave day.
pub const HEAT_WAVE_THRESH_TASMIN: f32 = 22.0;
/// Minimum daily-maximum temperature of a heat wave day.
pub const HEAT_WAVE_THRESH_TASMAX: f32 = 30.0;
/// Minimum run of qualifying days that counts as a heat wave.
pub const HEAT_WAVE_WINDOW: usize = 3;
/// Daily-maximum threshold of the heat wave index.
pub const HEAT_WAVE_INDEX_THRESH: f32 = 25.0;
/// Minimum run of qualifying days counted by the heat wave index.
pub const HEAT_WAVE_INDEX_WINDOW: usize = 5;
/// Daily-maximum threshold of a hot spell day.
pub const HOT_SPELL_THRESH_TASMAX: f32 = 30.0;
/// Minimum run of qualifying days that counts as a hot spell.
pub const HOT_SPELL_WINDOW: usize = 3;

/// The derived index names, in computation order.
pub const INDEX_NAMES: [&str; 8] = ["dtr", "dtrv", "etr", "hwf", "hwi", "hwtl", "hsf", "hwml"];

/// The labeled collection of derived indices, keyed by the fixed names in
/// [`INDEX_NAMES`] order.
#[derive(Debug, Clone)]
pub struct IndexCollection {
    indices: Vec<EnsembleVariable>,
}

impl IndexCollection {
    /// Looks up an index by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&EnsembleVariable> {
        self.indices.iter().find(|v| v.name == name)
    }

    /// Index names, in computation order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.indices.iter().map(|v| v.name.as_str()).collect()
    }

    /// Number of indices in the collection.
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Iterates the indices in computation order.
    pub fn iter(&self) -> impl Iterator<Item = &EnsembleVariable> {
        self.indices.iter()
    }
}

struct VariableSet {
    tas: &'static str,
    tasmin: &'static str,
    tasmax: &'static str,
}

const RAW_SET: VariableSet = VariableSet {
    tas: "tas",
    tasmin: "tasmin",
    tasmax: "tasmax",
};

const AGGREGATED_SET: VariableSet = VariableSet {
    tas: "tas_mean",
    tasmin: "tasmin_mean",
    tasmax: "tasmax_mean",
};

/// Computes the full set of extreme-temperature indices from `ens`.
///
/// With `aggregate = false` the raw per-member variables `tas`/`tasmin`/
/// `tasmax` are read; with `aggregate = true` the ensemble-statistics
/// variants `tas_mean`/`tasmin_mean`/`tasmax_mean` are read instead. The
/// indices are computed in [`INDEX_NAMES`] order and returned as one
/// collection sharing the ensemble's non-time dimensions.
///
/// # Errors
///
/// Returns [`ClimEnsError::VariableNotFound`] when the selected variable set
/// is absent (e.g. `aggregate = true` on an ensemble that was never
/// aggregated), or [`ClimEnsError::DimensionNotFound`] when the temperature
/// variables carry no `time` dimension.
pub fn extreme_temperature_indices(ens: &Ensemble, aggregate: bool) -> Result<IndexCollection> {
    let set = if aggregate { AGGREGATED_SET } else { RAW_SET };

    // tas is part of the selected set and must be present, even though the
    // current indices derive only from tasmin/tasmax.
    ens.variable(set.tas)?;
    let tasmin = ens.variable(set.tasmin)?;
    let tasmax = ens.variable(set.tasmax)?;

    let time_axis = tasmin
        .axis_of(TIME_DIM)
        .ok_or_else(|| ClimEnsError::DimensionNotFound {
            var: set.tasmin.to_string(),
            dim: TIME_DIM.to_string(),
        })?;

    let out_dims: Vec<String> = tasmin
        .dims
        .iter()
        .filter(|d| *d != TIME_DIM)
        .cloned()
        .collect();

    let computed = [
        daily_temperature_range(&tasmin.data, &tasmax.data, time_axis)?,
        daily_temperature_range_variability(&tasmin.data, &tasmax.data, time_axis)?,
        extreme_temperature_range(&tasmin.data, &tasmax.data, time_axis)?,
        heat_wave_frequency(&tasmin.data, &tasmax.data, time_axis)?,
        heat_wave_index(&tasmax.data, time_axis)?,
        heat_wave_total_length(&tasmin.data, &tasmax.data, time_axis)?,
        hot_spell_frequency(&tasmax.data, time_axis)?,
        heat_wave_max_length(&tasmin.data, &tasmax.data, time_axis)?,
    ];

    let indices = INDEX_NAMES
        .iter()
        .zip(computed)
        .map(|(name, data)| EnsembleVariable {
            name: (*name).to_string(),
            dims: out_dims.clone(),
            data,
        })
        .collect();

    Ok(IndexCollection { indices })
}

/// Mean diurnal temperature range: mean over time of `tasmax - tasmin`.
///
/// # Errors
///
/// Fails when the arrays disagree in shape or the axis is out of bounds.
pub fn daily_temperature_range(
    tasmin: &ArrayD<f32>,
    tasmax: &ArrayD<f32>,
    time_axis: usize,
) -> Result<ArrayD<f32>> {
    reduce_pair(tasmin, tasmax, time_axis, |min_lane, max_lane| {
        let mut sum = 0.0_f64;
        let mut count = 0_u32;
        for (&lo, &hi) in min_lane.iter().zip(max_lane.iter()) {
            if lo.is_finite() && hi.is_finite() {
                sum += f64::from(hi - lo);
                count += 1;
            }
        }
        finite_mean(sum, count)
    })
}

/// Mean absolute day-to-day variation of the diurnal temperature range.
///
/// NaN where fewer than two consecutive days have a usable range.
///
/// # Errors
///
/// Fails when the arrays disagree in shape or the axis is out of bounds.
pub fn daily_temperature_range_variability(
    tasmin: &ArrayD<f32>,
    tasmax: &ArrayD<f32>,
    time_axis: usize,
) -> Result<ArrayD<f32>> {
    reduce_pair(tasmin, tasmax, time_axis, |min_lane, max_lane| {
        let mut previous: Option<f32> = None;
        let mut sum = 0.0_f64;
        let mut count = 0_u32;
        for (&lo, &hi) in min_lane.iter().zip(max_lane.iter()) {
            let range = if lo.is_finite() && hi.is_finite() {
                Some(hi - lo)
            } else {
                None
            };
            if let (Some(prev), Some(curr)) = (previous, range) {
                sum += f64::from((curr - prev).abs());
                count += 1;
            }
            previous = range;
        }
        finite_mean(sum, count)
    })
}

/// Extreme temperature range: `max(tasmax) - min(tasmin)` over time.
///
/// # Errors
///
/// Fails when the arrays disagree in shape or the axis is out of bounds.
pub fn extreme_temperature_range(
    tasmin: &ArrayD<f32>,
    tasmax: &ArrayD<f32>,
    time_axis: usize,
) -> Result<ArrayD<f32>> {
    reduce_pair(tasmin, tasmax, time_axis, |min_lane, max_lane| {
        let mut lowest = f32::INFINITY;
        let mut highest = f32::NEG_INFINITY;
        for &lo in min_lane.iter() {
            if lo.is_finite() {
                lowest = lowest.min(lo);
            }
        }
        for &hi in max_lane.iter() {
            if hi.is_finite() {
                highest = highest.max(hi);
            }
        }
        if lowest.is_finite() && highest.is_finite() {
            highest - lowest
        } else {
            f32::NAN
        }
    })
}

/// Heat wave frequency: number of runs of at least [`HEAT_WAVE_WINDOW`]
/// consecutive days with `tasmin` above [`HEAT_WAVE_THRESH_TASMIN`] and
/// `tasmax` above [`HEAT_WAVE_THRESH_TASMAX`].
///
/// # Errors
///
/// Fails when the arrays disagree in shape or the axis is out of bounds.
pub fn heat_wave_frequency(
    tasmin: &ArrayD<f32>,
    tasmax: &ArrayD<f32>,
    time_axis: usize,
) -> Result<ArrayD<f32>> {
    reduce_pair(tasmin, tasmax, time_axis, |min_lane, max_lane| {
        heat_wave_spells(min_lane, max_lane).events as f32
    })
}

/// Heat wave index: number of days inside runs of at least
/// [`HEAT_WAVE_INDEX_WINDOW`] consecutive days with `tasmax` above
/// [`HEAT_WAVE_INDEX_THRESH`].
///
/// # Errors
///
/// Fails when the axis is out of bounds.
pub fn heat_wave_index(tasmax: &ArrayD<f32>, time_axis: usize) -> Result<ArrayD<f32>> {
    reduce_single(tasmax, time_axis, |lane| {
        let mask = lane.iter().map(|&x| x.is_finite() && x > HEAT_WAVE_INDEX_THRESH);
        spell_stats(mask, HEAT_WAVE_INDEX_WINDOW).total_days as f32
    })
}

/// Heat wave total length: total number of days inside heat waves (same run
/// rule as [`heat_wave_frequency`]).
///
/// # Errors
///
/// Fails when the arrays disagree in shape or the axis is out of bounds.
pub fn heat_wave_total_length(
    tasmin: &ArrayD<f32>,
    tasmax: &ArrayD<f32>,
    time_axis: usize,
) -> Result<ArrayD<f32>> {
    reduce_pair(tasmin, tasmax, time_axis, |min_lane, max_lane| {
        heat_wave_spells(min_lane, max_lane).total_days as f32
    })
}

/// Hot spell frequency: number of runs of at least [`HOT_SPELL_WINDOW`]
/// consecutive days with `tasmax` above [`HOT_SPELL_THRESH_TASMAX`].
///
/// # Errors
///
/// Fails when the axis is out of bounds.
pub fn hot_spell_frequency(tasmax: &ArrayD<f32>, time_axis: usize) -> Result<ArrayD<f32>> {
    reduce_single(tasmax, time_axis, |lane| {
        let mask = lane.iter().map(|&x| x.is_finite() && x > HOT_SPELL_THRESH_TASMAX);
        spell_stats(mask, HOT_SPELL_WINDOW).events as f32
    })
}

/// Heat wave max length: length of the longest heat wave (same run rule as
/// [`heat_wave_frequency`]), 0 when there is none.
///
/// # Errors
///
/// Fails when the arrays disagree in shape or the axis is out of bounds.
pub fn heat_wave_max_length(
    tasmin: &ArrayD<f32>,
    tasmax: &ArrayD<f32>,
    time_axis: usize,
) -> Result<ArrayD<f32>> {
    reduce_pair(tasmin, tasmax, time_axis, |min_lane, max_lane| {
        heat_wave_spells(min_lane, max_lane).max_length as f32
    })
}

/// Spell statistics of one boolean run mask: runs shorter than `window`
/// do not count.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct SpellStats {
    events: u32,
    total_days: u32,
    max_length: u32,
}

fn spell_stats(mask: impl IntoIterator<Item = bool>, window: usize) -> SpellStats {
    let mut stats = SpellStats::default();
    let mut run = 0_usize;
    for qualifies in mask {
        if qualifies {
            run += 1;
        } else {
            close_run(&mut stats, run, window);
            run = 0;
        }
    }
    close_run(&mut stats, run, window);
    stats
}

fn close_run(stats: &mut SpellStats, run: usize, window: usize) {
    if run >= window {
        stats.events += 1;
        stats.total_days += run as u32;
        stats.max_length = stats.max_length.max(run as u32);
    }
}

fn heat_wave_spells(min_lane: ArrayView1<f32>, max_lane: ArrayView1<f32>) -> SpellStats {
    let mask = min_lane.iter().zip(max_lane.iter()).map(|(&lo, &hi)| {
        lo.is_finite()
            && hi.is_finite()
            && lo > HEAT_WAVE_THRESH_TASMIN
            && hi > HEAT_WAVE_THRESH_TASMAX
    });
    spell_stats(mask, HEAT_WAVE_WINDOW)
}

fn finite_mean(sum: f64, count: u32) -> f32 {
    if count > 0 {
        #[allow(clippy::cast_possible_truncation)]
        {
            (sum / f64::from(count)) as f32
        }
    } else {
        f32::NAN
    }
}

/// Reduces paired tasmin/tasmax lanes along `time_axis` in parallel.
fn reduce_pair(
    tasmin: &ArrayD<f32>,
    tasmax: &ArrayD<f32>,
    time_axis: usize,
    f: impl Fn(ArrayView1<f32>, ArrayView1<f32>) -> f32 + Sync + Send,
) -> Result<ArrayD<f32>> {
    if tasmin.shape() != tasmax.shape() {
        return Err(ClimEnsError::StatisticsError(format!(
            "tasmin shape {:?} does not match tasmax shape {:?}",
            tasmin.shape(),
            tasmax.shape()
        )));
    }
    check_axis(tasmin, time_axis)?;

    let result = Zip::from(tasmin.lanes(Axis(time_axis)))
        .and(tasmax.lanes(Axis(time_axis)))
        .par_map_collect(|min_lane, max_lane| f(min_lane, max_lane));
    Ok(result)
}

/// Reduces single-variable lanes along `time_axis` in parallel.
fn reduce_single(
    data: &ArrayD<f32>,
    time_axis: usize,
    f: impl Fn(ArrayView1<f32>) -> f32 + Sync + Send,
) -> Result<ArrayD<f32>> {
    check_axis(data, time_axis)?;
    let result = Zip::from(data.lanes(Axis(time_axis))).par_map_collect(f);
    Ok(result)
}

fn check_axis(data: &ArrayD<f32>, axis: usize) -> Result<()> {
    if axis >= data.ndim() {
        return Err(ClimEnsError::StatisticsError(format!(
            "Axis {axis} is out of bounds for array with {} dimensions",
            data.ndim()
        )));
    }
    Ok(())
}
