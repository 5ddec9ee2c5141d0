//! Multi-model ensemble construction and aggregation
//!
//! [`build_ensemble`] merges the per-model datasets produced by the loader
//! into one [`Ensemble`]: every data variable is stacked along a new
//! `realization` dimension, with member time axes aligned onto their common
//! overlap. Construction materializes everything into memory and then
//! releases the underlying file handles, so the result is self-contained.
//!
//! Alignment policy: members must agree on time units; the shared time axis
//! is the intersection of member time coordinates, kept in the first
//! member's order. Any per-member failure aborts the whole build with an
//! error naming the offending model.

use crate::errors::{ClimEnsError, Result};
use crate::loader::{decode_cf_time, MfDataset};
use crate::statistics::{StatOperation, StatisticalReduction};
use ndarray::{concatenate, ArrayD, Axis};
use std::collections::{HashMap, HashSet};

/// Name of the stacking dimension added by [`build_ensemble`].
pub const REALIZATION_DIM: &str = "realization";

/// One named variable of an ensemble: its dimension names in storage order
/// and its materialized data.
#[derive(Debug, Clone)]
pub struct EnsembleVariable {
    pub name: String,
    pub dims: Vec<String>,
    pub data: ArrayD<f32>,
}

impl EnsembleVariable {
    /// Position of the named dimension, if this variable carries it.
    #[must_use]
    pub fn axis_of(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }
}

/// A materialized multi-model ensemble.
///
/// Raw variables carry dims `[realization, time, ...]`; variables produced
/// by [`aggregate`](Ensemble::aggregate) drop `realization` and carry a
/// statistical suffix instead. All variables share the coordinate vectors
/// held here.
#[derive(Debug, Clone)]
pub struct Ensemble {
    variables: Vec<EnsembleVariable>,
    time: Vec<f64>,
    time_units: Option<String>,
    lat: Vec<f64>,
    lon: Vec<f64>,
    n_realizations: usize,
}

impl Ensemble {
    /// Looks up a variable by name.
    ///
    /// # Errors
    ///
    /// Returns [`ClimEnsError::VariableNotFound`] if `name` is absent.
    pub fn variable(&self, name: &str) -> Result<&EnsembleVariable> {
        self.variables
            .iter()
            .find(|v| v.name == name)
            .ok_or_else(|| ClimEnsError::VariableNotFound {
                var: name.to_string(),
            })
    }

    /// Whether the ensemble carries the named variable.
    #[must_use]
    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.iter().any(|v| v.name == name)
    }

    /// Variable names, in insertion order.
    #[must_use]
    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.name.as_str()).collect()
    }

    /// The shared time coordinate values.
    #[must_use]
    pub fn time(&self) -> &[f64] {
        &self.time
    }

    /// CF units string of the time axis, when the source files carried one.
    #[must_use]
    pub fn time_units(&self) -> Option<&str> {
        self.time_units.as_deref()
    }

    /// Latitude coordinate values (empty when the sources carried none).
    #[must_use]
    pub fn lat(&self) -> &[f64] {
        &self.lat
    }

    /// Longitude coordinate values (empty when the sources carried none).
    #[must_use]
    pub fn lon(&self) -> &[f64] {
        &self.lon
    }

    /// Number of stacked members.
    #[must_use]
    pub fn n_realizations(&self) -> usize {
        self.n_realizations
    }

    /// Reduces every realization-bearing variable with mean, standard
    /// deviation, min, and max over the `realization` axis, yielding an
    /// ensemble of `<var>_mean`, `<var>_stdev`, `<var>_min`, and `<var>_max`
    /// variables on the same coordinates.
    ///
    /// The standard deviation is the population form (divisor `n`).
    ///
    /// # Errors
    ///
    /// Returns [`ClimEnsError::StatisticsError`] when no variable carries a
    /// `realization` dimension, or if a reduction fails.
    pub fn aggregate(&self) -> Result<Ensemble> {
        let mut variables = Vec::new();
        for var in &self.variables {
            let Some(axis) = var.axis_of(REALIZATION_DIM) else {
                continue;
            };
            let reduced_dims: Vec<String> = var
                .dims
                .iter()
                .filter(|d| *d != REALIZATION_DIM)
                .cloned()
                .collect();
            for op in StatOperation::ALL {
                variables.push(EnsembleVariable {
                    name: format!("{}_{}", var.name, op.suffix()),
                    dims: reduced_dims.clone(),
                    data: var.data.reduce_along_axis(axis, op)?,
                });
            }
        }

        if variables.is_empty() {
            return Err(ClimEnsError::StatisticsError(format!(
                "No variable carries a '{}' dimension to aggregate over",
                REALIZATION_DIM
            )));
        }

        Ok(Ensemble {
            variables,
            time: self.time.clone(),
            time_units: self.time_units.clone(),
            lat: self.lat.clone(),
            lon: self.lon.clone(),
            n_realizations: self.n_realizations,
        })
    }

    /// Prints a one-block summary: realizations, coverage, grid, variables.
    pub fn print_summary(&self) {
        println!("\n===== Ensemble =====");
        println!(
            "- {} realization(s), {} time step(s), grid {} × {}",
            self.n_realizations,
            self.time.len(),
            self.lat.len(),
            self.lon.len()
        );
        if let (Some(units), Some(&first), Some(&last)) =
            (self.time_units.as_deref(), self.time.first(), self.time.last())
        {
            match (decode_cf_time(units, first), decode_cf_time(units, last)) {
                (Some(start), Some(end)) => println!("- Coverage: {} to {}", start, end),
                _ => println!("- Coverage: {} to {} ({})", first, last, units),
            }
        }
        for var in &self.variables {
            println!("- {} ({})", var.name, var.dims.join(", "));
        }
    }
}

/// Builds an [`Ensemble`] from the model → dataset map, stacking every data
/// variable along a new `realization` dimension.
///
/// Map keys do not label the stacked members (realization identity is
/// positional, with members taken in sorted key order for determinism); keys
/// are used to attribute failures to a model. The build fully materializes
/// all member data and closes every dataset before returning.
///
/// # Errors
///
/// Returns [`ClimEnsError::EnsembleMismatch`] naming the offending model when
/// a member cannot be read, lacks a variable of the ensemble's variable set,
/// disagrees on coordinates or units, or shares no time steps with the
/// preceding members. Fails with [`ClimEnsError::Generic`] on an empty map.
pub fn build_ensemble(data: HashMap<String, MfDataset>) -> Result<Ensemble> {
    if data.is_empty() {
        return Err(ClimEnsError::Generic(
            "Cannot build an ensemble from an empty model map".to_string(),
        ));
    }

    let mut models: Vec<String> = data.keys().cloned().collect();
    models.sort();

    // Time alignment across members.
    let mut member_times: Vec<Vec<f64>> = Vec::with_capacity(models.len());
    let mut time_units: Option<String> = None;
    let mut common: Vec<f64> = Vec::new();
    for (i, model) in models.iter().enumerate() {
        let dataset = &data[model];
        let times = dataset
            .time_values()
            .map_err(|e| mismatch(model, &e.to_string()))?;
        let units = dataset.time_units();

        if i == 0 {
            time_units = units;
            common = times.clone();
        } else {
            if units != time_units {
                return Err(mismatch(
                    model,
                    &format!(
                        "time units {:?} differ from the first member's {:?}",
                        units, time_units
                    ),
                ));
            }
            let available: HashSet<u64> = times.iter().map(|t| t.to_bits()).collect();
            common.retain(|t| available.contains(&t.to_bits()));
            if common.is_empty() {
                return Err(mismatch(
                    model,
                    "no time steps overlap with the preceding members",
                ));
            }
        }
        member_times.push(times);
    }

    // The first member fixes the variable set and the grid.
    let first = &data[&models[0]];
    let mut var_names = first.data_variable_names();
    var_names.sort();
    if var_names.is_empty() {
        return Err(mismatch(&models[0], "dataset has no time-dependent data variables"));
    }
    let lat = first.coord_values("lat").unwrap_or_default();
    let lon = first.coord_values("lon").unwrap_or_default();

    println!(
        "🚀 Materializing {} member(s) × {} variable(s) over {} common time step(s)",
        models.len(),
        var_names.len(),
        common.len()
    );

    // Materialize each member onto the common time axis.
    let mut stacked: Vec<Vec<ArrayD<f32>>> = vec![Vec::new(); var_names.len()];
    let mut dims_per_var: Vec<Vec<String>> = Vec::new();
    for (member_idx, model) in models.iter().enumerate() {
        let dataset = &data[model];

        let mut time_index: HashMap<u64, usize> = HashMap::new();
        for (i, t) in member_times[member_idx].iter().enumerate() {
            time_index.entry(t.to_bits()).or_insert(i);
        }
        let selection: Vec<usize> = common
            .iter()
            .map(|t| time_index[&t.to_bits()])
            .collect();

        for (var_idx, var) in var_names.iter().enumerate() {
            let dims = dataset
                .variable_dims(var)
                .map_err(|e| mismatch(model, &e.to_string()))?;
            if member_idx == 0 {
                dims_per_var.push(dims);
            } else if dims != dims_per_var[var_idx] {
                return Err(mismatch(
                    model,
                    &format!(
                        "variable '{}' has dimensions [{}], expected [{}]",
                        var,
                        dims.join(", "),
                        dims_per_var[var_idx].join(", ")
                    ),
                ));
            }

            let full = dataset
                .load_variable(var)
                .map_err(|e| mismatch(model, &e.to_string()))?;
            let aligned = full.select(Axis(0), &selection);

            if member_idx > 0 && aligned.shape() != &stacked[var_idx][0].shape()[1..] {
                return Err(mismatch(
                    model,
                    &format!(
                        "variable '{}' has shape {:?} on the common axis, expected {:?}",
                        var,
                        aligned.shape(),
                        &stacked[var_idx][0].shape()[1..]
                    ),
                ));
            }
            stacked[var_idx].push(aligned.insert_axis(Axis(0)));
        }
    }

    // Stack members along the new realization axis.
    let mut variables = Vec::with_capacity(var_names.len());
    for ((var, members), member_dims) in var_names.iter().zip(stacked).zip(dims_per_var) {
        let views: Vec<_> = members.iter().map(ArrayD::view).collect();
        let mut dims = Vec::with_capacity(member_dims.len() + 1);
        dims.push(REALIZATION_DIM.to_string());
        dims.extend(member_dims);
        variables.push(EnsembleVariable {
            name: var.clone(),
            dims,
            data: concatenate(Axis(0), &views)?,
        });
    }

    // Everything is in memory now; release the lazy-loading handles.
    for dataset in data.into_values() {
        dataset.close();
    }

    println!(
        "✅ Ensemble ready: {} realization(s) × {} time step(s)",
        models.len(),
        common.len()
    );

    Ok(Ensemble {
        variables,
        time: common,
        time_units,
        lat,
        lon,
        n_realizations: models.len(),
    })
}

fn mismatch(model: &str, message: &str) -> ClimEnsError {
    ClimEnsError::EnsembleMismatch {
        model: model.to_string(),
        message: message.to_string(),
    }
}
