//! Multi-file NetCDF dataset loading
//!
//! This module scans a directory for the files belonging to each climate
//! model, and opens every model's file group as one [`MfDataset`]: a logical
//! dataset concatenated along the `time` dimension and read lazily in fixed
//! time chunks.
//!
//! Matching is substring containment over file names: a model identifier that
//! is a substring of another model's identifier (e.g. `AAA` vs `AAAX`) will
//! match both groups. Callers with overlapping identifiers must pass
//! substrings that are distinct within the directory.
//!
//! All paths are resolved to absolute before any file is opened; the process
//! working directory is never touched, so loading can run concurrently with
//! unrelated code in the same process.

use crate::errors::{ClimEnsError, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use ndarray::{concatenate, ArrayD, Axis};
use netcdf::AttributeValue;
use std::collections::HashMap;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Number of time steps per lazy read chunk.
pub const DEFAULT_TIME_CHUNK: usize = 120;

/// Name of the record dimension every data variable is concatenated along.
pub const TIME_DIM: &str = "time";

/// Scans `dir` (one level, no recursion) and groups its file names by model
/// identifier.
///
/// `models` is a comma-separated list of identifiers; a file belongs to a
/// model when its name contains the identifier as a substring. Groups are
/// sorted by file name so the concatenation order along `time` is
/// deterministic. A model with no matching files gets an empty group here;
/// [`load_model_datasets`] turns that into the named error.
///
/// # Errors
///
/// Returns an I/O error if `dir` cannot be resolved or read.
pub fn group_model_files(dir: &Path, models: &str) -> Result<HashMap<String, Vec<PathBuf>>> {
    let dir = fs::canonicalize(dir)?;

    let mut entries: Vec<(String, PathBuf)> = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            let name = entry.file_name().to_string_lossy().into_owned();
            entries.push((name, entry.path()));
        }
    }

    let mut groups = HashMap::new();
    for model in models.split(',').map(str::trim).filter(|m| !m.is_empty()) {
        let mut files: Vec<PathBuf> = entries
            .iter()
            .filter(|(name, _)| name.contains(model))
            .map(|(_, path)| path.clone())
            .collect();
        files.sort();
        groups.insert(model.to_string(), files);
    }

    Ok(groups)
}

/// Opens every model's file group in `dir` as a [`MfDataset`] chunked at
/// [`DEFAULT_TIME_CHUNK`] time steps, returning the model → dataset map.
///
/// # Errors
///
/// Returns [`ClimEnsError::NoInputFiles`] for any model identifier that
/// matched no files, or an open/validation error from [`MfDataset::open`].
pub fn load_model_datasets(dir: &Path, models: &str) -> Result<HashMap<String, MfDataset>> {
    let groups = group_model_files(dir, models)?;

    let mut data = HashMap::new();
    for (model, files) in groups {
        if files.is_empty() {
            return Err(ClimEnsError::NoInputFiles {
                model,
                dir: dir.to_path_buf(),
            });
        }
        println!("📂 {}: {} file(s)", model, files.len());
        data.insert(model, MfDataset::open(files, DEFAULT_TIME_CHUNK)?);
    }

    Ok(data)
}

/// A multi-file NetCDF dataset, presented as one logical dataset concatenated
/// along `time` and read lazily in fixed time chunks.
///
/// Every file must carry a `time` dimension, and every data variable must
/// have `time` as its leading dimension with identical trailing shape in all
/// files. File handles stay open until [`close`](MfDataset::close) (or drop).
pub struct MfDataset {
    files: Vec<netcdf::File>,
    paths: Vec<PathBuf>,
    per_file_times: Vec<usize>,
    n_times: usize,
    chunk_size: usize,
}

impl MfDataset {
    /// Opens `paths` as one dataset with `chunk_size` time steps per lazy
    /// read chunk.
    ///
    /// # Errors
    ///
    /// Fails when the list is empty, `chunk_size` is zero, a file lacks the
    /// `time` dimension, or the files disagree on variables or shapes.
    pub fn open(paths: Vec<PathBuf>, chunk_size: usize) -> Result<Self> {
        if paths.is_empty() {
            return Err(ClimEnsError::Generic(
                "Cannot open an empty file list as a multi-file dataset".to_string(),
            ));
        }
        if chunk_size == 0 {
            return Err(ClimEnsError::Generic(
                "Time chunk size must be at least 1".to_string(),
            ));
        }

        let mut files = Vec::with_capacity(paths.len());
        let mut per_file_times = Vec::with_capacity(paths.len());
        for path in &paths {
            let file = netcdf::open(path)?;
            let time_len = dimension_len(&file, TIME_DIM).ok_or_else(|| {
                ClimEnsError::Generic(format!(
                    "File '{}' has no '{}' dimension",
                    path.display(),
                    TIME_DIM
                ))
            })?;
            per_file_times.push(time_len);
            files.push(file);
        }

        let n_times = per_file_times.iter().sum();
        let dataset = Self {
            files,
            paths,
            per_file_times,
            n_times,
            chunk_size,
        };
        dataset.validate()?;
        Ok(dataset)
    }

    /// Cross-file consistency: every data variable of the first file must be
    /// present in all files, lead with `time`, and agree on trailing shape.
    fn validate(&self) -> Result<()> {
        let reference = &self.files[0];
        for var in reference.variables() {
            let name = var.name();
            let dims = dim_names(&var);
            if !dims.iter().any(|d| d == TIME_DIM) {
                continue;
            }
            if dims[0] != TIME_DIM {
                return Err(ClimEnsError::Generic(format!(
                    "Variable '{}' in '{}' must have '{}' as its leading dimension (found [{}])",
                    name,
                    self.paths[0].display(),
                    TIME_DIM,
                    dims.join(", ")
                )));
            }

            let trailing: Vec<usize> = var.dimensions().iter().skip(1).map(|d| d.len()).collect();
            for (file, path) in self.files.iter().zip(&self.paths).skip(1) {
                let other = file.variable(&name).ok_or_else(|| {
                    ClimEnsError::Generic(format!(
                        "File '{}' is missing variable '{}'",
                        path.display(),
                        name
                    ))
                })?;
                let other_trailing: Vec<usize> =
                    other.dimensions().iter().skip(1).map(|d| d.len()).collect();
                if other_trailing != trailing {
                    return Err(ClimEnsError::Generic(format!(
                        "Variable '{}' in '{}' has shape {:?} after '{}', expected {:?}",
                        name,
                        path.display(),
                        other_trailing,
                        TIME_DIM,
                        trailing
                    )));
                }
            }
        }
        Ok(())
    }

    /// Number of files backing this dataset.
    #[must_use]
    pub fn n_files(&self) -> usize {
        self.files.len()
    }

    /// Total length of the concatenated `time` axis.
    #[must_use]
    pub fn n_times(&self) -> usize {
        self.n_times
    }

    /// Configured time steps per lazy read chunk.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Absolute paths of the backing files, in concatenation order.
    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// `[start, end)` bounds of each lazy read chunk along `time`.
    #[must_use]
    pub fn chunk_bounds(&self) -> Vec<Range<usize>> {
        (0..self.n_times)
            .step_by(self.chunk_size)
            .map(|start| start..(start + self.chunk_size).min(self.n_times))
            .collect()
    }

    /// Names of all variables in the dataset.
    #[must_use]
    pub fn variable_names(&self) -> Vec<String> {
        self.files[0].variables().map(|v| v.name()).collect()
    }

    /// Names of the time-dependent data variables, excluding coordinate
    /// variables (a variable named after one of its own dimensions) and
    /// cell-bounds variables.
    #[must_use]
    pub fn data_variable_names(&self) -> Vec<String> {
        self.files[0]
            .variables()
            .filter(|v| {
                let name = v.name();
                let dims = dim_names(v);
                dims.iter().any(|d| d == TIME_DIM)
                    && !dims.iter().any(|d| *d == name)
                    && !dims.iter().any(|d| d == "bnds" || d == "nv")
            })
            .map(|v| v.name())
            .collect()
    }

    /// Dimension names of `var`, in storage order.
    ///
    /// # Errors
    ///
    /// Returns [`ClimEnsError::VariableNotFound`] if `var` is absent.
    pub fn variable_dims(&self, var: &str) -> Result<Vec<String>> {
        let variable = self.files[0]
            .variable(var)
            .ok_or_else(|| ClimEnsError::VariableNotFound {
                var: var.to_string(),
            })?;
        Ok(dim_names(&variable))
    }

    /// Global shape of `var`, with the `time` length summed across files.
    ///
    /// # Errors
    ///
    /// Returns [`ClimEnsError::VariableNotFound`] if `var` is absent.
    pub fn variable_shape(&self, var: &str) -> Result<Vec<usize>> {
        let variable = self.files[0]
            .variable(var)
            .ok_or_else(|| ClimEnsError::VariableNotFound {
                var: var.to_string(),
            })?;
        let mut shape: Vec<usize> = variable.dimensions().iter().map(|d| d.len()).collect();
        for (dim, len) in dim_names(&variable).iter().zip(shape.iter_mut()) {
            if dim == TIME_DIM {
                *len = self.n_times;
            }
        }
        Ok(shape)
    }

    /// Concatenated values of the `time` coordinate variable.
    ///
    /// # Errors
    ///
    /// Returns [`ClimEnsError::VariableNotFound`] if the files carry no
    /// `time` variable.
    pub fn time_values(&self) -> Result<Vec<f64>> {
        let mut values = Vec::with_capacity(self.n_times);
        for file in &self.files {
            let var = file
                .variable(TIME_DIM)
                .ok_or_else(|| ClimEnsError::VariableNotFound {
                    var: TIME_DIM.to_string(),
                })?;
            values.extend(var.get_values::<f64, _>(..)?);
        }
        Ok(values)
    }

    /// The `units` attribute of the `time` variable, when present
    /// (e.g. `"days since 2000-01-01"`).
    #[must_use]
    pub fn time_units(&self) -> Option<String> {
        let var = self.files[0].variable(TIME_DIM)?;
        let attr = var.attribute("units")?;
        match attr.value().ok()? {
            AttributeValue::Str(units) => Some(units),
            _ => None,
        }
    }

    /// Values of a non-record coordinate variable such as `lat` or `lon`,
    /// read from the first file.
    ///
    /// # Errors
    ///
    /// Returns [`ClimEnsError::VariableNotFound`] if `name` is absent.
    pub fn coord_values(&self, name: &str) -> Result<Vec<f64>> {
        let var = self.files[0]
            .variable(name)
            .ok_or_else(|| ClimEnsError::VariableNotFound {
                var: name.to_string(),
            })?;
        Ok(var.get_values::<f64, _>(..)?)
    }

    /// Reads `var` over the global time range `[start, end)`, crossing file
    /// boundaries as needed.
    ///
    /// # Errors
    ///
    /// Fails on an absent variable, an out-of-range request, or a read error.
    pub fn read_time_range(&self, var: &str, range: Range<usize>) -> Result<ArrayD<f32>> {
        if range.start >= range.end || range.end > self.n_times {
            return Err(ClimEnsError::Generic(format!(
                "Time range {}..{} is invalid for a dataset with {} time steps",
                range.start, range.end, self.n_times
            )));
        }

        let mut pieces: Vec<ArrayD<f32>> = Vec::new();
        let mut file_start = 0;
        for (file_idx, &file_times) in self.per_file_times.iter().enumerate() {
            let file_end = file_start + file_times;
            let overlap_start = range.start.max(file_start);
            let overlap_end = range.end.min(file_end);
            if overlap_start < overlap_end {
                pieces.push(self.read_file_slab(
                    file_idx,
                    var,
                    (overlap_start - file_start)..(overlap_end - file_start),
                )?);
            }
            file_start = file_end;
        }

        let views: Vec<_> = pieces.iter().map(ArrayD::view).collect();
        Ok(concatenate(Axis(0), &views)?)
    }

    /// Materializes the whole of `var` by walking its lazy chunks.
    ///
    /// # Errors
    ///
    /// Same conditions as [`read_time_range`](MfDataset::read_time_range).
    pub fn load_variable(&self, var: &str) -> Result<ArrayD<f32>> {
        let mut chunks: Vec<ArrayD<f32>> = Vec::new();
        for bounds in self.chunk_bounds() {
            chunks.push(self.read_time_range(var, bounds)?);
        }
        let views: Vec<_> = chunks.iter().map(ArrayD::view).collect();
        Ok(concatenate(Axis(0), &views)?)
    }

    /// Reads a contiguous time slab of `var` from one backing file.
    fn read_file_slab(
        &self,
        file_idx: usize,
        var: &str,
        local: Range<usize>,
    ) -> Result<ArrayD<f32>> {
        let variable = self.files[file_idx].variable(var).ok_or_else(|| {
            ClimEnsError::VariableNotFound {
                var: var.to_string(),
            }
        })?;

        let mut shape: Vec<usize> = variable.dimensions().iter().map(|d| d.len()).collect();
        let mut ranges: Vec<Range<usize>> = shape.iter().map(|&len| 0..len).collect();
        ranges[0] = local.clone();
        shape[0] = local.end - local.start;

        let values: Vec<f32> = match ranges.len() {
            1 => variable.get_values::<f32, _>(ranges[0].clone())?,
            2 => variable.get_values::<f32, _>((ranges[0].clone(), ranges[1].clone()))?,
            3 => variable.get_values::<f32, _>((
                ranges[0].clone(),
                ranges[1].clone(),
                ranges[2].clone(),
            ))?,
            4 => variable.get_values::<f32, _>((
                ranges[0].clone(),
                ranges[1].clone(),
                ranges[2].clone(),
                ranges[3].clone(),
            ))?,
            n => {
                return Err(ClimEnsError::Generic(format!(
                    "Variable '{}' has {} dimensions; at most 4 are supported",
                    var, n
                )))
            }
        };

        Ok(ArrayD::from_shape_vec(shape, values)?)
    }

    /// Prints a one-block summary of the dataset: files, time coverage, and
    /// variables.
    pub fn print_metadata(&self) {
        println!("\n===== Multi-file dataset =====");
        println!(
            "- {} file(s), {} time step(s), chunked at {}",
            self.n_files(),
            self.n_times(),
            self.chunk_size()
        );
        if let (Ok(times), Some(units)) = (self.time_values(), self.time_units()) {
            if let (Some(&first), Some(&last)) = (times.first(), times.last()) {
                match (decode_cf_time(&units, first), decode_cf_time(&units, last)) {
                    (Some(start), Some(end)) => println!("- Coverage: {} to {}", start, end),
                    _ => println!("- Coverage: {} to {} ({})", first, last, units),
                }
            }
        }
        for name in self.data_variable_names() {
            if let Ok(shape) = self.variable_shape(&name) {
                let dims: Vec<String> = shape.iter().map(ToString::to_string).collect();
                println!("- {} ({})", name, dims.join(" × "));
            }
        }
    }

    /// Releases the underlying file handles.
    pub fn close(self) {
        drop(self.files);
    }
}

/// Length of the named dimension in `file`, if it exists.
fn dimension_len(file: &netcdf::File, name: &str) -> Option<usize> {
    file.dimensions().find(|d| d.name() == name).map(|d| d.len())
}

/// Dimension names of `var`, in storage order.
fn dim_names(var: &netcdf::Variable) -> Vec<String> {
    var.dimensions().iter().map(|d| d.name().to_string()).collect()
}

/// Decodes a CF `"<unit> since <datetime>"` coordinate value to a calendar
/// timestamp. Supports days, hours, minutes, and seconds; returns `None`
/// for anything it cannot interpret (non-standard calendars included).
#[must_use]
pub fn decode_cf_time(units: &str, value: f64) -> Option<NaiveDateTime> {
    let (unit, base) = units.split_once(" since ")?;
    let base = base.trim();
    let origin = NaiveDateTime::parse_from_str(base, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(base, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| NaiveDate::parse_from_str(base, "%Y-%m-%d").ok()?.and_hms_opt(0, 0, 0))?;

    let seconds_per_unit = match unit.trim().to_ascii_lowercase().as_str() {
        "days" | "day" => 86_400.0,
        "hours" | "hour" => 3_600.0,
        "minutes" | "minute" => 60.0,
        "seconds" | "second" => 1.0,
        _ => return None,
    };

    origin.checked_add_signed(Duration::seconds((value * seconds_per_unit) as i64))
}
