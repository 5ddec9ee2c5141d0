//! Unit tests for ClimEns modules
//!
//! These tests cover the error types, the statistical reductions, the index
//! calculations on synthetic series, and the directory-scanning side of the
//! loader. End-to-end NetCDF coverage lives in `integration_test.rs`.

use clim_ens::{
    errors::{ClimEnsError, Result},
    indices::{
        daily_temperature_range, daily_temperature_range_variability, extreme_temperature_range,
        heat_wave_frequency, heat_wave_index, heat_wave_max_length, heat_wave_total_length,
        hot_spell_frequency, INDEX_NAMES,
    },
    loader::{decode_cf_time, group_model_files, load_model_datasets},
    parallel::{get_parallel_info, ParallelConfig},
    statistics::{StatOperation, StatisticalReduction},
};
use ndarray::ArrayD;
use std::fs::File;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_error_types() {
    let loc_err = ClimEnsError::LocationNotFound {
        query: "Atlantis".to_string(),
    };
    assert!(format!("{}", loc_err).contains("Location 'Atlantis' not found"));

    let files_err = ClimEnsError::NoInputFiles {
        model: "CanESM5".to_string(),
        dir: PathBuf::from("/data"),
    };
    let rendered = format!("{}", files_err);
    assert!(rendered.contains("No input files for model 'CanESM5'"));
    assert!(rendered.contains("/data"));

    let var_err = ClimEnsError::VariableNotFound {
        var: "tasmax".to_string(),
    };
    assert!(format!("{}", var_err).contains("Variable 'tasmax' not found"));

    let dim_err = ClimEnsError::DimensionNotFound {
        var: "tasmin".to_string(),
        dim: "time".to_string(),
    };
    assert!(format!("{}", dim_err).contains("Dimension 'time' not found in variable 'tasmin'"));

    let member_err = ClimEnsError::EnsembleMismatch {
        model: "MIROC6".to_string(),
        message: "no time steps overlap".to_string(),
    };
    assert!(format!("{}", member_err).contains("Ensemble member 'MIROC6' is incompatible"));

    let generic_err = ClimEnsError::Generic("Test error".to_string());
    assert_eq!(format!("{}", generic_err), "Test error");
}

#[test]
fn test_parallel_config() {
    let default_config = ParallelConfig::new_default();
    assert!(default_config.num_threads.is_none());

    let config_4 = ParallelConfig::with_threads(4);
    assert_eq!(config_4.num_threads, Some(4));

    let all_cores_config = ParallelConfig::all_cores();
    assert!(all_cores_config.num_threads.is_some());
    assert!(all_cores_config.num_threads.unwrap() > 0);

    let current = default_config.current_threads();
    assert!(current > 0);
}

#[test]
fn test_parallel_info() {
    let info = get_parallel_info();
    assert!(info.current_threads > 0);
    assert!(info.available_cores > 0);
    assert!(info.available_parallelism > 0);

    // Test info printing (doesn't panic)
    info.print_info();
}

#[test]
fn test_stat_operation_suffixes() {
    assert_eq!(StatOperation::Mean.suffix(), "mean");
    assert_eq!(StatOperation::StdDev.suffix(), "stdev");
    assert_eq!(StatOperation::Min.suffix(), "min");
    assert_eq!(StatOperation::Max.suffix(), "max");

    // Aggregated variables are derived in this fixed order
    assert_eq!(
        StatOperation::ALL,
        [
            StatOperation::Mean,
            StatOperation::StdDev,
            StatOperation::Min,
            StatOperation::Max
        ]
    );
}

#[test]
fn test_statistical_reductions() -> Result<()> {
    // Two realizations of three values each
    let data = ArrayD::from_shape_vec(vec![2, 3], vec![1.0f32, 3.0, 5.0, 3.0, 5.0, 7.0])?;

    let mean = data.reduce_along_axis(0, StatOperation::Mean)?;
    assert_eq!(mean.shape(), &[3]);
    assert_eq!(mean.as_slice().unwrap(), &[2.0, 4.0, 6.0]);

    // Population standard deviation: divisor n
    let std = data.reduce_along_axis(0, StatOperation::StdDev)?;
    assert_eq!(std.as_slice().unwrap(), &[1.0, 1.0, 1.0]);

    let min = data.reduce_along_axis(0, StatOperation::Min)?;
    assert_eq!(min.as_slice().unwrap(), &[1.0, 3.0, 5.0]);

    let max = data.reduce_along_axis(0, StatOperation::Max)?;
    assert_eq!(max.as_slice().unwrap(), &[3.0, 5.0, 7.0]);

    // Out-of-bounds axis is a statistics error
    let result = data.reduce_along_axis(5, StatOperation::Mean);
    assert!(matches!(result, Err(ClimEnsError::StatisticsError(_))));

    Ok(())
}

#[test]
fn test_statistical_reductions_skip_non_finite() -> Result<()> {
    let data = ArrayD::from_shape_vec(vec![3, 2], vec![1.0f32, f32::NAN, 3.0, f32::NAN, 5.0, f32::NAN])?;

    let mean = data.reduce_along_axis(0, StatOperation::Mean)?;
    assert_eq!(mean[[0]], 3.0);
    // A lane with no finite sample reduces to NaN
    assert!(mean[[1]].is_nan());

    let max = data.reduce_along_axis(0, StatOperation::Max)?;
    assert_eq!(max[[0]], 5.0);
    assert!(max[[1]].is_nan());

    Ok(())
}

/// Crafted 12-day series with one 3-day heat wave, one 2-day near miss, and
/// a closing 5-day warm spell.
fn spell_series() -> (ArrayD<f32>, ArrayD<f32>) {
    let tasmax = vec![31.0f32, 31.0, 31.0, 20.0, 31.0, 31.0, 20.0, 26.0, 26.0, 26.0, 26.0, 26.0];
    let tasmin = vec![23.0f32, 23.0, 23.0, 10.0, 23.0, 23.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0];
    (
        ArrayD::from_shape_vec(vec![12, 1], tasmin).unwrap(),
        ArrayD::from_shape_vec(vec![12, 1], tasmax).unwrap(),
    )
}

#[test]
fn test_range_indices() -> Result<()> {
    let (tasmin, tasmax) = spell_series();

    let dtr = daily_temperature_range(&tasmin, &tasmax, 0)?;
    assert_eq!(dtr.shape(), &[1]);
    // mean of [8 x5, 10 x2, 16 x5]
    assert!((dtr[[0]] - 140.0 / 12.0).abs() < 1e-5);

    let dtrv = daily_temperature_range_variability(&tasmin, &tasmax, 0)?;
    // absolute day-to-day changes of the range: [0,0,2,2,0,2,6,0,0,0,0]
    assert!((dtrv[[0]] - 12.0 / 11.0).abs() < 1e-5);

    let etr = extreme_temperature_range(&tasmin, &tasmax, 0)?;
    assert_eq!(etr[[0]], 21.0);

    Ok(())
}

#[test]
fn test_spell_indices() -> Result<()> {
    let (tasmin, tasmax) = spell_series();

    // Joint condition (tasmin > 22, tasmax > 30): runs of 3 and 2 days
    assert_eq!(heat_wave_frequency(&tasmin, &tasmax, 0)?[[0]], 1.0);
    assert_eq!(heat_wave_total_length(&tasmin, &tasmax, 0)?[[0]], 3.0);
    assert_eq!(heat_wave_max_length(&tasmin, &tasmax, 0)?[[0]], 3.0);

    // tasmax > 30: runs of 3 and 2 days
    assert_eq!(hot_spell_frequency(&tasmax, 0)?[[0]], 1.0);

    // tasmax > 25: runs of 3, 2, and 5 days; only the 5-day run counts
    assert_eq!(heat_wave_index(&tasmax, 0)?[[0]], 5.0);

    Ok(())
}

#[test]
fn test_spell_indices_on_calm_series() -> Result<()> {
    let tasmin = ArrayD::from_elem(vec![10, 1], 10.0f32);
    let tasmax = ArrayD::from_elem(vec![10, 1], 20.0f32);

    assert_eq!(heat_wave_frequency(&tasmin, &tasmax, 0)?[[0]], 0.0);
    assert_eq!(heat_wave_index(&tasmax, 0)?[[0]], 0.0);
    assert_eq!(hot_spell_frequency(&tasmax, 0)?[[0]], 0.0);
    assert_eq!(heat_wave_max_length(&tasmin, &tasmax, 0)?[[0]], 0.0);

    Ok(())
}

#[test]
fn test_non_finite_breaks_spells() -> Result<()> {
    let tasmax = ArrayD::from_shape_vec(
        vec![6, 1],
        vec![31.0f32, 31.0, f32::NAN, 31.0, 31.0, 31.0],
    )?;
    let tasmin = ArrayD::from_elem(vec![6, 1], 23.0f32);

    // The NaN splits the series into a 2-day and a 3-day run
    assert_eq!(heat_wave_frequency(&tasmin, &tasmax, 0)?[[0]], 1.0);
    assert_eq!(heat_wave_total_length(&tasmin, &tasmax, 0)?[[0]], 3.0);

    Ok(())
}

#[test]
fn test_index_shape_mismatch() {
    let tasmin = ArrayD::from_elem(vec![5, 2], 10.0f32);
    let tasmax = ArrayD::from_elem(vec![5, 3], 20.0f32);

    let result = daily_temperature_range(&tasmin, &tasmax, 0);
    assert!(matches!(result, Err(ClimEnsError::StatisticsError(_))));
}

#[test]
fn test_index_names_order() {
    assert_eq!(
        INDEX_NAMES,
        ["dtr", "dtrv", "etr", "hwf", "hwi", "hwtl", "hsf", "hwml"]
    );
}

#[test]
fn test_group_model_files_substring_matching() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    for name in [
        "tas_AAA_2000.nc",
        "tas_AAAX_2000.nc",
        "tas_BBB_2000.nc",
        "notes.txt",
    ] {
        File::create(temp_dir.path().join(name))?;
    }
    // Subdirectory entries are not scanned
    std::fs::create_dir(temp_dir.path().join("sub"))?;
    File::create(temp_dir.path().join("sub").join("tas_AAA_2001.nc"))?;

    let groups = group_model_files(temp_dir.path(), "AAA,AAAX,BBB")?;

    // Substring containment: 'AAA' matches the 'AAAX' file as well. This is
    // the documented matching behavior, asserted here so a change to it is a
    // deliberate decision.
    let aaa: Vec<String> = groups["AAA"]
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    // Sorted by file name: 'X' < '_' in byte order
    assert_eq!(aaa, ["tas_AAAX_2000.nc", "tas_AAA_2000.nc"]);

    assert_eq!(groups["AAAX"].len(), 1);
    assert_eq!(groups["BBB"].len(), 1);

    Ok(())
}

#[test]
fn test_load_model_datasets_no_input_files() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    File::create(temp_dir.path().join("tas_AAA_2000.nc")).expect("Failed to create file");

    let result = load_model_datasets(temp_dir.path(), "ZZZ");
    match result {
        Err(ClimEnsError::NoInputFiles { model, .. }) => assert_eq!(model, "ZZZ"),
        _ => panic!("Expected NoInputFiles error"),
    }
}

#[test]
fn test_decode_cf_time() {
    let decoded = decode_cf_time("days since 2000-01-01", 31.0).expect("Should decode");
    assert_eq!(decoded.to_string(), "2000-02-01 00:00:00");

    let decoded = decode_cf_time("hours since 2000-01-01 06:00:00", 18.0).expect("Should decode");
    assert_eq!(decoded.to_string(), "2000-01-02 00:00:00");

    // Non-standard units are not interpreted
    assert!(decode_cf_time("months since 2000-01-01", 1.0).is_none());
    assert!(decode_cf_time("nonsense", 1.0).is_none());
}
