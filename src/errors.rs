//! Centralized error handling for ClimEns
//!
//! This module provides structured error types so that callers can tell a bad
//! location apart from a bad path or model list, a bad ensemble member, and a
//! bad aggregate flag, rather than receiving a generic boxed error.

use std::fmt;
use std::path::PathBuf;

/// Main error type for ClimEns operations
#[derive(Debug)]
pub enum ClimEnsError {
    /// NetCDF file operation errors
    NetCDFError(netcdf::Error),

    /// I/O operation errors
    IoError(std::io::Error),

    /// Array shape or dimension error
    ArrayError(ndarray::ShapeError),

    /// HTTP transport errors from the geocoding client
    HttpError(reqwest::Error),

    /// Malformed JSON in a geocoder response
    JsonError(serde_json::Error),

    /// The geocoding service returned no match for the query
    LocationNotFound { query: String },

    /// A model identifier matched no files in the scanned directory
    NoInputFiles { model: String, dir: PathBuf },

    /// Variable not found in a dataset or ensemble
    VariableNotFound { var: String },

    /// Dimension not found in variable
    DimensionNotFound { var: String, dim: String },

    /// A member dataset is incompatible with the rest of the ensemble
    EnsembleMismatch { model: String, message: String },

    /// Statistics computation errors
    StatisticsError(String),

    /// Thread pool configuration error
    ThreadPoolError(String),

    /// Generic error for everything else
    Generic(String),
}

impl fmt::Display for ClimEnsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClimEnsError::NetCDFError(e) => write!(f, "NetCDF error: {}", e),
            ClimEnsError::IoError(e) => write!(f, "I/O error: {}", e),
            ClimEnsError::ArrayError(e) => write!(f, "Array error: {}", e),
            ClimEnsError::HttpError(e) => write!(f, "HTTP error: {}", e),
            ClimEnsError::JsonError(e) => write!(f, "JSON error: {}", e),
            ClimEnsError::LocationNotFound { query } => {
                write!(f, "Location '{}' not found by the geocoding service", query)
            }
            ClimEnsError::NoInputFiles { model, dir } => write!(
                f,
                "No input files for model '{}' in directory '{}'",
                model,
                dir.display()
            ),
            ClimEnsError::VariableNotFound { var } => {
                write!(f, "Variable '{}' not found", var)
            }
            ClimEnsError::DimensionNotFound { var, dim } => {
                write!(f, "Dimension '{}' not found in variable '{}'", dim, var)
            }
            ClimEnsError::EnsembleMismatch { model, message } => {
                write!(f, "Ensemble member '{}' is incompatible: {}", model, message)
            }
            ClimEnsError::StatisticsError(msg) => {
                write!(f, "Statistics computation error: {}", msg)
            }
            ClimEnsError::ThreadPoolError(msg) => write!(f, "Thread pool error: {}", msg),
            ClimEnsError::Generic(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ClimEnsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClimEnsError::NetCDFError(e) => Some(e),
            ClimEnsError::IoError(e) => Some(e),
            ClimEnsError::ArrayError(e) => Some(e),
            ClimEnsError::HttpError(e) => Some(e),
            ClimEnsError::JsonError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<netcdf::Error> for ClimEnsError {
    fn from(error: netcdf::Error) -> Self {
        ClimEnsError::NetCDFError(error)
    }
}

impl From<std::io::Error> for ClimEnsError {
    fn from(error: std::io::Error) -> Self {
        ClimEnsError::IoError(error)
    }
}

impl From<ndarray::ShapeError> for ClimEnsError {
    fn from(error: ndarray::ShapeError) -> Self {
        ClimEnsError::ArrayError(error)
    }
}

impl From<reqwest::Error> for ClimEnsError {
    fn from(error: reqwest::Error) -> Self {
        ClimEnsError::HttpError(error)
    }
}

impl From<serde_json::Error> for ClimEnsError {
    fn from(error: serde_json::Error) -> Self {
        ClimEnsError::JsonError(error)
    }
}

impl From<String> for ClimEnsError {
    fn from(error: String) -> Self {
        ClimEnsError::Generic(error)
    }
}

impl From<&str> for ClimEnsError {
    fn from(error: &str) -> Self {
        ClimEnsError::Generic(error.to_string())
    }
}

/// Result type alias for ClimEns operations
pub type Result<T> = std::result::Result<T, ClimEnsError>;
