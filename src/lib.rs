//! ClimEns: multi-model climate ensembles and extreme-temperature indices
//!
//! A Rust library for loading multi-model climate datasets from NetCDF
//! files, stacking them into a single aligned ensemble, and computing
//! extreme-temperature indices (diurnal temperature range, heat wave and
//! hot spell metrics) from the temperature fields. A small geocoding
//! adapter resolves place names to coordinates for location-based analysis.
//!
//! ## Key Features
//!
//! - **Multi-file datasets**: A model's files open as one logical dataset,
//!   concatenated along `time` and read lazily in fixed time chunks
//! - **Ensemble construction**: Members stacked along a `realization`
//!   dimension on their common time axis, fully materialized
//! - **Ensemble statistics**: Parallel mean/stdev/min/max reductions over
//!   the realization axis using Rayon
//! - **Extreme-temperature indices**: `dtr`, `dtrv`, `etr`, `hwf`, `hwi`,
//!   `hwtl`, `hsf`, `hwml` from raw or aggregated variables
//! - **Geocoding**: Async Nominatim lookups with explicit not-found errors
//!
//! ## Module Organization
//!
//! - [`loader`]: Directory scanning and multi-file NetCDF datasets
//! - [`ensemble`]: Ensemble construction and aggregation
//! - [`indices`]: Extreme-temperature index calculations
//! - [`statistics`]: Statistical reductions over ensemble axes
//! - [`geocode`]: Place-name geocoding via Nominatim
//! - [`parallel`]: Parallel processing configuration
//! - [`errors`]: Centralized error handling
//!
//! ## Usage
//!
//! ```rust,no_run
//! use clim_ens::prelude::*;
//! use std::path::Path;
//!
//! fn main() -> clim_ens::Result<()> {
//!     // One lazily-chunked dataset per model, matched by file name
//!     let data = load_model_datasets(Path::new("/data/cmip6/tasmax"), "CanESM5,MIROC6")?;
//!
//!     // Stack the members along `realization` on their common time axis
//!     let ensemble = build_ensemble(data)?;
//!     ensemble.print_summary();
//!
//!     // Derive the extreme-temperature indices from the raw members
//!     let indices = extreme_temperature_indices(&ensemble, false)?;
//!     for index in indices.iter() {
//!         println!("{} ({})", index.name, index.dims.join(", "));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! The library is designed for one-shot batch analysis: every operation
//! either returns a complete value or fails with a distinct, named error.

// Core modules
pub mod ensemble;
pub mod errors;
pub mod geocode;
pub mod indices;
pub mod loader;
pub mod parallel;
pub mod statistics;

// Direct re-exports for the public API
pub use ensemble::*;
pub use errors::*;
pub use geocode::*;
pub use indices::*;
pub use loader::*;
pub use parallel::*;
pub use statistics::*;

// High-level convenience API
pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::ensemble::{build_ensemble, Ensemble, EnsembleVariable};
    pub use crate::errors::{ClimEnsError, Result};
    pub use crate::geocode::{get_coords, get_coords_blocking, GeocodeService, Nominatim};
    pub use crate::indices::{extreme_temperature_indices, IndexCollection, INDEX_NAMES};
    pub use crate::loader::{load_model_datasets, MfDataset, DEFAULT_TIME_CHUNK};
    pub use crate::parallel::ParallelConfig;
    pub use crate::statistics::{StatOperation, StatisticalReduction};
}
