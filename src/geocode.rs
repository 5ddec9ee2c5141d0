//! Place-name geocoding via the Nominatim HTTP API
//!
//! This module resolves free-text place names ("Paris, France") to a
//! `(latitude, longitude)` pair. The lookup itself is behind the
//! [`GeocodeService`] trait so callers can substitute a stub service in tests
//! or swap in a different provider; [`Nominatim`] is the bundled
//! implementation against <https://nominatim.openstreetmap.org>.
//!
//! The service returns coordinates as decimal strings; [`get_coords`] parses
//! them and turns an empty result set into an explicit
//! [`LocationNotFound`](crate::errors::ClimEnsError::LocationNotFound) error
//! instead of letting callers trip over a missing record.

use crate::errors::{ClimEnsError, Result};
use async_trait::async_trait;
use serde::Deserialize;

/// Default Nominatim endpoint. Override with [`Nominatim::with_endpoint`]
/// to point at a self-hosted instance.
pub const NOMINATIM_ENDPOINT: &str = "https://nominatim.openstreetmap.org";

/// User-Agent sent with every request; Nominatim's usage policy requires
/// an identifying agent string.
const USER_AGENT: &str = concat!("clim_ens/", env!("CARGO_PKG_VERSION"));

/// One geocoding match as returned by the service.
///
/// Nominatim serializes coordinates as decimal strings, so they are kept as
/// strings here and parsed in [`get_coords`].
#[derive(Debug, Clone, Deserialize)]
pub struct Place {
    pub lat: String,
    pub lon: String,
    #[serde(default)]
    pub display_name: String,
}

/// A geocoding backend: maps a free-text query to at most one [`Place`].
#[async_trait]
pub trait GeocodeService {
    /// Look up `query`, returning `Ok(None)` when the service has no match.
    async fn lookup(&self, query: &str) -> Result<Option<Place>>;
}

/// Geocoding client for the Nominatim search API.
#[derive(Debug, Clone)]
pub struct Nominatim {
    client: reqwest::Client,
    endpoint: String,
}

impl Nominatim {
    /// Create a client against the public Nominatim endpoint.
    #[must_use]
    pub fn new() -> Self {
        Self::with_endpoint(NOMINATIM_ENDPOINT)
    }

    /// Create a client against a custom endpoint (e.g. a self-hosted
    /// instance, or a local stub server in tests).
    #[must_use]
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

impl Default for Nominatim {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GeocodeService for Nominatim {
    async fn lookup(&self, query: &str) -> Result<Option<Place>> {
        let url = format!("{}/search", self.endpoint.trim_end_matches('/'));
        let body = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let mut places: Vec<Place> = serde_json::from_str(&body)?;
        if places.is_empty() {
            Ok(None)
        } else {
            Ok(Some(places.remove(0)))
        }
    }
}

/// Resolves a place name to `(latitude, longitude)` through `service`.
///
/// Logs one line with the resolved place and coordinates.
///
/// # Errors
///
/// Returns [`ClimEnsError::LocationNotFound`] when the service has no match,
/// or a transport/parse error from the underlying lookup.
pub async fn get_coords<G>(service: &G, query: &str) -> Result<(f64, f64)>
where
    G: GeocodeService + ?Sized,
{
    let place = service
        .lookup(query)
        .await?
        .ok_or_else(|| ClimEnsError::LocationNotFound {
            query: query.to_string(),
        })?;

    let latitude: f64 = place.lat.parse().map_err(|e| {
        ClimEnsError::Generic(format!("Invalid latitude '{}' in geocoder response: {}", place.lat, e))
    })?;
    let longitude: f64 = place.lon.parse().map_err(|e| {
        ClimEnsError::Generic(format!("Invalid longitude '{}' in geocoder response: {}", place.lon, e))
    })?;

    println!(
        "📍 Location '{}' -> {} ({:.4}, {:.4})",
        query, place.display_name, latitude, longitude
    );

    Ok((latitude, longitude))
}

/// Synchronous convenience wrapper around [`get_coords`] with the default
/// [`Nominatim`] client, for one-shot batch scripts without an async runtime.
///
/// # Errors
///
/// Same conditions as [`get_coords`], plus runtime construction failure.
pub fn get_coords_blocking(query: &str) -> Result<(f64, f64)> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(get_coords(&Nominatim::new(), query))
}
