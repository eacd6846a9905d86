//! Address lookup.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use broker_core::GeoPoint;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::BrokerError;

/// Most results a lookup returns.
pub const MAX_GEOCODE_RESULTS: usize = 5;

/// Default search endpoint.
pub const DEFAULT_GEOCODE_URL: &str = "https://nominatim.openstreetmap.org/search";

/// One resolved address.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeResult {
    pub display_name: String,
    pub location: GeoPoint,
}

impl GeocodeResult {
    pub fn new(display_name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            display_name: display_name.into(),
            location: GeoPoint::new(lat, lon),
        }
    }
}

/// Free-text address search.
///
/// Never fails: a transport error or a bad response is reported as no results.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Up to [`MAX_GEOCODE_RESULTS`] candidate locations, possibly none.
    async fn search(&self, query: &str) -> Vec<GeocodeResult>;
}

/// Raw Nominatim search hit. Coordinates arrive as strings.
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    #[serde(default)]
    display_name: String,
    lat: String,
    lon: String,
}

/// Geocoder backed by a Nominatim-compatible HTTP endpoint.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    http: reqwest::Client,
    url: String,
}

impl NominatimGeocoder {
    /// Build a geocoder. Nominatim's usage policy requires an identifying User-Agent.
    pub fn new(url: impl Into<String>, user_agent: &str) -> Result<Self, BrokerError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(user_agent)
            .build()
            .map_err(|e| BrokerError::Config(format!("geocoder client: {}", e)))?;

        Ok(Self {
            http,
            url: url.into(),
        })
    }

    async fn fetch(&self, query: &str) -> Result<Vec<GeocodeResult>, BrokerError> {
        let limit = MAX_GEOCODE_RESULTS.to_string();
        let response = self
            .http
            .get(&self.url)
            .query(&[
                ("format", "json"),
                ("q", query),
                ("limit", limit.as_str()),
                ("addressdetails", "0"),
            ])
            .send()
            .await
            .map_err(|e| BrokerError::GeocodeUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BrokerError::GeocodeUnavailable(format!("HTTP {}", status)));
        }

        let places: Vec<NominatimPlace> = response
            .json()
            .await
            .map_err(|e| BrokerError::GeocodeUnavailable(e.to_string()))?;

        Ok(convert_places(places))
    }
}

/// Keep hits with parseable coordinates, capped at [`MAX_GEOCODE_RESULTS`].
fn convert_places(places: Vec<NominatimPlace>) -> Vec<GeocodeResult> {
    places
        .into_iter()
        .filter_map(|p| {
            let lat = p.lat.trim().parse::<f64>().ok()?;
            let lon = p.lon.trim().parse::<f64>().ok()?;
            Some(GeocodeResult::new(p.display_name, lat, lon))
        })
        .take(MAX_GEOCODE_RESULTS)
        .collect()
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn search(&self, query: &str) -> Vec<GeocodeResult> {
        match self.fetch(query).await {
            Ok(results) => {
                debug!("Geocoded {:?}: {} results", query, results.len());
                results
            }
            Err(e) => {
                warn!("Geocoding {:?} failed: {}", query, e);
                Vec::new()
            }
        }
    }
}

/// Canned geocoder for tests and offline runs. Lookups ignore case and
/// surrounding whitespace.
#[derive(Debug, Clone, Default)]
pub struct StaticGeocoder {
    entries: HashMap<String, Vec<GeocodeResult>>,
}

impl StaticGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the results for a query.
    pub fn with(mut self, query: &str, results: Vec<GeocodeResult>) -> Self {
        self.entries.insert(Self::key(query), results);
        self
    }

    fn key(query: &str) -> String {
        query.trim().to_lowercase()
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn search(&self, query: &str) -> Vec<GeocodeResult> {
        self.entries
            .get(&Self::key(query))
            .map(|r| r.iter().take(MAX_GEOCODE_RESULTS).cloned().collect())
            .unwrap_or_default()
    }
}
