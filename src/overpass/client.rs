//! Blocking Overpass API client.

use reqwest::blocking::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::{FeatureQuery, GeodataService};
use crate::error::{ReconcileError, Result};
use crate::models::{Feature, GeoPoint, OsmType};

pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";
pub const LOCAL_OVERPASS_URL: &str = "http://localhost/cgi-bin/overpass-api/interpreter";

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
    /// Set by the server on runtime errors such as timeouts
    remark: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(rename = "type")]
    osm_type: OsmType,
    id: i64,
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<LatLon>,
    geometry: Option<Vec<Option<LatLon>>>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct LatLon {
    lat: f64,
    lon: f64,
}

impl From<LatLon> for GeoPoint {
    fn from(p: LatLon) -> Self {
        GeoPoint::new(p.lat, p.lon)
    }
}

impl OverpassElement {
    fn into_feature(self) -> Feature {
        let center = match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
            _ => self.center.map(GeoPoint::from),
        };
        let geometry = self.geometry.map(|points| {
            geo::LineString::new(
                points
                    .into_iter()
                    .flatten()
                    .map(|p| geo::Coord { x: p.lon, y: p.lat })
                    .collect(),
            )
        });
        Feature {
            osm_type: self.osm_type,
            osm_id: self.id,
            tags: self.tags,
            center,
            geometry,
        }
    }
}

/// Talks to an Overpass API interpreter endpoint.
pub struct OverpassClient {
    client: Client,
    url: Url,
    timeout_secs: u64,
}

impl OverpassClient {
    pub fn new(url: &str, timeout_secs: u64) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| ReconcileError::Config(format!("invalid Overpass URL {}: {}", url, e)))?;
        let client = Client::builder()
            .user_agent(concat!("addrsync/", env!("CARGO_PKG_VERSION")))
            // leave the server room to report its own timeout first
            .timeout(Duration::from_secs(timeout_secs + 30))
            .build()
            .map_err(|e| ReconcileError::Config(format!("failed to create HTTP client: {}", e)))?;

        info!("Using Overpass API at {}", url);

        Ok(Self {
            client,
            url,
            timeout_secs,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn full_query(&self, query: &FeatureQuery) -> String {
        format!("[out:json][timeout:{}];{}", self.timeout_secs, query.to_ql())
    }
}

impl GeodataService for OverpassClient {
    fn query(&self, query: &FeatureQuery) -> Result<Vec<Feature>> {
        let ql = self.full_query(query);
        let service_error = |message: String| ReconcileError::Service {
            bbox: query.region(),
            message,
        };

        debug!("Overpass query: {}", ql);

        let response = self
            .client
            .post(self.url.clone())
            .form(&[("data", ql.as_str())])
            .send()
            .map_err(|e| service_error(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(service_error(format!(
                "status {}: {}",
                status,
                body.chars().take(300).collect::<String>()
            )));
        }

        let data: OverpassResponse = response
            .json()
            .map_err(|e| service_error(format!("failed to parse response: {}", e)))?;

        if let Some(remark) = data.remark.filter(|r| r.contains("error")) {
            return Err(service_error(remark));
        }

        debug!("Overpass returned {} elements", data.elements.len());

        Ok(data
            .elements
            .into_iter()
            .map(OverpassElement::into_feature)
            .collect())
    }
}
