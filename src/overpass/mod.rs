//! Geodata lookups against OpenStreetMap via the Overpass API.

mod client;
mod query;

pub use client::{OverpassClient, DEFAULT_OVERPASS_URL, LOCAL_OVERPASS_URL};
pub use query::FeatureQuery;

use crate::error::Result;
use crate::models::Feature;

/// A blocking source of OSM features.
///
/// A failed query is fatal for the current region; implementations do not
/// retry.
pub trait GeodataService {
    fn query(&self, query: &FeatureQuery) -> Result<Vec<Feature>>;
}

impl<T: GeodataService + ?Sized> GeodataService for &T {
    fn query(&self, query: &FeatureQuery) -> Result<Vec<Feature>> {
        (**self).query(query)
    }
}
