//! Features returned by the geodata service.

use geo::Centroid;
use geo_types::LineString;
use std::collections::HashMap;

use super::{GeoPoint, OsmType};

/// A node, way or relation with its tags and whatever geometry the
/// service delivered for it.
#[derive(Debug, Clone)]
pub struct Feature {
    pub osm_type: OsmType,
    pub osm_id: i64,
    pub tags: HashMap<String, String>,
    /// Node position, or the server-side center of a way/relation
    pub center: Option<GeoPoint>,
    /// Full way geometry (`out geom`), lon/lat coordinates
    pub geometry: Option<LineString<f64>>,
}

impl Feature {
    pub fn node(osm_id: i64, point: GeoPoint) -> Self {
        Self {
            osm_type: OsmType::Node,
            osm_id,
            tags: HashMap::new(),
            center: Some(point),
            geometry: None,
        }
    }

    pub fn way(osm_id: i64, geometry: Vec<GeoPoint>) -> Self {
        Self {
            osm_type: OsmType::Way,
            osm_id,
            tags: HashMap::new(),
            center: None,
            geometry: Some(LineString::new(
                geometry.into_iter().map(Into::into).collect(),
            )),
        }
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_center(mut self, center: GeoPoint) -> Self {
        self.center = Some(center);
        self
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Representative location: the center if present, otherwise the
    /// centroid of the geometry.
    pub fn location(&self) -> Option<GeoPoint> {
        if let Some(center) = self.center {
            return Some(center);
        }
        self.geometry
            .as_ref()
            .and_then(|line| line.centroid())
            .map(|p| GeoPoint::new(p.y(), p.x()))
    }

    /// Vertices of the way geometry in order (empty for nodes).
    pub fn vertices(&self) -> Vec<GeoPoint> {
        self.geometry
            .as_ref()
            .map(|line| line.coords().map(|c| GeoPoint::from(*c)).collect())
            .unwrap_or_default()
    }
}
