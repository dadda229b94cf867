//! Coordinates, bounding boxes and OSM object kinds.

use serde::{Deserialize, Serialize};

use crate::geodesy;

/// Type of OSM object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsmType {
    Node,
    Way,
    Relation,
}

impl std::fmt::Display for OsmType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OsmType::Node => write!(f, "node"),
            OsmType::Way => write!(f, "way"),
            OsmType::Relation => write!(f, "relation"),
        }
    }
}

/// Geographic point (lat/lon, degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl From<geo::Coord<f64>> for GeoPoint {
    fn from(c: geo::Coord<f64>) -> Self {
        Self { lat: c.y, lon: c.x }
    }
}

impl From<GeoPoint> for geo::Coord<f64> {
    fn from(p: GeoPoint) -> Self {
        geo::Coord { x: p.lon, y: p.lat }
    }
}

/// Axis-aligned bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    /// Smallest box containing all points, `None` for an empty iterator.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = GeoPoint>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = Self::new(first.lat, first.lon, first.lat, first.lon);
        for p in iter {
            bbox.min_lat = bbox.min_lat.min(p.lat);
            bbox.min_lon = bbox.min_lon.min(p.lon);
            bbox.max_lat = bbox.max_lat.max(p.lat);
            bbox.max_lon = bbox.max_lon.max(p.lon);
        }
        Some(bbox)
    }

    /// Union of two boxes
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_lat: self.min_lat.min(other.min_lat),
            min_lon: self.min_lon.min(other.min_lon),
            max_lat: self.max_lat.max(other.max_lat),
            max_lon: self.max_lon.max(other.max_lon),
        }
    }

    /// Grow the box by `tolerance` degrees on every side.
    pub fn expand(&self, tolerance: f64) -> BoundingBox {
        BoundingBox {
            min_lat: self.min_lat - tolerance,
            min_lon: self.min_lon - tolerance,
            max_lat: self.max_lat + tolerance,
            max_lon: self.max_lon + tolerance,
        }
    }

    /// Great-circle distance between the south-west and north-east corners.
    pub fn diagonal(&self) -> f64 {
        geodesy::distance(
            GeoPoint::new(self.min_lat, self.min_lon),
            GeoPoint::new(self.max_lat, self.max_lon),
        )
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    pub fn contains(&self, p: GeoPoint) -> bool {
        p.lat >= self.min_lat && p.lat <= self.max_lat && p.lon >= self.min_lon && p.lon <= self.max_lon
    }

    /// Overpass QL bbox filter: `(south,west,north,east)`
    pub fn to_overpass(&self) -> String {
        format!(
            "({},{},{},{})",
            self.min_lat, self.min_lon, self.max_lat, self.max_lon
        )
    }

    /// Link to the box center on openstreetmap.org at the given zoom.
    pub fn osm_link(&self, zoom: u8) -> String {
        let c = self.center();
        format!("https://www.openstreetmap.org/#map={}/{}/{}", zoom, c.lat, c.lon)
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{:.6},{:.6} .. {:.6},{:.6}]",
            self.min_lat, self.min_lon, self.max_lat, self.max_lon
        )
    }
}
