//! The lookups the reconciliation core issues, rendered as Overpass QL.

use crate::models::{BoundingBox, GeoPoint};

/// Highway classes considered when looking for nearby streets.
const NEARBY_HIGHWAY_CLASSES: &str = "residential|unclassified|primary|secondary|tertiary|service";

/// Meters per degree of latitude, used to turn a radius into a bbox.
const METERS_PER_DEGREE: f64 = 111_320.0;

/// One lookup against the geodata service.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureQuery {
    /// Every node/way/relation with a housenumber in the box, with centers
    AddressesInBox { bbox: BoundingBox },
    /// Addressed features within `radius` meters of a point
    AddressesAround { center: GeoPoint, radius: f64 },
    /// Highways carrying both `name` and the given alternative name tag
    NamedHighways { bbox: BoundingBox, name_tag: String },
    /// Every highway in the box, with full geometry
    Highways { bbox: BoundingBox },
    /// Places (villages, hamlets, localities, ...) in the box, named under any tag
    Places { bbox: BoundingBox },
    /// Ordinary streets within `radius` meters of a point
    HighwaysAround { center: GeoPoint, radius: f64 },
    /// Housenumbers lacking both `addr:street` and `addr:place`
    UnnamedHousenumbers { bbox: BoundingBox },
}

impl FeatureQuery {
    /// Query body without the `[out:json]` settings header. Identical
    /// bodies describe identical lookups, so this doubles as cache key.
    pub fn to_ql(&self) -> String {
        match self {
            FeatureQuery::AddressesInBox { bbox } => {
                format!("nwr[\"addr:housenumber\"]{};out center;", bbox.to_overpass())
            }
            FeatureQuery::AddressesAround { center, radius } => format!(
                "nwr[\"addr:housenumber\"](around:{},{},{});out center;",
                radius, center.lat, center.lon
            ),
            FeatureQuery::NamedHighways { bbox, name_tag } => format!(
                "way[highway][{}][name]{};out tags;",
                quote(name_tag),
                bbox.to_overpass()
            ),
            FeatureQuery::Highways { bbox } => {
                format!("way[highway]{};out geom;", bbox.to_overpass())
            }
            FeatureQuery::Places { bbox } => {
                format!("nwr[place]{};out center;", bbox.to_overpass())
            }
            FeatureQuery::HighwaysAround { center, radius } => format!(
                "way[highway~\"^({})$\"](around:{},{},{});out tags;",
                NEARBY_HIGHWAY_CLASSES, radius, center.lat, center.lon
            ),
            FeatureQuery::UnnamedHousenumbers { bbox } => format!(
                "nwr[\"addr:housenumber\"][!\"addr:street\"][!\"addr:place\"]{};out center;",
                bbox.to_overpass()
            ),
        }
    }

    /// Area the query covers, for error reports.
    pub fn region(&self) -> BoundingBox {
        match self {
            FeatureQuery::AddressesInBox { bbox }
            | FeatureQuery::NamedHighways { bbox, .. }
            | FeatureQuery::Highways { bbox }
            | FeatureQuery::Places { bbox }
            | FeatureQuery::UnnamedHousenumbers { bbox } => *bbox,
            FeatureQuery::AddressesAround { center, radius }
            | FeatureQuery::HighwaysAround { center, radius } => {
                let d_lat = radius / METERS_PER_DEGREE;
                let d_lon = d_lat / center.lat.to_radians().cos().max(1e-6);
                BoundingBox::new(
                    center.lat - d_lat,
                    center.lon - d_lon,
                    center.lat + d_lat,
                    center.lon + d_lon,
                )
            }
        }
    }
}

/// Quote a tag key for use in a filter.
fn quote(key: &str) -> String {
    format!("\"{}\"", key.replace('\\', "\\\\").replace('"', "\\\""))
}
