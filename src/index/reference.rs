//! Known address points of a region, keyed by street and housenumber.

use hashbrown::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::alias::AliasMap;
use crate::error::Result;
use crate::models::address::{TAG_CITY, TAG_HOUSENUMBER, TAG_PLACE, TAG_STREET, TAG_UNIT};
use crate::models::{BoundingBox, Feature, GeoPoint, OsmType};
use crate::normalize::NameNormalizer;
use crate::overpass::{FeatureQuery, GeodataService};
use crate::sink::{ErrorSink, SideEvent};

/// An address already present in the geodata.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceAddress {
    pub osm_type: OsmType,
    pub osm_id: i64,
    /// Normalized street (or place) key
    pub street: String,
    /// Every housenumber key this address is filed under
    pub housenumber_keys: Vec<String>,
    pub location: GeoPoint,
    pub city: Option<String>,
    pub unit: Option<String>,
}

type Bucket = HashMap<String, Vec<Arc<ReferenceAddress>>>;

/// Street key -> housenumber key -> reference addresses.
///
/// Built once per region and read-only afterwards.
#[derive(Debug, Default)]
pub struct ReferenceIndex {
    streets: HashMap<String, Bucket>,
    aliases: AliasMap,
    address_count: usize,
}

/// Split a raw housenumber into its lookup key and unit.
///
/// "12/3" becomes ("12", Some("3")) unless an explicit unit is given, in
/// which case the whole lowercased number is the key.
pub fn housenumber_key(raw: &str, unit: Option<&str>) -> (String, Option<String>) {
    let lower = raw.trim().to_lowercase();
    if let Some(unit) = unit {
        return (lower, Some(unit.to_string()));
    }
    match lower.split_once('/') {
        Some((number, unit)) => (number.to_string(), Some(unit.to_string())),
        None => (lower, None),
    }
}

/// Widest housenumber range that is expanded into single numbers.
pub const MAX_RANGE_SPAN: i64 = 500;

/// Single numbers covered by a simple range such as "49-51".
///
/// Steps by two from the lower bound, since odd and even numbers sit on
/// opposite sides of a street. Anything that is not two integers yields
/// nothing, and so does a range wider than [`MAX_RANGE_SPAN`].
pub fn expand_range(key: &str) -> Vec<String> {
    let Some((lower, upper)) = key.split_once('-') else {
        return Vec::new();
    };
    let (Ok(lower), Ok(upper)) = (lower.trim().parse::<i64>(), upper.trim().parse::<i64>()) else {
        return Vec::new();
    };
    if upper.saturating_sub(lower) > MAX_RANGE_SPAN {
        debug!("Not expanding housenumber range {}", key);
        return Vec::new();
    }
    (lower..=upper).step_by(2).map(|n| n.to_string()).collect()
}

impl ReferenceIndex {
    /// Query the addresses and alternative street names of `bbox` and build
    /// the index. Nothing is returned if any query fails.
    pub fn build<S: GeodataService + ?Sized>(
        service: &S,
        bbox: &BoundingBox,
        normalizer: &NameNormalizer,
        symmetric_aliases: bool,
        sink: &mut dyn ErrorSink,
    ) -> Result<Self> {
        info!("Building reference index for {}", bbox);

        let features = service.query(&FeatureQuery::AddressesInBox { bbox: *bbox })?;
        let mut index = Self::from_features(&features, normalizer, sink);

        let mut aliases = AliasMap::new();
        for name_tag in ["alt_name", "official_name"] {
            let ways = service.query(&FeatureQuery::NamedHighways {
                bbox: *bbox,
                name_tag: name_tag.to_string(),
            })?;
            aliases.add_from_ways(&ways, name_tag, normalizer, symmetric_aliases, sink);
        }
        index.apply_aliases(aliases);

        info!(
            "Reference index built: {} addresses on {} streets, {} alias names",
            index.address_count,
            index.streets.len(),
            index.aliases.len()
        );
        Ok(index)
    }

    /// Build from already fetched addressed features, without aliases.
    pub fn from_features(
        features: &[Feature],
        normalizer: &NameNormalizer,
        sink: &mut dyn ErrorSink,
    ) -> Self {
        let mut index = Self::default();

        for feature in features {
            let Some(raw_street) = feature.tag(TAG_STREET).or_else(|| feature.tag(TAG_PLACE))
            else {
                continue;
            };
            let Some(raw_number) = feature.tag(TAG_HOUSENUMBER) else {
                continue;
            };
            let Some(location) = feature.location() else {
                debug!(
                    "Skipping {}/{} without location",
                    feature.osm_type, feature.osm_id
                );
                continue;
            };

            let street = match normalizer.normalize(raw_street) {
                Ok(key) => key,
                Err(e) => {
                    sink.report(SideEvent::invalid_name(
                        format!("{}/{}", feature.osm_type, feature.osm_id),
                        &e,
                    ));
                    raw_street.to_string()
                }
            };

            let (key, unit) = housenumber_key(raw_number, feature.tag(TAG_UNIT));
            let mut keys = vec![key.clone()];
            if key.contains('-') {
                for n in expand_range(&key) {
                    if !keys.contains(&n) {
                        keys.push(n);
                    }
                }
            }

            let address = Arc::new(ReferenceAddress {
                osm_type: feature.osm_type,
                osm_id: feature.osm_id,
                street: street.clone(),
                housenumber_keys: keys.clone(),
                location,
                city: feature.tag(TAG_CITY).map(str::to_string),
                unit,
            });

            let bucket = index.streets.entry(street).or_default();
            for k in keys {
                bucket.entry(k).or_default().push(Arc::clone(&address));
            }
            index.address_count += 1;
        }

        index
    }

    /// Merge housenumber buckets so that every name resolves to the
    /// candidates of all names it is an alias of.
    pub fn apply_aliases(&mut self, aliases: AliasMap) {
        let mut merged: Vec<(String, Bucket)> = Vec::new();

        for name in aliases.names() {
            let mut bucket = Bucket::new();
            for source in aliases.sources_of(name) {
                if let Some(other) = self.streets.get(&source) {
                    merge_bucket(&mut bucket, other);
                }
            }
            if !bucket.is_empty() {
                merged.push((name.to_string(), bucket));
            }
        }

        for (name, bucket) in merged {
            self.streets.insert(name, bucket);
        }
        self.aliases = aliases;
    }

    /// Candidates filed under a street and housenumber key.
    pub fn candidates(&self, street: &str, housenumber: &str) -> &[Arc<ReferenceAddress>] {
        self.streets
            .get(street)
            .and_then(|bucket| bucket.get(housenumber))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains_street(&self, street: &str) -> bool {
        self.streets.contains_key(street)
    }

    pub fn aliases(&self) -> &AliasMap {
        &self.aliases
    }

    /// Number of distinct reference points (not counting range copies)
    pub fn len(&self) -> usize {
        self.address_count
    }

    pub fn is_empty(&self) -> bool {
        self.address_count == 0
    }

    pub fn street_count(&self) -> usize {
        self.streets.len()
    }
}

fn merge_bucket(into: &mut Bucket, from: &Bucket) {
    for (number, addresses) in from {
        let target = into.entry(number.clone()).or_default();
        for address in addresses {
            if !target.iter().any(|a| Arc::ptr_eq(a, address)) {
                target.push(Arc::clone(address));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(id: i64, street: &str, number: &str, lat: f64, lon: f64) -> Feature {
        Feature::node(id, GeoPoint::new(lat, lon))
            .with_tag(TAG_STREET, street)
            .with_tag(TAG_HOUSENUMBER, number)
    }

    fn build(features: &[Feature]) -> ReferenceIndex {
        let mut sink: Vec<SideEvent> = Vec::new();
        ReferenceIndex::from_features(features, &NameNormalizer::new(), &mut sink)
    }

    #[test]
    fn test_housenumber_key() {
        assert_eq!(housenumber_key("12A", None), ("12a".to_string(), None));
        assert_eq!(
            housenumber_key("12/3", None),
            ("12".to_string(), Some("3".to_string()))
        );
        assert_eq!(
            housenumber_key("12/3", Some("7")),
            ("12/3".to_string(), Some("7".to_string()))
        );
    }

    #[test]
    fn test_expand_range() {
        assert_eq!(expand_range("49-51"), vec!["49", "51"]);
        assert_eq!(expand_range("2-8"), vec!["2", "4", "6", "8"]);
        assert_eq!(expand_range("3-6"), vec!["3", "5"]);
        assert!(expand_range("12a-14").is_empty());
        assert!(expand_range("12").is_empty());
        assert!(expand_range("9-7").is_empty());
    }

    #[test]
    fn test_wide_range_not_expanded() {
        assert!(expand_range("1-40000001").is_empty());
        assert_eq!(expand_range("1-501").len(), 251);

        let index = build(&[address(1, "Hauptstraße", "1-40000001", 48.0, 16.0)]);
        let street = NameNormalizer::new().normalize("Hauptstraße").unwrap();
        assert_eq!(index.candidates(&street, "1-40000001").len(), 1);
        assert!(index.candidates(&street, "3").is_empty());
    }

    #[test]
    fn test_range_filed_under_all_keys() {
        let index = build(&[address(1, "Hauptstraße", "49-51", 48.0, 16.0)]);
        let street = NameNormalizer::new().normalize("Hauptstraße").unwrap();

        let by_range = index.candidates(&street, "49-51");
        let by_lower = index.candidates(&street, "49");
        let by_upper = index.candidates(&street, "51");
        assert_eq!(by_range.len(), 1);
        assert!(Arc::ptr_eq(&by_range[0], &by_lower[0]));
        assert!(Arc::ptr_eq(&by_range[0], &by_upper[0]));
        assert!(index.candidates(&street, "50").is_empty());
        assert_eq!(by_range[0].housenumber_keys, vec!["49-51", "49", "51"]);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_unit_split_and_tags() {
        let index = build(&[
            address(1, "Hauptstraße", "12/3", 48.0, 16.0).with_tag(TAG_CITY, "Wien"),
            address(2, "Hauptstraße", "14", 48.0, 16.0).with_tag(TAG_UNIT, "Top 2"),
        ]);
        let street = NameNormalizer::new().normalize("Hauptstraße").unwrap();

        let twelve = index.candidates(&street, "12");
        assert_eq!(twelve[0].unit.as_deref(), Some("3"));
        assert_eq!(twelve[0].city.as_deref(), Some("Wien"));
        assert_eq!(
            index.candidates(&street, "14")[0].unit.as_deref(),
            Some("Top 2")
        );
    }

    #[test]
    fn test_place_fallback_and_skips() {
        let index = build(&[
            Feature::node(1, GeoPoint::new(48.0, 16.0))
                .with_tag(TAG_PLACE, "Oberdorf")
                .with_tag(TAG_HOUSENUMBER, "5"),
            Feature::node(2, GeoPoint::new(48.0, 16.0)).with_tag(TAG_HOUSENUMBER, "7"),
        ]);
        assert_eq!(index.candidates("oberdorf", "5").len(), 1);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_invalid_name_uses_raw_key() {
        let mut sink: Vec<SideEvent> = Vec::new();
        let index = ReferenceIndex::from_features(
            &[address(9, "Straße №1", "1", 48.0, 16.0)],
            &NameNormalizer::new(),
            &mut sink,
        );
        assert_eq!(index.candidates("Straße №1", "1").len(), 1);
        assert_eq!(sink.len(), 1);
        assert!(matches!(&sink[0], SideEvent::InvalidName { source, .. } if source == "node/9"));
    }

    #[test]
    fn test_way_uses_center() {
        let way = Feature::way(5, vec![GeoPoint::new(48.0, 16.0), GeoPoint::new(48.0, 16.001)])
            .with_center(GeoPoint::new(48.0001, 16.0005))
            .with_tag(TAG_STREET, "Ring")
            .with_tag(TAG_HOUSENUMBER, "1");
        let index = build(&[way]);
        let found = index.candidates("ring", "1");
        assert_eq!(found[0].location, GeoPoint::new(48.0001, 16.0005));
        assert_eq!(found[0].osm_type, OsmType::Way);
    }
}
