//! Alternative street names (`alt_name`, `official_name`).

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::models::Feature;
use crate::normalize::NameNormalizer;
use crate::sink::{ErrorSink, SideEvent};

/// Normalized name -> names whose candidates are also visible under it.
///
/// With symmetric aliases both directions are recorded, so every name of a
/// connected group sees the addresses of the whole group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasMap {
    sources: BTreeMap<String, BTreeSet<String>>,
}

impl AliasMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `alternative` is another name of `primary`.
    pub fn insert(&mut self, primary: &str, alternative: &str, symmetric: bool) {
        if primary == alternative {
            return;
        }
        self.sources
            .entry(alternative.to_string())
            .or_default()
            .insert(primary.to_string());
        if symmetric {
            self.sources
                .entry(primary.to_string())
                .or_default()
                .insert(alternative.to_string());
        }
    }

    /// Collect aliases from highways tagged with `name` and `name_tag`.
    /// The tag may hold several names separated by ';'.
    pub fn add_from_ways(
        &mut self,
        ways: &[Feature],
        name_tag: &str,
        normalizer: &NameNormalizer,
        symmetric: bool,
        sink: &mut dyn ErrorSink,
    ) {
        let mut normalize = |raw: &str, tag: &str, way: &Feature| match normalizer.normalize(raw) {
            Ok(key) => key,
            Err(e) => {
                sink.report(SideEvent::invalid_name(
                    format!("{}/{} {}", way.osm_type, way.osm_id, tag),
                    &e,
                ));
                raw.to_string()
            }
        };

        for way in ways {
            let (Some(name), Some(alternatives)) = (way.tag("name"), way.tag(name_tag)) else {
                continue;
            };
            let primary = normalize(name, "name", way);
            for alternative in alternatives.split(';').map(str::trim).filter(|s| !s.is_empty()) {
                let alternative = normalize(alternative, name_tag, way);
                debug!("Alias {} -> {}", alternative, primary);
                self.insert(&primary, &alternative, symmetric);
            }
        }
    }

    /// Every name that takes part in an alias relation.
    pub fn names(&self) -> BTreeSet<&str> {
        self.sources
            .iter()
            .flat_map(|(name, sources)| {
                std::iter::once(name.as_str()).chain(sources.iter().map(String::as_str))
            })
            .collect()
    }

    /// `name` plus every name whose candidates it inherits, transitively.
    pub fn sources_of(&self, name: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::from([name.to_string()]);
        let mut stack = vec![name.to_string()];
        while let Some(current) = stack.pop() {
            if let Some(sources) = self.sources.get(&current) {
                for source in sources {
                    if seen.insert(source.clone()) {
                        stack.push(source.clone());
                    }
                }
            }
        }
        seen
    }

    /// Number of names with at least one inherited source.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ReferenceIndex;
    use crate::models::address::{TAG_HOUSENUMBER, TAG_STREET};
    use crate::models::GeoPoint;
    use std::sync::Arc;

    fn highway(id: i64, name: &str, tag: &str, alt: &str) -> Feature {
        Feature::way(id, vec![GeoPoint::new(48.0, 16.0), GeoPoint::new(48.0, 16.001)])
            .with_tag("highway", "primary")
            .with_tag("name", name)
            .with_tag(tag, alt)
    }

    fn address(id: i64, street: &str, number: &str) -> Feature {
        Feature::node(id, GeoPoint::new(48.0, 16.0))
            .with_tag(TAG_STREET, street)
            .with_tag(TAG_HOUSENUMBER, number)
    }

    fn ids(index: &ReferenceIndex, street: &str, number: &str) -> Vec<i64> {
        let mut ids: Vec<i64> = index
            .candidates(street, number)
            .iter()
            .map(|a| a.osm_id)
            .collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_symmetric_insert() {
        let mut aliases = AliasMap::new();
        aliases.insert("a", "b", true);
        aliases.insert("b", "c", true);
        assert_eq!(aliases.sources_of("a"), aliases.sources_of("c"));
        assert_eq!(aliases.sources_of("a").len(), 3);
        assert_eq!(aliases.names().len(), 3);
    }

    #[test]
    fn test_directional_insert() {
        let mut aliases = AliasMap::new();
        aliases.insert("a", "b", false);
        assert_eq!(aliases.sources_of("b").len(), 2);
        assert_eq!(aliases.sources_of("a").len(), 1);
    }

    #[test]
    fn test_self_alias_ignored() {
        let mut aliases = AliasMap::new();
        aliases.insert("a", "a", true);
        assert!(aliases.is_empty());
    }

    #[test]
    fn test_alias_candidates_identical() {
        let normalizer = NameNormalizer::new();
        let mut sink: Vec<SideEvent> = Vec::new();
        let mut index = ReferenceIndex::from_features(
            &[
                address(1, "Hauptstraße", "3"),
                address(2, "Bundesstraße 1", "3"),
                address(3, "Bundesstraße 1", "5"),
            ],
            &normalizer,
            &mut sink,
        );
        let mut aliases = AliasMap::new();
        aliases.add_from_ways(
            &[highway(10, "Hauptstraße", "alt_name", "Bundesstraße 1")],
            "alt_name",
            &normalizer,
            true,
            &mut sink,
        );
        index.apply_aliases(aliases);

        let main = normalizer.normalize("Hauptstraße").unwrap();
        let alt = normalizer.normalize("Bundesstraße 1").unwrap();
        assert_eq!(ids(&index, &main, "3"), vec![1, 2]);
        assert_eq!(ids(&index, &alt, "3"), vec![1, 2]);
        assert_eq!(ids(&index, &main, "5"), vec![3]);

        let a = index.candidates(&main, "3");
        let b = index.candidates(&alt, "3");
        assert!(a.iter().all(|x| b.iter().any(|y| Arc::ptr_eq(x, y))));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_directional_alias_candidates() {
        let normalizer = NameNormalizer::new();
        let mut sink: Vec<SideEvent> = Vec::new();
        let mut index = ReferenceIndex::from_features(
            &[address(1, "Hauptstraße", "3"), address(2, "Bundesstraße 1", "3")],
            &normalizer,
            &mut sink,
        );
        let mut aliases = AliasMap::new();
        aliases.add_from_ways(
            &[highway(10, "Hauptstraße", "official_name", "Bundesstraße 1")],
            "official_name",
            &normalizer,
            false,
            &mut sink,
        );
        index.apply_aliases(aliases);

        let main = normalizer.normalize("Hauptstraße").unwrap();
        let alt = normalizer.normalize("Bundesstraße 1").unwrap();
        assert_eq!(ids(&index, &main, "3"), vec![1]);
        assert_eq!(ids(&index, &alt, "3"), vec![1, 2]);
    }

    #[test]
    fn test_multiple_alternatives() {
        let normalizer = NameNormalizer::new();
        let mut sink: Vec<SideEvent> = Vec::new();
        let mut aliases = AliasMap::new();
        aliases.add_from_ways(
            &[highway(10, "Ring", "alt_name", "Opernring; Burgring")],
            "alt_name",
            &normalizer,
            true,
            &mut sink,
        );
        assert_eq!(aliases.sources_of("ring").len(), 3);
    }
}
