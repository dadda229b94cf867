//! Per-record classification against the reference index.

use hashbrown::{HashMap, HashSet};
use std::cell::RefCell;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::bounds::working_region;
use super::lookup::{CancelToken, Lookups};
use super::report::{FileSummary, RunReport};
use crate::batch::BatchFile;
use crate::config::ReconcileConfig;
use crate::error::{ReconcileError, Result};
use crate::geodesy;
use crate::index::{housenumber_key, ReferenceAddress, ReferenceIndex};
use crate::models::{AddressRecord, BoundingBox, Diagnostic, Feature, GeoPoint, NameSource};
use crate::normalize::NameNormalizer;
use crate::overpass::{FeatureQuery, GeodataService};
use crate::sink::{CountingSink, ErrorSink, SideEvent};

/// Tags that may carry the name an address refers to, on highways and places.
const NAME_TAGS: &[&str] = &["name", "alt_name", "official_name", "short_name", "name:de"];

/// What happens to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing suspicious; keep as is
    Keep,
    /// Already mapped; drop from the output
    Suppress,
    /// Keep, with at least one diagnostic attached
    Flag,
    /// Malformed; passed through unchecked
    Skipped,
}

/// Highways of a region, indexed by every normalized name they carry.
struct RegionStreets {
    highways: Arc<Vec<Feature>>,
    by_name: HashMap<String, Vec<usize>>,
}

/// Checks candidate addresses against what is already mapped.
pub struct Reconciler<S> {
    config: ReconcileConfig,
    normalizer: NameNormalizer,
    lookups: Lookups<S>,
    streets: RefCell<HashMap<String, Arc<RegionStreets>>>,
    places: RefCell<HashMap<String, Arc<HashSet<String>>>>,
}

impl<S: GeodataService> Reconciler<S> {
    pub fn new(service: S, config: ReconcileConfig) -> Self {
        Self::with_cancel_token(service, config, CancelToken::new())
    }

    pub fn with_cancel_token(service: S, config: ReconcileConfig, cancel: CancelToken) -> Self {
        let normalizer = NameNormalizer::with_expansion(config.expand_abbreviations);
        Self {
            config,
            normalizer,
            lookups: Lookups::new(service, cancel),
            streets: RefCell::new(HashMap::new()),
            places: RefCell::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &NameNormalizer {
        &self.normalizer
    }

    pub fn cancel_token(&self) -> &CancelToken {
        self.lookups.cancel_token()
    }

    /// Number of queries sent to the geodata service so far.
    pub fn queries_issued(&self) -> usize {
        self.lookups.issued()
    }

    /// Reference index for `region`.
    pub fn build_index(
        &self,
        region: &BoundingBox,
        sink: &mut dyn ErrorSink,
    ) -> Result<ReferenceIndex> {
        ReferenceIndex::build(
            &self.lookups,
            region,
            &self.normalizer,
            self.config.symmetric_aliases,
            sink,
        )
    }

    /// Classify one record, attaching diagnostics when it is flagged.
    ///
    /// A suppressed record is left unmodified; removing it is up to the
    /// caller.
    pub fn classify(
        &self,
        record: &mut AddressRecord,
        index: &ReferenceIndex,
        region: &BoundingBox,
        sink: &mut dyn ErrorSink,
    ) -> Result<Outcome> {
        let Some((raw_name, source)) = record.name() else {
            return Ok(self.malformed(record, "missing addr:street and addr:place", sink));
        };
        let Some(raw_number) = record.housenumber() else {
            return Ok(self.malformed(record, "missing addr:housenumber", sink));
        };
        self.cancel_token().check()?;

        let raw_name = raw_name.to_string();
        let street = self.normalize_or_raw(&raw_name, format!("node/{}", record.id), sink);
        let (number, _) = housenumber_key(raw_number, record.unit());
        let city = record.city().map(str::to_string);
        let flagged_before = record.diagnostics.len();

        let mut housenumber_found = false;
        if index.contains_street(&street) {
            let candidates = index.candidates(&street, &number);
            housenumber_found = !candidates.is_empty();

            for candidate in candidates {
                let d = geodesy::distance(record.location, candidate.location);
                if self.is_same_address(city.as_deref(), candidate, d) {
                    debug!(
                        "Record {} matches {}/{} ({:.1} m)",
                        record.id, candidate.osm_type, candidate.osm_id, d
                    );
                    return Ok(Outcome::Suppress);
                }
                record.annotate(Diagnostic::similar_address(d));
            }
        }

        if self.config.deep_checks || !housenumber_found {
            self.deep_checks(record, &street, &raw_name, source, index, region, sink)?;
        }

        if record.diagnostics.len() > flagged_before {
            Ok(Outcome::Flag)
        } else {
            Ok(Outcome::Keep)
        }
    }

    /// A candidate suppresses a record when it is close enough and the
    /// city either agrees, is unknown on one side, or is overridden by a
    /// very small distance. Units only select the housenumber key.
    fn is_same_address(&self, city: Option<&str>, candidate: &ReferenceAddress, d: f64) -> bool {
        if d >= self.config.match_threshold {
            return false;
        }
        match (city, candidate.city.as_deref()) {
            (Some(a), Some(b)) => {
                a.trim().to_lowercase() == b.trim().to_lowercase()
                    || d < self.config.city_override_threshold
            }
            _ => true,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn deep_checks(
        &self,
        record: &mut AddressRecord,
        street: &str,
        raw_name: &str,
        source: NameSource,
        index: &ReferenceIndex,
        region: &BoundingBox,
        sink: &mut dyn ErrorSink,
    ) -> Result<()> {
        if !index.is_empty() {
            let nearby = self.lookups.fetch(&FeatureQuery::AddressesAround {
                center: record.location,
                radius: self.config.close_threshold,
            })?;
            if !nearby.is_empty() {
                record.annotate(Diagnostic::very_close_address());
            }
        }

        if source == NameSource::Place {
            return Ok(());
        }

        let streets = self.region_streets(region, sink)?;
        let matching: Vec<&Feature> = streets
            .by_name
            .get(street)
            .map(|ids| ids.iter().map(|&i| &streets.highways[i]).collect())
            .unwrap_or_default();

        if matching.is_empty() {
            let places = self.region_places(region, sink)?;
            if places.contains(street) {
                record.annotate(Diagnostic::needs_place_tag(raw_name));
            } else if !streets.highways.is_empty() {
                record.annotate(Diagnostic::street_not_found());
            } else {
                record.annotate(Diagnostic::no_street_in_area());
            }
            return Ok(());
        }

        if let Some(d) = distance_to_ways(record.location, &matching) {
            if d > self.config.match_threshold {
                record.annotate(Diagnostic::street_far_away(d));
            }
        }
        Ok(())
    }

    fn region_streets(
        &self,
        region: &BoundingBox,
        sink: &mut dyn ErrorSink,
    ) -> Result<Arc<RegionStreets>> {
        let key = region.to_overpass();
        if let Some(hit) = self.streets.borrow().get(&key) {
            return Ok(Arc::clone(hit));
        }

        let highways = self.lookups.fetch(&FeatureQuery::Highways { bbox: *region })?;
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, way) in highways.iter().enumerate() {
            for tag in NAME_TAGS {
                let Some(name) = way.tag(tag) else { continue };
                let name = self.normalize_or_raw(
                    name,
                    format!("{}/{} {}", way.osm_type, way.osm_id, tag),
                    sink,
                );
                let ids = by_name.entry(name).or_default();
                if ids.last() != Some(&i) {
                    ids.push(i);
                }
            }
        }
        debug!(
            "{} highways with {} distinct names in {}",
            highways.len(),
            by_name.len(),
            region
        );

        let streets = Arc::new(RegionStreets { highways, by_name });
        self.streets.borrow_mut().insert(key, Arc::clone(&streets));
        Ok(streets)
    }

    fn region_places(
        &self,
        region: &BoundingBox,
        sink: &mut dyn ErrorSink,
    ) -> Result<Arc<HashSet<String>>> {
        let key = region.to_overpass();
        if let Some(hit) = self.places.borrow().get(&key) {
            return Ok(Arc::clone(hit));
        }

        let features = self.lookups.fetch(&FeatureQuery::Places { bbox: *region })?;
        let mut names: HashSet<String> = HashSet::new();
        for feature in features.iter() {
            for tag in NAME_TAGS {
                let Some(name) = feature.tag(tag) else { continue };
                names.insert(self.normalize_or_raw(
                    name,
                    format!("{}/{} {}", feature.osm_type, feature.osm_id, tag),
                    sink,
                ));
            }
        }

        let names = Arc::new(names);
        self.places.borrow_mut().insert(key, Arc::clone(&names));
        Ok(names)
    }

    fn normalize_or_raw(&self, name: &str, source: String, sink: &mut dyn ErrorSink) -> String {
        match self.normalizer.normalize(name) {
            Ok(key) => key,
            Err(e) => {
                sink.report(SideEvent::invalid_name(source, &e));
                name.to_string()
            }
        }
    }

    fn malformed(&self, record: &AddressRecord, reason: &str, sink: &mut dyn ErrorSink) -> Outcome {
        warn!("Record {} passed through unchecked: {}", record.id, reason);
        sink.report(SideEvent::MalformedRecord {
            id: record.id,
            reason: reason.to_string(),
        });
        Outcome::Skipped
    }

    /// Reconcile every record of every file.
    ///
    /// Suppressed records are removed from their file and flagged ones are
    /// annotated in place. On cancellation the remaining records are left
    /// as they were and the report says so. Service failures abort the run.
    pub fn reconcile_batch(
        &self,
        files: &mut [BatchFile],
        sink: &mut dyn ErrorSink,
    ) -> Result<RunReport> {
        let mut report = RunReport::new(
            files
                .iter()
                .map(|f| FileSummary::new(f.name(), f.records.len()))
                .collect(),
        );
        let region = working_region(files, &self.config)?;
        report.region = Some(region);

        let mut sink = CountingSink::new(sink);

        let index = match self.build_index(&region, &mut sink) {
            Ok(index) => index,
            Err(ReconcileError::Cancelled) => {
                warn!("Cancelled before classification");
                report.mark_all_unprocessed();
                report.invalid_names = sink.invalid_names;
                report.queries = self.queries_issued();
                return Ok(report.finish());
            }
            Err(e) => return Err(e),
        };

        let mut cancelled = false;
        for (file, summary) in files.iter_mut().zip(report.files.iter_mut()) {
            info!("Reconciling {} ({} records)", summary.name, summary.total);

            let mut kept = Vec::with_capacity(file.records.len());
            let mut records = std::mem::take(&mut file.records).into_iter();

            while let Some(mut record) = records.next() {
                if cancelled || self.cancel_token().is_cancelled() {
                    cancelled = true;
                    summary.unprocessed += 1;
                    kept.push(record);
                    continue;
                }

                let before = record.diagnostics.len();
                match self.classify(&mut record, &index, &region, &mut sink) {
                    Ok(Outcome::Suppress) => summary.suppressed += 1,
                    Ok(Outcome::Flag) => {
                        summary.flagged += 1;
                        kept.push(record);
                    }
                    Ok(Outcome::Keep) => kept.push(record),
                    Ok(Outcome::Skipped) => {
                        summary.skipped += 1;
                        kept.push(record);
                    }
                    Err(ReconcileError::Cancelled) => {
                        record.diagnostics.truncate(before);
                        cancelled = true;
                        summary.unprocessed += 1;
                        kept.push(record);
                    }
                    Err(e) => {
                        kept.push(record);
                        kept.extend(records);
                        file.records = kept;
                        return Err(e);
                    }
                }
            }
            file.records = kept;

            info!(
                "{}: {} suppressed, {} flagged, {} skipped, {} unprocessed",
                summary.name,
                summary.suppressed,
                summary.flagged,
                summary.skipped,
                summary.unprocessed
            );
        }

        if cancelled {
            warn!("Run cancelled, remaining records left unchanged");
        }
        report.cancelled = cancelled;
        report.invalid_names = sink.invalid_names;
        report.queries = self.queries_issued();
        Ok(report.finish())
    }

    /// Addressed features in `bbox` that have neither a street nor a place.
    pub fn housenumbers_without_street(&self, bbox: &BoundingBox) -> Result<Vec<Feature>> {
        let features = self
            .lookups
            .fetch(&FeatureQuery::UnnamedHousenumbers { bbox: *bbox })?;
        Ok(features.as_ref().clone())
    }

    /// Distinct names of ordinary streets within `radius` meters of `point`,
    /// sorted.
    pub fn nearby_street_names(&self, point: GeoPoint, radius: f64) -> Result<Vec<String>> {
        let features = self.lookups.fetch(&FeatureQuery::HighwaysAround {
            center: point,
            radius,
        })?;
        let mut names: Vec<String> = features
            .iter()
            .filter_map(|f| f.tag("name"))
            .map(str::to_string)
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}

/// Distance from `point` to the nearest of `ways`: the nearest vertex, or
/// the cross-track distance to a segment adjoining it if that is smaller.
fn distance_to_ways(point: GeoPoint, ways: &[&Feature]) -> Option<f64> {
    let ways: Vec<Vec<GeoPoint>> = ways.iter().map(|w| w.vertices()).collect();
    let mut best: Option<(f64, usize, usize)> = None;
    for (w, vertices) in ways.iter().enumerate() {
        for (i, v) in vertices.iter().enumerate() {
            let d = geodesy::distance(point, *v);
            if best.map_or(true, |(b, _, _)| d < b) {
                best = Some((d, w, i));
            }
        }
    }

    let (mut d, w, i) = best?;
    let vertices = &ways[w];
    if i > 0 {
        d = d.min(geodesy::cross_track_distance(vertices[i - 1], vertices[i], point));
    }
    if i + 1 < vertices.len() {
        d = d.min(geodesy::cross_track_distance(vertices[i], vertices[i + 1], point));
    }
    Some(d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::address::{TAG_CITY, TAG_HOUSENUMBER, TAG_PLACE, TAG_STREET, TAG_UNIT};
    use crate::models::DiagnosticKind;
    use std::cell::Cell;

    /// Offset in degrees of latitude for a distance in meters.
    fn north(p: GeoPoint, meters: f64) -> GeoPoint {
        GeoPoint::new(p.lat + meters / 111_195.0, p.lon)
    }

    const ORIGIN: GeoPoint = GeoPoint::new(48.2, 16.37);

    #[derive(Default)]
    struct MockService {
        addresses: Vec<Feature>,
        highways: Vec<Feature>,
        places: Vec<Feature>,
        nearby: Vec<Feature>,
        fail: bool,
        calls: Cell<usize>,
    }

    impl GeodataService for MockService {
        fn query(&self, query: &FeatureQuery) -> Result<Vec<Feature>> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(ReconcileError::Service {
                    bbox: query.region(),
                    message: "unavailable".into(),
                });
            }
            Ok(match query {
                FeatureQuery::AddressesInBox { .. } => self.addresses.clone(),
                FeatureQuery::NamedHighways { name_tag, .. } => self
                    .highways
                    .iter()
                    .filter(|w| w.tag(name_tag).is_some())
                    .cloned()
                    .collect(),
                FeatureQuery::Highways { .. } => self.highways.clone(),
                FeatureQuery::Places { .. } => self.places.clone(),
                FeatureQuery::AddressesAround { .. } => self.nearby.clone(),
                FeatureQuery::HighwaysAround { .. } => self.highways.clone(),
                FeatureQuery::UnnamedHousenumbers { .. } => Vec::new(),
            })
        }
    }

    fn reference(id: i64, street: &str, number: &str, at: GeoPoint) -> Feature {
        Feature::node(id, at)
            .with_tag(TAG_STREET, street)
            .with_tag(TAG_HOUSENUMBER, number)
    }

    fn record(street: &str, number: &str, at: GeoPoint) -> AddressRecord {
        AddressRecord::new(-1, at)
            .with_tag(TAG_STREET, street)
            .with_tag(TAG_HOUSENUMBER, number)
    }

    fn street_way(id: i64, name: &str, from: GeoPoint, to: GeoPoint) -> Feature {
        Feature::way(id, vec![from, to])
            .with_tag("highway", "residential")
            .with_tag("name", name)
    }

    fn region() -> BoundingBox {
        BoundingBox::new(48.19, 16.36, 48.21, 16.38)
    }

    fn classify_with(
        service: MockService,
        config: ReconcileConfig,
        record: &mut AddressRecord,
    ) -> Outcome {
        let reconciler = Reconciler::new(service, config);
        let mut sink: Vec<SideEvent> = Vec::new();
        let index = reconciler.build_index(&region(), &mut sink).unwrap();
        reconciler
            .classify(record, &index, &region(), &mut sink)
            .unwrap()
    }

    fn with_city(service_city: &str) -> MockService {
        MockService {
            addresses: vec![reference(1, "Hauptstraße", "5", ORIGIN).with_tag(TAG_CITY, service_city)],
            highways: vec![street_way(
                100,
                "Hauptstraße",
                ORIGIN,
                GeoPoint::new(ORIGIN.lat, ORIGIN.lon + 0.001),
            )],
            ..Default::default()
        }
    }

    #[test]
    fn test_same_city_close_suppressed() {
        let mut r = record("Hauptstrasse", "5", north(ORIGIN, 10.0)).with_tag(TAG_CITY, "Wien");
        let outcome = classify_with(with_city("Wien"), ReconcileConfig::default(), &mut r);
        assert_eq!(outcome, Outcome::Suppress);
    }

    #[test]
    fn test_far_duplicate_flagged() {
        let mut r = record("Hauptstraße", "5", north(ORIGIN, 200.0)).with_tag(TAG_CITY, "Wien");
        let outcome = classify_with(with_city("Wien"), ReconcileConfig::default(), &mut r);
        assert_eq!(outcome, Outcome::Flag);
        assert!(r.has_diagnostic(DiagnosticKind::SimilarAddressNearby));
        assert!(r.diagnostics[0].message.contains("(200 m away)"));
    }

    #[test]
    fn test_other_city_at_60m_flagged() {
        let mut r = record("Hauptstraße", "5", north(ORIGIN, 60.0)).with_tag(TAG_CITY, "Graz");
        let outcome = classify_with(with_city("Wien"), ReconcileConfig::default(), &mut r);
        assert_eq!(outcome, Outcome::Flag);
        assert!(r.has_diagnostic(DiagnosticKind::SimilarAddressNearby));
    }

    #[test]
    fn test_other_city_at_10m_suppressed() {
        let mut r = record("Hauptstraße", "5", north(ORIGIN, 10.0)).with_tag(TAG_CITY, "Graz");
        let outcome = classify_with(with_city("Wien"), ReconcileConfig::default(), &mut r);
        assert_eq!(outcome, Outcome::Suppress);
    }

    #[test]
    fn test_missing_city_suppressed() {
        let mut r = record("Hauptstraße", "5", north(ORIGIN, 100.0));
        let outcome = classify_with(with_city("Wien"), ReconcileConfig::default(), &mut r);
        assert_eq!(outcome, Outcome::Suppress);
    }

    #[test]
    fn test_other_unit_same_number_suppressed() {
        let service = MockService {
            addresses: vec![reference(1, "Hauptstraße", "5/1", ORIGIN).with_tag(TAG_CITY, "Wien")],
            ..with_city("Wien")
        };
        let mut r = record("Hauptstraße", "5/2", north(ORIGIN, 10.0)).with_tag(TAG_CITY, "Wien");
        let outcome = classify_with(service, ReconcileConfig::default(), &mut r);
        assert_eq!(outcome, Outcome::Suppress);

        let service = MockService {
            addresses: vec![reference(1, "Hauptstraße", "5/1", ORIGIN)],
            ..with_city("Wien")
        };
        let mut r = record("Hauptstraße", "5", north(ORIGIN, 5.0)).with_tag(TAG_UNIT, "2");
        let outcome = classify_with(service, ReconcileConfig::default(), &mut r);
        assert_eq!(outcome, Outcome::Suppress);
    }

    #[test]
    fn test_second_candidate_can_suppress() {
        let service = MockService {
            addresses: vec![
                reference(1, "Hauptstraße", "5", north(ORIGIN, 500.0)),
                reference(2, "Hauptstraße", "5", ORIGIN),
            ],
            ..with_city("Wien")
        };
        let mut r = record("Hauptstraße", "5", north(ORIGIN, 10.0));
        assert_eq!(
            classify_with(service, ReconcileConfig::default(), &mut r),
            Outcome::Suppress
        );
    }

    #[test]
    fn test_unknown_number_on_known_street_kept() {
        let mut r = record("Hauptstraße", "7", north(ORIGIN, 20.0));
        let outcome = classify_with(with_city("Wien"), ReconcileConfig::default(), &mut r);
        assert_eq!(outcome, Outcome::Keep);
        assert!(r.diagnostics.is_empty());
    }

    #[test]
    fn test_very_close_address() {
        let service = MockService {
            nearby: vec![reference(9, "Nebengasse", "1", ORIGIN)],
            ..with_city("Wien")
        };
        let mut r = record("Hauptstraße", "7", ORIGIN);
        let outcome = classify_with(service, ReconcileConfig::default(), &mut r);
        assert_eq!(outcome, Outcome::Flag);
        assert!(r.has_diagnostic(DiagnosticKind::VeryCloseAddress));
    }

    #[test]
    fn test_street_not_found() {
        let mut r = record("Nebengasse", "1", ORIGIN);
        classify_with(with_city("Wien"), ReconcileConfig::default(), &mut r);
        assert!(r.has_diagnostic(DiagnosticKind::StreetNotFound));
    }

    #[test]
    fn test_needs_place_tag() {
        let service = MockService {
            places: vec![Feature::node(50, ORIGIN)
                .with_tag("place", "hamlet")
                .with_tag("name", "Sonnenhang")],
            ..with_city("Wien")
        };
        let mut r = record("Sonnenhang", "3", ORIGIN);
        classify_with(service, ReconcileConfig::default(), &mut r);
        assert!(r.has_diagnostic(DiagnosticKind::NeedsPlaceTag));
        assert!(r.diagnostics[0].message.contains("'Sonnenhang'"));
    }

    #[test]
    fn test_needs_place_tag_by_alt_name() {
        let service = MockService {
            highways: Vec::new(),
            places: vec![Feature::node(50, ORIGIN)
                .with_tag("place", "hamlet")
                .with_tag("name", "Sonnenhang-Siedlung")
                .with_tag("alt_name", "Sonnenhang")],
            ..with_city("Wien")
        };
        let mut r = record("Sonnenhang", "3", ORIGIN);
        classify_with(service, ReconcileConfig::default(), &mut r);
        assert!(r.has_diagnostic(DiagnosticKind::NeedsPlaceTag));
        assert!(!r.has_diagnostic(DiagnosticKind::NoStreetInArea));
    }

    #[test]
    fn test_invalid_record_name_uses_raw() {
        let service = MockService {
            addresses: vec![reference(1, "Straße №1", "4", ORIGIN)],
            ..with_city("Wien")
        };
        let reconciler = Reconciler::new(service, ReconcileConfig::default());
        let mut sink: Vec<SideEvent> = Vec::new();
        let index = reconciler.build_index(&region(), &mut sink).unwrap();
        sink.clear();

        let mut r = AddressRecord::new(-8, north(ORIGIN, 5.0))
            .with_tag(TAG_STREET, "Straße №1")
            .with_tag(TAG_HOUSENUMBER, "4");
        let outcome = reconciler
            .classify(&mut r, &index, &region(), &mut sink)
            .unwrap();

        assert_eq!(outcome, Outcome::Suppress);
        assert_eq!(sink.len(), 1);
        assert!(matches!(
            &sink[0],
            SideEvent::InvalidName { name, source, .. } if name == "Straße №1" && source == "node/-8"
        ));
    }

    #[test]
    fn test_no_street_in_area() {
        let service = MockService {
            highways: Vec::new(),
            ..with_city("Wien")
        };
        let mut r = record("Nebengasse", "1", ORIGIN);
        classify_with(service, ReconcileConfig::default(), &mut r);
        assert!(r.has_diagnostic(DiagnosticKind::NoStreetInArea));
    }

    #[test]
    fn test_place_record_skips_street_checks() {
        let mut r = AddressRecord::new(-1, ORIGIN)
            .with_tag(TAG_PLACE, "Nirgendwo")
            .with_tag(TAG_HOUSENUMBER, "1");
        let outcome = classify_with(with_city("Wien"), ReconcileConfig::default(), &mut r);
        assert_eq!(outcome, Outcome::Keep);
    }

    #[test]
    fn test_street_far_away() {
        let service = MockService {
            addresses: Vec::new(),
            highways: vec![street_way(
                100,
                "Hauptstraße",
                north(ORIGIN, 1000.0),
                GeoPoint::new(north(ORIGIN, 1000.0).lat, ORIGIN.lon + 0.001),
            )],
            ..Default::default()
        };
        let mut r = record("Hauptstraße", "1", ORIGIN);
        classify_with(service, ReconcileConfig::default(), &mut r);
        assert!(r.has_diagnostic(DiagnosticKind::StreetFarAway));
    }

    #[test]
    fn test_street_matched_by_alt_name_is_near() {
        let service = MockService {
            addresses: Vec::new(),
            highways: vec![street_way(
                100,
                "Bundesstraße 1",
                north(ORIGIN, 20.0),
                GeoPoint::new(north(ORIGIN, 20.0).lat, ORIGIN.lon + 0.002),
            )
            .with_tag("alt_name", "Hauptstraße")],
            ..Default::default()
        };
        let mut r = record("Hauptstraße", "1", ORIGIN);
        let outcome = classify_with(service, ReconcileConfig::default(), &mut r);
        assert_eq!(outcome, Outcome::Keep);
    }

    #[test]
    fn test_deep_checks_when_enabled() {
        let service = MockService {
            nearby: vec![reference(9, "Nebengasse", "1", ORIGIN)],
            ..with_city("Wien")
        };
        let config = ReconcileConfig {
            deep_checks: true,
            ..Default::default()
        };
        let mut r = record("Hauptstraße", "5", north(ORIGIN, 200.0));
        classify_with(service, config, &mut r);
        assert!(r.has_diagnostic(DiagnosticKind::SimilarAddressNearby));
        assert!(r.has_diagnostic(DiagnosticKind::VeryCloseAddress));
    }

    #[test]
    fn test_malformed_record_skipped() {
        let reconciler = Reconciler::new(with_city("Wien"), ReconcileConfig::default());
        let mut sink: Vec<SideEvent> = Vec::new();
        let index = reconciler.build_index(&region(), &mut sink).unwrap();

        let mut r = AddressRecord::new(-4, ORIGIN).with_tag(TAG_STREET, "Hauptstraße");
        let outcome = reconciler
            .classify(&mut r, &index, &region(), &mut sink)
            .unwrap();
        assert_eq!(outcome, Outcome::Skipped);
        assert!(matches!(&sink[0], SideEvent::MalformedRecord { id: -4, .. }));
    }

    #[test]
    fn test_queries_memoized() {
        let reconciler = Reconciler::new(with_city("Wien"), ReconcileConfig::default());
        let mut sink: Vec<SideEvent> = Vec::new();
        let index = reconciler.build_index(&region(), &mut sink).unwrap();
        let issued = reconciler.queries_issued();

        for number in ["7", "9", "11"] {
            let mut r = record("Nebengasse", number, ORIGIN);
            reconciler
                .classify(&mut r, &index, &region(), &mut sink)
                .unwrap();
        }
        // around, highways and places once each
        assert_eq!(reconciler.queries_issued(), issued + 3);
    }

    #[test]
    fn test_nearby_street_names() {
        let service = MockService {
            highways: vec![
                street_way(1, "Ring", ORIGIN, north(ORIGIN, 10.0)),
                street_way(2, "Gasse", ORIGIN, north(ORIGIN, 10.0)),
                street_way(3, "Ring", ORIGIN, north(ORIGIN, 10.0)),
            ],
            ..Default::default()
        };
        let reconciler = Reconciler::new(service, ReconcileConfig::default());
        assert_eq!(
            reconciler.nearby_street_names(ORIGIN, 100.0).unwrap(),
            vec!["Gasse", "Ring"]
        );
    }

    #[test]
    fn test_distance_to_ways_uses_cross_track() {
        let a = GeoPoint::new(48.0395233, 16.4363301);
        let b = GeoPoint::new(48.0404657, 16.4362577);
        let c = GeoPoint::new(48.0399806, 16.4363636);
        let way = Feature::way(1, vec![a, b]);
        let d = distance_to_ways(c, &[&way]).unwrap();
        assert!((d - 5.0).abs() < 1.0, "got {}", d);
        assert!(distance_to_ways(c, &[]).is_none());
    }

    #[test]
    fn test_service_failure_propagates() {
        let service = MockService {
            fail: true,
            ..Default::default()
        };
        let reconciler = Reconciler::new(service, ReconcileConfig::default());
        let mut sink: Vec<SideEvent> = Vec::new();
        let err = reconciler.build_index(&region(), &mut sink).unwrap_err();
        assert!(matches!(err, ReconcileError::Service { .. }));
    }
}
