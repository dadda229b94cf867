//! Candidate address records and the diagnostics attached to them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::GeoPoint;

pub const TAG_STREET: &str = "addr:street";
pub const TAG_PLACE: &str = "addr:place";
pub const TAG_HOUSENUMBER: &str = "addr:housenumber";
pub const TAG_CITY: &str = "addr:city";
pub const TAG_UNIT: &str = "addr:unit";

/// Which tag the record's name came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameSource {
    Street,
    Place,
}

/// Review categories a record can be flagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Same street and housenumber exist, but not close enough to be a duplicate
    SimilarAddressNearby,
    /// Another address lies within a few meters (or the building is addressed differently)
    VeryCloseAddress,
    /// The name belongs to a place, so `addr:place` should be used
    NeedsPlaceTag,
    /// Streets exist in the area, none with this name
    StreetNotFound,
    /// No streets mapped in the area at all
    NoStreetInArea,
    /// A street with this name exists but is far from the address
    StreetFarAway,
}

impl DiagnosticKind {
    /// Key suffix used when the diagnostic is written as a tag
    pub fn slug(&self) -> &'static str {
        match self {
            DiagnosticKind::SimilarAddressNearby => "similar_address",
            DiagnosticKind::VeryCloseAddress => "very_close_address",
            DiagnosticKind::NeedsPlaceTag => "needs_place",
            DiagnosticKind::StreetNotFound => "street_not_found",
            DiagnosticKind::NoStreetInArea => "no_street",
            DiagnosticKind::StreetFarAway => "street_far_away",
        }
    }

    /// Message template; `NeedsPlaceTag` carries a `#NAME#` placeholder.
    pub fn template(&self) -> &'static str {
        match self {
            DiagnosticKind::SimilarAddressNearby => {
                "an address with the same street and housenumber exists nearby"
            }
            DiagnosticKind::VeryCloseAddress => {
                "very close to another address or inside a differently addressed building"
            }
            DiagnosticKind::NeedsPlaceTag => {
                "'#NAME#' is not a street but a place, addr:place should be used instead of addr:street"
            }
            DiagnosticKind::StreetNotFound => {
                "street not found, the name may be misspelled or the street renamed"
            }
            DiagnosticKind::NoStreetInArea => "no streets are mapped in this area",
            DiagnosticKind::StreetFarAway => "the street with this name is far away",
        }
    }

    pub fn all() -> &'static [DiagnosticKind] {
        &[
            DiagnosticKind::SimilarAddressNearby,
            DiagnosticKind::VeryCloseAddress,
            DiagnosticKind::NeedsPlaceTag,
            DiagnosticKind::StreetNotFound,
            DiagnosticKind::NoStreetInArea,
            DiagnosticKind::StreetFarAway,
        ]
    }
}

/// A diagnostic attached to a record for human review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    fn from_template(kind: DiagnosticKind) -> Self {
        Self {
            kind,
            message: kind.template().to_string(),
        }
    }

    pub fn similar_address(distance: f64) -> Self {
        Self {
            kind: DiagnosticKind::SimilarAddressNearby,
            message: format!(
                "{} ({:.0} m away)",
                DiagnosticKind::SimilarAddressNearby.template(),
                distance
            ),
        }
    }

    pub fn very_close_address() -> Self {
        Self::from_template(DiagnosticKind::VeryCloseAddress)
    }

    pub fn needs_place_tag(name: &str) -> Self {
        Self {
            kind: DiagnosticKind::NeedsPlaceTag,
            message: DiagnosticKind::NeedsPlaceTag
                .template()
                .replace("#NAME#", name),
        }
    }

    pub fn street_not_found() -> Self {
        Self::from_template(DiagnosticKind::StreetNotFound)
    }

    pub fn no_street_in_area() -> Self {
        Self::from_template(DiagnosticKind::NoStreetInArea)
    }

    pub fn street_far_away(distance: f64) -> Self {
        Self {
            kind: DiagnosticKind::StreetFarAway,
            message: format!(
                "{} ({:.0} m away)",
                DiagnosticKind::StreetFarAway.template(),
                distance
            ),
        }
    }
}

/// One candidate address point from the registry batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressRecord {
    /// Node id as found in the input file (usually negative for new objects)
    pub id: i64,
    pub location: GeoPoint,
    /// All tags, address and passthrough alike
    pub tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl AddressRecord {
    pub fn new(id: i64, location: GeoPoint) -> Self {
        Self {
            id,
            location,
            tags: BTreeMap::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Street name, falling back to the place name.
    pub fn name(&self) -> Option<(&str, NameSource)> {
        self.tag(TAG_STREET)
            .map(|s| (s, NameSource::Street))
            .or_else(|| self.tag(TAG_PLACE).map(|p| (p, NameSource::Place)))
    }

    pub fn housenumber(&self) -> Option<&str> {
        self.tag(TAG_HOUSENUMBER)
    }

    pub fn city(&self) -> Option<&str> {
        self.tag(TAG_CITY)
    }

    pub fn unit(&self) -> Option<&str> {
        self.tag(TAG_UNIT)
    }

    /// Attach a diagnostic unless an identical one is already present.
    /// Returns whether it was added.
    pub fn annotate(&mut self, diagnostic: Diagnostic) -> bool {
        if self.diagnostics.contains(&diagnostic) {
            return false;
        }
        self.diagnostics.push(diagnostic);
        true
    }

    pub fn is_flagged(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn has_diagnostic(&self, kind: DiagnosticKind) -> bool {
        self.diagnostics.iter().any(|d| d.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_falls_back_to_place() {
        let r = AddressRecord::new(-1, GeoPoint::new(48.0, 16.0)).with_tag(TAG_PLACE, "Au");
        assert_eq!(r.name(), Some(("Au", NameSource::Place)));

        let r = r.with_tag(TAG_STREET, "Hauptstraße");
        assert_eq!(r.name(), Some(("Hauptstraße", NameSource::Street)));
    }

    #[test]
    fn test_annotate_is_idempotent() {
        let mut r = AddressRecord::new(-1, GeoPoint::new(48.0, 16.0));
        assert!(r.annotate(Diagnostic::street_not_found()));
        assert!(!r.annotate(Diagnostic::street_not_found()));
        assert!(r.annotate(Diagnostic::similar_address(200.0)));
        assert!(r.annotate(Diagnostic::similar_address(300.0)));
        assert_eq!(r.diagnostics.len(), 3);
    }

    #[test]
    fn test_needs_place_substitutes_name() {
        let d = Diagnostic::needs_place_tag("Siedlung Sonnenhang");
        assert!(d.message.contains("'Siedlung Sonnenhang'"));
        assert!(!d.message.contains("#NAME#"));
    }
}
