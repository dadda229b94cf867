//! Core data models for address reconciliation.

pub mod address;
pub mod feature;
pub mod point;

pub use address::{AddressRecord, Diagnostic, DiagnosticKind, NameSource};
pub use feature::Feature;
pub use point::{BoundingBox, GeoPoint, OsmType};
