//! addrsync - reconcile government address registry exports with OpenStreetMap
//!
//! This library provides the reconciliation core used by the `filter` binary:
//! name normalization, the reference index of already mapped addresses, the
//! Overpass client and the per-record classification engine.

pub mod batch;
pub mod config;
pub mod error;
pub mod geodesy;
pub mod index;
pub mod models;
pub mod normalize;
pub mod overpass;
pub mod reconcile;
pub mod renamed;
pub mod sink;

pub use config::ReconcileConfig;
pub use error::{NormalizationError, ReconcileError, Result};
pub use models::{AddressRecord, BoundingBox, Diagnostic, DiagnosticKind, GeoPoint, OsmType};
pub use reconcile::{CancelToken, Outcome, Reconciler, RunReport};
