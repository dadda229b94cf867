//! Error types for reconciliation runs.

use thiserror::Error;

use crate::models::BoundingBox;

/// A name could not be turned into a normalized key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizationError {
    /// The name contains a character outside the accepted set.
    #[error("invalid character {character:?} in street name {name:?}")]
    InvalidCharacter { name: String, character: char },
}

/// Reading or writing an OSM batch file failed.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error in {file}: {message}")]
    Xml { file: String, message: String },

    #[error("invalid attribute {attribute} in {file}: {value:?}")]
    InvalidAttribute {
        file: String,
        attribute: String,
        value: String,
    },
}

/// Errors that abort a reconciliation run.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// The geodata service failed; nothing built for this region is kept.
    #[error("geodata query failed for {bbox}: {message}")]
    Service { bbox: BoundingBox, message: String },

    /// Working region is larger than the configured cap.
    #[error("region {bbox} is too large: diagonal {diagonal:.0} m exceeds {limit:.0} m")]
    RegionTooLarge {
        bbox: BoundingBox,
        diagonal: f64,
        limit: f64,
    },

    /// Nothing to derive a region from.
    #[error("no bounding region: the batch is empty and no override is configured")]
    EmptyRegion,

    /// The run was cancelled before the next lookup.
    #[error("cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Batch(#[from] BatchError),
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;
