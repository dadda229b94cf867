use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::warn;
use url::Url;

use crate::error::ReconcileError;
use crate::models::BoundingBox;
use crate::overpass::{DEFAULT_OVERPASS_URL, LOCAL_OVERPASS_URL};

/// Allowed range for the "too close to another address" radius, in meters.
pub const CLOSE_THRESHOLD_RANGE: (f64, f64) = (3.0, 6.0);

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ReconcileConfig {
    pub overpass_url: String,
    pub timeout_secs: u64,
    /// Fixed working region instead of the union of the file bounds
    pub bbox: Option<BoundingBox>,
    /// Degrees added on every side of the working region
    pub bbox_tolerance: f64,
    /// Largest accepted region diagonal, meters
    pub max_region_diagonal: f64,
    /// Same street and number closer than this is the same address
    pub match_threshold: f64,
    /// Below this distance a different city does not matter
    pub city_override_threshold: f64,
    pub close_threshold: f64,
    pub expand_abbreviations: bool,
    /// Run the street checks even when the housenumber is known
    pub deep_checks: bool,
    pub symmetric_aliases: bool,
    /// Diagnostics are written as `<fixme_prefix>:<category>` tags
    pub fixme_prefix: String,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            overpass_url: DEFAULT_OVERPASS_URL.to_string(),
            timeout_secs: 180,
            bbox: None,
            bbox_tolerance: 0.001,
            max_region_diagonal: 30_000.0,
            match_threshold: 150.0,
            city_override_threshold: 50.0,
            close_threshold: CLOSE_THRESHOLD_RANGE.0,
            expand_abbreviations: true,
            deep_checks: false,
            symmetric_aliases: true,
            fixme_prefix: "fixme:BEV".to_string(),
        }
    }
}

impl ReconcileConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let mut config: ReconcileConfig =
            toml::from_str(&content).context("Failed to parse config file")?;
        config.validate().context("Invalid config file")?;
        Ok(config)
    }

    /// Point at a locally running Overpass instance.
    pub fn use_local_overpass(&mut self) {
        self.overpass_url = LOCAL_OVERPASS_URL.to_string();
    }

    /// Check values and clamp the close threshold into its allowed range.
    pub fn validate(&mut self) -> crate::error::Result<()> {
        Url::parse(&self.overpass_url).map_err(|e| {
            ReconcileError::Config(format!("invalid overpass_url {}: {}", self.overpass_url, e))
        })?;

        for (name, value) in [
            ("match_threshold", self.match_threshold),
            ("city_override_threshold", self.city_override_threshold),
            ("max_region_diagonal", self.max_region_diagonal),
        ] {
            if !(value > 0.0) {
                return Err(ReconcileError::Config(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if !(self.bbox_tolerance >= 0.0) {
            return Err(ReconcileError::Config(format!(
                "bbox_tolerance must not be negative, got {}",
                self.bbox_tolerance
            )));
        }

        let (low, high) = CLOSE_THRESHOLD_RANGE;
        let clamped = self.close_threshold.clamp(low, high);
        if clamped != self.close_threshold {
            warn!(
                "close_threshold {} outside {}-{} m, using {}",
                self.close_threshold, low, high, clamped
            );
            self.close_threshold = clamped;
        }

        if self.fixme_prefix.trim().is_empty() {
            return Err(ReconcileError::Config("fixme_prefix must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ReconcileConfig::default();
        assert_eq!(config.match_threshold, 150.0);
        assert_eq!(config.city_override_threshold, 50.0);
        assert_eq!(config.close_threshold, 3.0);
        assert_eq!(config.fixme_prefix, "fixme:BEV");
        assert!(config.symmetric_aliases);
        assert!(!config.deep_checks);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "deep_checks = true\nclose_threshold = 10.0\n\n[bbox]\nmin_lat = 48.0\nmin_lon = 16.0\nmax_lat = 48.1\nmax_lon = 16.1"
        )
        .unwrap();

        let config = ReconcileConfig::load_from_file(file.path()).unwrap();
        assert!(config.deep_checks);
        assert_eq!(config.close_threshold, 6.0);
        assert_eq!(config.bbox, Some(BoundingBox::new(48.0, 16.0, 48.1, 16.1)));
        assert_eq!(config.timeout_secs, 180);
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = ReconcileConfig {
            overpass_url: "nope".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let mut config = ReconcileConfig {
            match_threshold: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_local_overpass() {
        let mut config = ReconcileConfig::default();
        config.use_local_overpass();
        assert_eq!(config.overpass_url, LOCAL_OVERPASS_URL);
    }
}
