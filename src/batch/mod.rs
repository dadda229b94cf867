//! Input and output files of a reconciliation run.

mod osm;

pub use osm::{parse_osm, write_osm, OsmDocument};

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::BatchError;
use crate::models::{AddressRecord, BoundingBox};

/// Suffix appended to the file stem of written files.
pub const OUTPUT_SUFFIX: &str = "_filtered";

/// One OSM file of candidate addresses.
#[derive(Debug, Clone)]
pub struct BatchFile {
    pub path: PathBuf,
    /// From the `<bounds>` element, or computed from the nodes
    pub bounds: Option<BoundingBox>,
    pub records: Vec<AddressRecord>,
}

impl BatchFile {
    pub fn new(path: impl Into<PathBuf>, bounds: Option<BoundingBox>, records: Vec<AddressRecord>) -> Self {
        Self {
            path: path.into(),
            bounds,
            records,
        }
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, BatchError> {
        let path = path.as_ref();
        let xml = fs::read_to_string(path)?;
        let doc = parse_osm(&xml, &path.display().to_string())?;
        info!("Read {} address nodes from {}", doc.records.len(), path.display());
        Ok(Self::new(path, doc.bounds, doc.records))
    }

    /// File name for reports.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// `<stem>_filtered.osm` next to the input file.
    pub fn output_path(&self) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        self.path
            .with_file_name(format!("{}{}.osm", stem, OUTPUT_SUFFIX))
    }

    /// Write the remaining records to [`BatchFile::output_path`].
    ///
    /// Returns `None` without touching the filesystem when no records are
    /// left.
    pub fn write_filtered(&self, fixme_prefix: &str) -> Result<Option<PathBuf>, BatchError> {
        if self.records.is_empty() {
            info!("{}: nothing left to write", self.name());
            return Ok(None);
        }
        let out_path = self.output_path();
        let file = File::create(&out_path)?;
        write_osm(
            BufWriter::new(file),
            self.bounds.as_ref(),
            &self.records,
            fixme_prefix,
        )?;
        info!(
            "Wrote {} nodes to {}",
            self.records.len(),
            out_path.display()
        );
        Ok(Some(out_path))
    }
}
