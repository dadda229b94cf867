use tracing::info;

use crate::batch::BatchFile;
use crate::config::ReconcileConfig;
use crate::error::{ReconcileError, Result};
use crate::models::BoundingBox;

/// Region covering a whole batch: the configured override or the union of
/// the file bounds, grown by the tolerance and capped in size.
pub fn working_region(files: &[BatchFile], config: &ReconcileConfig) -> Result<BoundingBox> {
    let base = match config.bbox {
        Some(bbox) => bbox,
        None => files
            .iter()
            .filter_map(|f| f.bounds)
            .reduce(|a, b| a.union(&b))
            .ok_or(ReconcileError::EmptyRegion)?,
    };

    let region = base.expand(config.bbox_tolerance);
    let diagonal = region.diagonal();
    if diagonal > config.max_region_diagonal {
        return Err(ReconcileError::RegionTooLarge {
            bbox: region,
            diagonal,
            limit: config.max_region_diagonal,
        });
    }

    info!("Working region {} ({:.0} m across)", region, diagonal);
    Ok(region)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(bounds: Option<BoundingBox>) -> BatchFile {
        BatchFile::new("a.osm", bounds, Vec::new())
    }

    #[test]
    fn test_union_of_files() {
        let files = vec![
            file(Some(BoundingBox::new(48.00, 16.00, 48.01, 16.01))),
            file(None),
            file(Some(BoundingBox::new(48.02, 16.02, 48.03, 16.03))),
        ];
        let region = working_region(&files, &ReconcileConfig::default()).unwrap();
        assert!((region.min_lat - 47.999).abs() < 1e-9);
        assert!((region.max_lon - 16.031).abs() < 1e-9);
    }

    #[test]
    fn test_override_wins() {
        let config = ReconcileConfig {
            bbox: Some(BoundingBox::new(47.0, 15.0, 47.01, 15.01)),
            bbox_tolerance: 0.0,
            ..Default::default()
        };
        let files = vec![file(Some(BoundingBox::new(48.0, 16.0, 48.01, 16.01)))];
        assert_eq!(
            working_region(&files, &config).unwrap(),
            BoundingBox::new(47.0, 15.0, 47.01, 15.01)
        );
    }

    #[test]
    fn test_too_large() {
        let files = vec![file(Some(BoundingBox::new(47.0, 15.0, 48.0, 16.0)))];
        let err = working_region(&files, &ReconcileConfig::default()).unwrap_err();
        assert!(matches!(err, ReconcileError::RegionTooLarge { .. }));
    }

    #[test]
    fn test_empty_batch() {
        let err = working_region(&[file(None)], &ReconcileConfig::default()).unwrap_err();
        assert!(matches!(err, ReconcileError::EmptyRegion));
    }
}
