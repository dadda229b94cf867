//! Streets whose registry name changed between two snapshots.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::models::BoundingBox;
use crate::normalize::NameNormalizer;

/// Zoom level of generated map links.
const LINK_ZOOM: u8 = 17;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenamedStreet {
    /// Registry street code
    pub code: String,
    pub old_name: String,
    pub new_name: String,
    /// Map link to the street's extent, when known
    pub osm_link: Option<String>,
}

/// Compare two snapshots of street code -> name.
///
/// Codes missing from either snapshot are ignored. With `ignore_minor`,
/// renames that normalize to the same key ("Dr.-Karl-Renner-Str." vs
/// "Doktor-Karl-Renner-Straße") are not reported. `extents` supplies map
/// links by street code.
pub fn detect_renamed_streets(
    old: &BTreeMap<String, String>,
    new: &BTreeMap<String, String>,
    extents: &BTreeMap<String, BoundingBox>,
    ignore_minor: bool,
    normalizer: &NameNormalizer,
) -> Vec<RenamedStreet> {
    let renamed: Vec<RenamedStreet> = old
        .iter()
        .filter_map(|(code, old_name)| {
            let new_name = new.get(code)?;
            if old_name == new_name {
                return None;
            }
            if ignore_minor {
                if let (Ok(a), Ok(b)) = (normalizer.normalize(old_name), normalizer.normalize(new_name)) {
                    if a == b {
                        return None;
                    }
                }
            }
            Some(RenamedStreet {
                code: code.clone(),
                old_name: old_name.clone(),
                new_name: new_name.clone(),
                osm_link: extents.get(code).map(|bbox| bbox.osm_link(LINK_ZOOM)),
            })
        })
        .collect();

    info!("{} of {} streets renamed", renamed.len(), old.len());
    renamed
}
