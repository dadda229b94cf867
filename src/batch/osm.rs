//! Minimal OSM XML reading and writing for address node files.

use quick_xml::escape::{escape, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeMap;
use std::io::Write;
use tracing::debug;

use crate::error::BatchError;
use crate::models::{AddressRecord, BoundingBox, GeoPoint};

/// Contents of one OSM XML document.
#[derive(Debug, Default)]
pub struct OsmDocument {
    pub bounds: Option<BoundingBox>,
    pub records: Vec<AddressRecord>,
}

fn attributes(e: &BytesStart, file: &str) -> Result<BTreeMap<String, String>, BatchError> {
    let mut attrs = BTreeMap::new();
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let raw = String::from_utf8_lossy(&attr.value);
        let value = unescape(&raw).map_err(|err| BatchError::Xml {
            file: file.to_string(),
            message: format!("bad escape in attribute {}: {}", key, err),
        })?;
        attrs.insert(key, value.into_owned());
    }
    Ok(attrs)
}

fn parse_attr<T: std::str::FromStr>(
    attrs: &BTreeMap<String, String>,
    name: &str,
    file: &str,
) -> Result<T, BatchError> {
    let value = attrs.get(name).map(String::as_str).unwrap_or_default();
    value.trim().parse().map_err(|_| BatchError::InvalidAttribute {
        file: file.to_string(),
        attribute: name.to_string(),
        value: value.to_string(),
    })
}

fn start_node(attrs: &BTreeMap<String, String>, file: &str) -> Result<AddressRecord, BatchError> {
    let id = parse_attr(attrs, "id", file)?;
    let lat = parse_attr(attrs, "lat", file)?;
    let lon = parse_attr(attrs, "lon", file)?;
    Ok(AddressRecord::new(id, GeoPoint::new(lat, lon)))
}

/// Parse `<bounds>` and every `<node>` with its `<tag>` children.
///
/// Ways and relations are ignored. Without a `<bounds>` element the
/// bounds are computed from the nodes.
pub fn parse_osm(xml: &str, file: &str) -> Result<OsmDocument, BatchError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut doc = OsmDocument::default();
    let mut current: Option<AddressRecord> = None;
    let mut skipped_elements = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if e.name().as_ref() == b"bounds" =>
            {
                let attrs = attributes(e, file)?;
                doc.bounds = Some(BoundingBox::new(
                    parse_attr(&attrs, "minlat", file)?,
                    parse_attr(&attrs, "minlon", file)?,
                    parse_attr(&attrs, "maxlat", file)?,
                    parse_attr(&attrs, "maxlon", file)?,
                ));
            }
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"node" => {
                current = Some(start_node(&attributes(e, file)?, file)?);
            }
            Ok(Event::Empty(ref e)) if e.name().as_ref() == b"node" => {
                doc.records.push(start_node(&attributes(e, file)?, file)?);
            }
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if e.name().as_ref() == b"tag" => {
                if let Some(record) = current.as_mut() {
                    let attrs = attributes(e, file)?;
                    if let (Some(k), Some(v)) = (attrs.get("k"), attrs.get("v")) {
                        record.tags.insert(k.clone(), v.clone());
                    }
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"node" => {
                if let Some(record) = current.take() {
                    doc.records.push(record);
                }
            }
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if matches!(e.name().as_ref(), b"way" | b"relation") =>
            {
                skipped_elements += 1;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(BatchError::Xml {
                    file: file.to_string(),
                    message: format!(
                        "error at position {}: {}",
                        reader.error_position(),
                        e
                    ),
                })
            }
            _ => {}
        }
        buf.clear();
    }

    if skipped_elements > 0 {
        debug!("{}: ignored {} ways/relations", file, skipped_elements);
    }
    if doc.bounds.is_none() {
        doc.bounds = BoundingBox::from_points(doc.records.iter().map(|r| r.location));
    }
    Ok(doc)
}

/// Write records as OSM XML. Diagnostics become `<prefix>:<category>` tags;
/// several diagnostics of one category are joined with "; ".
pub fn write_osm<W: Write>(
    mut out: W,
    bounds: Option<&BoundingBox>,
    records: &[AddressRecord],
    fixme_prefix: &str,
) -> std::io::Result<()> {
    writeln!(out, "<?xml version='1.0' encoding='UTF-8'?>")?;
    writeln!(
        out,
        "<osm version=\"0.6\" generator=\"addrsync {}\">",
        env!("CARGO_PKG_VERSION")
    )?;
    if let Some(b) = bounds {
        writeln!(
            out,
            "  <bounds minlat=\"{}\" minlon=\"{}\" maxlat=\"{}\" maxlon=\"{}\"/>",
            b.min_lat, b.min_lon, b.max_lat, b.max_lon
        )?;
    }

    for record in records {
        let mut tags: BTreeMap<String, String> = record.tags.clone();
        for diagnostic in &record.diagnostics {
            let key = format!("{}:{}", fixme_prefix, diagnostic.kind.slug());
            tags.entry(key)
                .and_modify(|v| {
                    v.push_str("; ");
                    v.push_str(&diagnostic.message);
                })
                .or_insert_with(|| diagnostic.message.clone());
        }

        let open = format!(
            "  <node id=\"{}\" lat=\"{}\" lon=\"{}\"",
            record.id, record.location.lat, record.location.lon
        );
        if tags.is_empty() {
            writeln!(out, "{}/>", open)?;
            continue;
        }
        writeln!(out, "{}>", open)?;
        for (k, v) in &tags {
            writeln!(out, "    <tag k=\"{}\" v=\"{}\"/>", escape(k), escape(v))?;
        }
        writeln!(out, "  </node>")?;
    }

    writeln!(out, "</osm>")?;
    out.flush()
}
