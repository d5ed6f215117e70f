//! 3MF mesh extraction
//!
//! 3MF files are ZIP archives containing an XML model entry, conventionally
//! at `3D/3dmodel.model`. This loader is deliberately lenient about the
//! container: it takes the first entry whose path ends in `3dmodel.model`
//! (case-insensitive) rather than resolving OPC relationships, which keeps
//! slicer-exported packages with unusual layouts loadable.

use crate::error::{Error, Result};
use crate::geometry::ModelGeometry;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use tracing::debug;
use zip::ZipArchive;

/// Parse a 3MF buffer into a flat triangle-vertex buffer.
///
/// Every `<object><mesh>` in the model entry is ingested in document order.
/// Triangles referencing out-of-range or non-integer vertex indices are
/// skipped rather than failing the whole upload.
pub fn parse(buffer: &[u8]) -> Result<ModelGeometry> {
    let model_xml = read_model_entry(buffer)?;
    let vertices = parse_model_xml(&model_xml)?;
    ModelGeometry::from_vertices(vertices)
}

/// Locate and read the model entry from the ZIP container.
fn read_model_entry(buffer: &[u8]) -> Result<String> {
    let mut archive = ZipArchive::new(Cursor::new(buffer))?;

    let entry_name = archive
        .file_names()
        .find(|name| is_model_entry(name))
        .map(str::to_string)
        .ok_or_else(|| {
            Error::MissingModelEntry("no */3dmodel.model entry in archive".to_string())
        })?;

    let mut content = String::new();
    archive.by_name(&entry_name)?.read_to_string(&mut content)?;
    Ok(content)
}

fn is_model_entry(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with("/3dmodel.model") || lower == "3dmodel.model"
}

/// Parse the model XML, flattening every mesh into triangle order.
fn parse_model_xml(xml: &str) -> Result<Vec<f32>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut output = Vec::new();

    // Vertex list of the mesh currently being parsed; None outside <mesh>.
    let mut mesh_vertices: Option<Vec<[f32; 3]>> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let name = e.name();
                let name_str = std::str::from_utf8(name.as_ref())
                    .map_err(|e| Error::ParseError(e.to_string()))?;

                match local_name(name_str) {
                    "mesh" => {
                        mesh_vertices = Some(Vec::new());
                    }
                    "vertex" => {
                        if let Some(ref mut vertices) = mesh_vertices {
                            vertices.push(parse_vertex(e)?);
                        }
                    }
                    "triangle" => {
                        if let Some(ref vertices) = mesh_vertices {
                            match resolve_triangle(e, vertices)? {
                                Some(coords) => output.extend_from_slice(&coords),
                                None => debug!("skipping triangle with unresolvable indices"),
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(ref e)) => {
                let name = e.name();
                let name_str = std::str::from_utf8(name.as_ref())
                    .map_err(|e| Error::ParseError(e.to_string()))?;
                if local_name(name_str) == "mesh" {
                    mesh_vertices = None;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    if output.is_empty() {
        return Err(Error::EmptyMesh("no mesh data".to_string()));
    }
    Ok(output)
}

/// Strip a namespace prefix (`m:vertex` -> `vertex`).
fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

fn parse_vertex(e: &quick_xml::events::BytesStart) -> Result<[f32; 3]> {
    let attrs = parse_attributes(e)?;

    let x = required_attr(&attrs, "vertex", "x")?.parse::<f32>()?;
    let y = required_attr(&attrs, "vertex", "y")?.parse::<f32>()?;
    let z = required_attr(&attrs, "vertex", "z")?.parse::<f32>()?;

    Ok([x, y, z])
}

/// Resolve a `<triangle v1 v2 v3>` element to 9 flat coordinates.
///
/// Returns `Ok(None)` when an index is missing, non-integer, or out of
/// range for the current mesh.
fn resolve_triangle(
    e: &quick_xml::events::BytesStart,
    vertices: &[[f32; 3]],
) -> Result<Option<[f32; 9]>> {
    let attrs = parse_attributes(e)?;

    let mut coords = [0.0_f32; 9];
    for (slot, key) in ["v1", "v2", "v3"].iter().enumerate() {
        let index = match attrs.get(*key).and_then(|v| v.parse::<usize>().ok()) {
            Some(index) => index,
            None => return Ok(None),
        };
        let Some(vertex) = vertices.get(index) else {
            return Ok(None);
        };
        coords[slot * 3..slot * 3 + 3].copy_from_slice(vertex);
    }

    Ok(Some(coords))
}

fn required_attr<'a>(
    attrs: &'a HashMap<String, String>,
    element: &str,
    key: &str,
) -> Result<&'a String> {
    attrs.get(key).ok_or_else(|| {
        Error::XmlAttr(format!(
            "Element '<{}>' is missing required attribute '{}'",
            element, key
        ))
    })
}

/// Parse attributes from an XML element
fn parse_attributes(e: &quick_xml::events::BytesStart) -> Result<HashMap<String, String>> {
    let mut attrs = HashMap::new();

    for attr in e.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| Error::ParseError(e.to_string()))?;
        let value =
            std::str::from_utf8(&attr.value).map_err(|e| Error::ParseError(e.to_string()))?;

        attrs.insert(local_name(key).to_string(), value.to_string());
    }

    Ok(attrs)
}
