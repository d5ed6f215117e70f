//! Integration tests for model geometry loading

use quickslice::{Error, geometry};
use std::io::{Cursor, Write};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Build a binary STL buffer from flat triangle coordinates.
fn binary_stl(triangles: &[[f32; 9]]) -> Vec<u8> {
    let mut out = vec![0u8; 80];
    out.extend_from_slice(&(triangles.len() as u32).to_le_bytes());
    for triangle in triangles {
        out.extend_from_slice(&[0u8; 12]);
        for coordinate in triangle {
            out.extend_from_slice(&coordinate.to_le_bytes());
        }
        out.extend_from_slice(&0u16.to_le_bytes());
    }
    out
}

/// Build an in-memory 3MF archive around the given model XML.
fn threemf_archive(model_xml: &str, entry_path: &str) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    writer
        .start_file("[Content_Types].xml", options)
        .expect("start content types");
    writer
        .write_all(
            br#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="model" ContentType="application/vnd.ms-package.3dmanufacturing-3dmodel+xml"/>
</Types>"#,
        )
        .expect("write content types");

    writer
        .start_file(entry_path, options)
        .expect("start model entry");
    writer
        .write_all(model_xml.as_bytes())
        .expect("write model entry");

    writer.finish().expect("finish archive").into_inner()
}

const UNIT_TRIANGLE_MODEL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="millimeter" xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02">
  <resources>
    <object id="1" type="model">
      <mesh>
        <vertices>
          <vertex x="0" y="0" z="0"/>
          <vertex x="10" y="0" z="0"/>
          <vertex x="0" y="10" z="0"/>
        </vertices>
        <triangles>
          <triangle v1="0" v2="1" v3="2"/>
        </triangles>
      </mesh>
    </object>
  </resources>
  <build><item objectid="1"/></build>
</model>"#;

#[test]
fn binary_stl_with_two_triangles_parses_to_18_floats() {
    let buffer = binary_stl(&[
        [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 1.0, 1.0],
    ]);
    // 84-byte preamble + 2 * 50-byte facets.
    assert_eq!(buffer.len(), 184);

    let geometry = geometry::load(&buffer, "part.stl").unwrap();
    assert_eq!(geometry.positions().len(), 18);
}

#[test]
fn stl_extension_is_case_insensitive() {
    let buffer = binary_stl(&[[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]]);
    assert!(geometry::load(&buffer, "PART.STL").is_ok());
}

#[test]
fn ascii_stl_parses_by_token_scan() {
    let body = b"solid part\n\
        facet normal 0 0 1\n\
        outer loop\n\
        vertex 0.0 0.0 0.0\n\
        vertex 1.0 0.0 0.0\n\
        vertex 0.0 1.0 0.0\n\
        endloop\n\
        endfacet\n\
        endsolid part\n";
    let geometry = geometry::load(body, "part.stl").unwrap();
    assert_eq!(geometry.triangle_count(), 1);
}

#[test]
fn truncated_binary_stl_is_rejected() {
    let mut buffer = binary_stl(&[[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]]);
    buffer.truncate(100); // length no longer matches the declared count
    assert!(geometry::load(&buffer, "part.stl").is_err());
}

#[test]
fn threemf_standard_layout_loads() {
    let archive = threemf_archive(UNIT_TRIANGLE_MODEL, "3D/3dmodel.model");
    let geometry = geometry::load(&archive, "part.3mf").unwrap();
    assert_eq!(geometry.triangle_count(), 1);
    assert_eq!(geometry.positions()[3], 10.0);
}

#[test]
fn threemf_entry_match_is_case_insensitive() {
    let archive = threemf_archive(UNIT_TRIANGLE_MODEL, "3D/3DModel.model");
    assert!(geometry::load(&archive, "part.3mf").is_ok());
}

#[test]
fn threemf_without_model_entry_is_rejected() {
    let archive = threemf_archive(UNIT_TRIANGLE_MODEL, "3D/other.bin");
    let err = geometry::load(&archive, "part.3mf").unwrap_err();
    assert!(matches!(err, Error::MissingModelEntry(_)));
}

#[test]
fn threemf_with_empty_mesh_is_rejected() {
    let empty = r#"<model><resources><object id="1"><mesh>
        <vertices/><triangles/>
    </mesh></object></resources></model>"#;
    let archive = threemf_archive(empty, "3D/3dmodel.model");
    let err = geometry::load(&archive, "part.3mf").unwrap_err();
    assert!(matches!(err, Error::EmptyMesh(_)));
}

#[test]
fn corrupt_zip_is_rejected() {
    let err = geometry::load(b"PK\x03\x04 definitely not a zip", "part.3mf").unwrap_err();
    assert!(matches!(err, Error::Zip(_)));
}

#[test]
fn unknown_extension_is_rejected() {
    let err = geometry::load(b"anything", "part.step").unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat(_)));
}
