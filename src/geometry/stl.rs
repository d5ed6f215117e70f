//! STL decoding and encoding
//!
//! Binary STL layout:
//!
//! | bytes  | description                          |
//! |--------|--------------------------------------|
//! | 0-79   | header (ignored)                     |
//! | 80-83  | facet count, little-endian u32       |
//! | 84-    | 50-byte facet records                |
//!
//! Each facet record is a 12-byte normal, three 12-byte vertices, and a
//! 2-byte attribute count. A buffer is treated as binary iff its length is
//! exactly `84 + 50 * facet_count`; anything else falls through to the
//! ASCII tokenizer.

use crate::error::{Error, Result};
use crate::geometry::ModelGeometry;

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

/// Parse an STL buffer, auto-detecting binary vs ASCII.
pub fn parse(buffer: &[u8]) -> Result<ModelGeometry> {
    if let Some(facet_count) = binary_facet_count(buffer) {
        parse_binary(buffer, facet_count)
    } else {
        parse_ascii(buffer)
    }
}

/// Binary detection: exact-length check against the declared facet count.
///
/// Returns the facet count iff `len >= 84` and `len == 84 + 50 * count`.
fn binary_facet_count(buffer: &[u8]) -> Option<usize> {
    if buffer.len() < HEADER_LEN + 4 {
        return None;
    }
    let count = u32::from_le_bytes([buffer[80], buffer[81], buffer[82], buffer[83]]) as usize;
    let expected = (HEADER_LEN + 4).checked_add(count.checked_mul(FACET_LEN)?)?;
    (buffer.len() == expected).then_some(count)
}

fn parse_binary(buffer: &[u8], facet_count: usize) -> Result<ModelGeometry> {
    let mut vertices = Vec::with_capacity(facet_count * 9);
    let mut offset = HEADER_LEN + 4;

    for _ in 0..facet_count {
        // Skip the 12-byte facet normal; it is recomputed on write.
        offset += 12;
        for _ in 0..3 {
            for axis in 0..3 {
                let start = offset + axis * 4;
                let raw = [
                    buffer[start],
                    buffer[start + 1],
                    buffer[start + 2],
                    buffer[start + 3],
                ];
                vertices.push(f32::from_le_bytes(raw));
            }
            offset += 12;
        }
        offset += 2; // attribute byte count
    }

    ModelGeometry::from_vertices(vertices)
}

/// Token scan for `vertex x y z` triplets in an ASCII STL body.
fn parse_ascii(buffer: &[u8]) -> Result<ModelGeometry> {
    let text = std::str::from_utf8(buffer)
        .map_err(|e| Error::invalid_stl("ASCII STL", &format!("not valid UTF-8: {}", e)))?;

    let mut vertices = Vec::new();
    for line in text.lines() {
        let mut tokens = line.split_whitespace();
        if tokens.next() != Some("vertex") {
            continue;
        }
        for _ in 0..3 {
            let token = tokens.next().ok_or_else(|| {
                Error::invalid_stl("ASCII STL", "vertex line with fewer than 3 coordinates")
            })?;
            vertices.push(token.parse::<f32>()?);
        }
    }

    if vertices.is_empty() {
        return Err(Error::invalid_stl("ASCII STL", "no vertex data found"));
    }
    if vertices.len() % 9 != 0 {
        return Err(Error::invalid_stl(
            "ASCII STL",
            &format!("{} coordinates do not form whole triangles", vertices.len()),
        ));
    }

    ModelGeometry::from_vertices(vertices)
}

/// Serialize a geometry as binary STL.
///
/// Facet normals are recomputed from the triangle winding; the attribute
/// byte count is written as zero.
pub fn write_binary(geometry: &ModelGeometry) -> Vec<u8> {
    let triangle_count = geometry.triangle_count();
    let mut out = Vec::with_capacity(HEADER_LEN + 4 + triangle_count * FACET_LEN);

    let mut header = [0u8; HEADER_LEN];
    let tag = b"quickslice oriented export";
    header[..tag.len()].copy_from_slice(tag);
    out.extend_from_slice(&header);
    out.extend_from_slice(&(triangle_count as u32).to_le_bytes());

    for triangle in geometry.positions().chunks_exact(9) {
        let normal = facet_normal(triangle);
        for component in normal {
            out.extend_from_slice(&component.to_le_bytes());
        }
        for coordinate in triangle {
            out.extend_from_slice(&coordinate.to_le_bytes());
        }
        out.extend_from_slice(&0u16.to_le_bytes());
    }

    out
}

/// Unit normal of a triangle given as 9 flat coordinates.
///
/// Degenerate triangles (zero-area) get a zero normal, which binary STL
/// consumers treat as "derive from winding".
fn facet_normal(triangle: &[f32]) -> [f32; 3] {
    let ux = triangle[3] - triangle[0];
    let uy = triangle[4] - triangle[1];
    let uz = triangle[5] - triangle[2];
    let vx = triangle[6] - triangle[0];
    let vy = triangle[7] - triangle[1];
    let vz = triangle[8] - triangle[2];

    let nx = uy * vz - uz * vy;
    let ny = uz * vx - ux * vz;
    let nz = ux * vy - uy * vx;

    let magnitude = (nx * nx + ny * ny + nz * nz).sqrt();
    if magnitude < f32::EPSILON {
        return [0.0, 0.0, 0.0];
    }
    [nx / magnitude, ny / magnitude, nz / magnitude]
}
