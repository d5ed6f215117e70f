//! Model geometry loading
//!
//! Decodes an uploaded model file (binary/ASCII STL or 3MF) into a flat
//! triangle-vertex buffer suitable for transformation and re-serialization.
//! Parsing is pure: no side effects, no filesystem access.

pub mod stl;
pub mod threemf;

use crate::error::{Error, Result};

/// An immutable flat buffer of triangle vertex positions.
///
/// Layout is 3 floats per vertex, 3 vertices per triangle, so the buffer
/// length is always a multiple of 9. All values are finite; both invariants
/// are enforced at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelGeometry {
    vertices: Vec<f32>,
}

impl ModelGeometry {
    /// Build a geometry from a flat vertex buffer, validating invariants.
    pub fn from_vertices(vertices: Vec<f32>) -> Result<Self> {
        if vertices.is_empty() {
            return Err(Error::EmptyMesh("no mesh data".to_string()));
        }
        if vertices.len() % 9 != 0 {
            return Err(Error::InvalidStl(format!(
                "vertex buffer length {} is not a multiple of 9",
                vertices.len()
            )));
        }
        if let Some(bad) = vertices.iter().find(|v| !v.is_finite()) {
            return Err(Error::ParseError(format!(
                "non-finite vertex coordinate: {}",
                bad
            )));
        }
        Ok(Self { vertices })
    }

    /// Flat vertex positions, 9 floats per triangle.
    pub fn positions(&self) -> &[f32] {
        &self.vertices
    }

    /// Number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 9
    }

    /// Number of vertices in the mesh (3 per triangle, not deduplicated).
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Axis-aligned bounding box as `(min, max)` corners.
    pub fn bounds(&self) -> ([f32; 3], [f32; 3]) {
        let mut min = [f32::MAX; 3];
        let mut max = [f32::MIN; 3];
        for chunk in self.vertices.chunks_exact(3) {
            for axis in 0..3 {
                min[axis] = min[axis].min(chunk[axis]);
                max[axis] = max[axis].max(chunk[axis]);
            }
        }
        (min, max)
    }
}

/// Decode an uploaded model file into a [`ModelGeometry`].
///
/// Dispatches on the file extension: `.stl` (binary or ASCII, detected by
/// the exact-length check) and `.3mf` (ZIP + XML) are supported. Any other
/// extension is rejected as [`Error::UnsupportedFormat`].
pub fn load(buffer: &[u8], filename: &str) -> Result<ModelGeometry> {
    match extension(filename) {
        Some(ext) if ext.eq_ignore_ascii_case("stl") => stl::parse(buffer),
        Some(ext) if ext.eq_ignore_ascii_case("3mf") => threemf::parse(buffer),
        _ => Err(Error::UnsupportedFormat(filename.to_string())),
    }
}

fn extension(filename: &str) -> Option<&str> {
    filename.rsplit_once('.').map(|(_, ext)| ext)
}
