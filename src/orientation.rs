//! Client-approved orientation handling
//!
//! The viewer submits one [`OrientationSnapshot`] per uploaded file. Before
//! slicing, the snapshot's rigid transform is applied to the geometry and
//! the result re-serialized as binary STL. This is an on-demand projection:
//! the stored original upload is never mutated.

use crate::error::{Error, Result};
use crate::geometry::{ModelGeometry, stl};
use nalgebra::{Isometry3, Point3, Quaternion, Translation3, UnitQuaternion};
use serde::{Deserialize, Serialize};

/// Quaternions below this magnitude snap to identity, mirroring the
/// client-side viewer's normalization.
const DEGENERATE_EPSILON: f64 = 1e-4;

/// Content type of the oriented STL projection.
pub const STL_CONTENT_TYPE: &str = "model/stl";

/// A client-approved orientation for an uploaded model.
///
/// Created by the viewer, submitted once per file, immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrientationSnapshot {
    /// Rotation as `[x, y, z, w]`.
    pub quaternion: [f64; 4],
    /// Translation as `[x, y, z]`.
    pub position: [f64; 3],
    /// Whether the viewer's auto-orient pass produced this snapshot.
    #[serde(default)]
    pub auto_oriented: bool,
    /// Support volume estimated by the viewer, mm^3.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_volume: Option<f64>,
    /// Support weight estimated by the viewer, grams.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_weight: Option<f64>,
}

impl OrientationSnapshot {
    /// Validate that every numeric component is finite.
    ///
    /// A degenerate (near-zero) quaternion is not a validation failure; it
    /// snaps to identity during normalization instead.
    pub fn validate(&self) -> Result<()> {
        let finite = self.quaternion.iter().all(|v| v.is_finite())
            && self.position.iter().all(|v| v.is_finite())
            && self.support_volume.is_none_or(f64::is_finite)
            && self.support_weight.is_none_or(f64::is_finite);

        if !finite {
            return Err(Error::InvalidOrientation(
                "non-finite quaternion or position component".to_string(),
            ));
        }
        Ok(())
    }

    /// Normalized rotation, snapping degenerate quaternions to identity.
    pub fn unit_quaternion(&self) -> UnitQuaternion<f64> {
        let [x, y, z, w] = self.quaternion;
        let quaternion = Quaternion::new(w, x, y, z);
        if quaternion.norm() < DEGENERATE_EPSILON {
            return UnitQuaternion::identity();
        }
        UnitQuaternion::new_normalize(quaternion)
    }

    /// Rigid-body transform built from the quaternion and translation.
    pub fn isometry(&self) -> Isometry3<f64> {
        let [x, y, z] = self.position;
        Isometry3::from_parts(Translation3::new(x, y, z), self.unit_quaternion())
    }
}

/// A derived, oriented copy of an uploaded model, ready for slicing.
#[derive(Debug, Clone)]
pub struct OrientedModel {
    /// Binary STL bytes of the transformed mesh.
    pub buffer: Vec<u8>,
    /// Derived filename, `<original stem>-oriented.stl`.
    pub filename: String,
    /// MIME type of the buffer.
    pub content_type: &'static str,
}

/// Apply an approved orientation to a geometry and re-serialize it as
/// binary STL.
///
/// Rotation then translation, no scaling. This step is optional per item;
/// unoriented items are sliced in their as-uploaded orientation.
pub fn apply(
    geometry: &ModelGeometry,
    orientation: &OrientationSnapshot,
    filename: &str,
) -> Result<OrientedModel> {
    orientation.validate()?;

    let transform = orientation.isometry();
    let mut transformed = Vec::with_capacity(geometry.positions().len());
    for vertex in geometry.positions().chunks_exact(3) {
        let point = Point3::new(vertex[0] as f64, vertex[1] as f64, vertex[2] as f64);
        let moved = transform * point;
        transformed.push(moved.x as f32);
        transformed.push(moved.y as f32);
        transformed.push(moved.z as f32);
    }

    let oriented = ModelGeometry::from_vertices(transformed)?;
    Ok(OrientedModel {
        buffer: stl::write_binary(&oriented),
        filename: oriented_filename(filename),
        content_type: STL_CONTENT_TYPE,
    })
}

fn oriented_filename(filename: &str) -> String {
    let stem = filename
        .rsplit_once('.')
        .map_or(filename, |(stem, _)| stem);
    format!("{}-oriented.stl", stem)
}
