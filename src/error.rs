//! Error types for the quick-order pipeline
//!
//! All errors carry a bracketed error code for categorization:
//!
//! - **E1xxx**: I/O and archive errors
//! - **E2xxx**: Model format errors (STL / 3MF)
//! - **E3xxx**: Orientation and numeric validation errors
//! - **E5xxx**: Slicer infrastructure errors
//!
//! Slicer *execution* failures (non-zero exit, timeout, unparseable
//! toolpath output) are deliberately not represented here. They are
//! recovered inside the orchestrator and degrade to fallback metrics,
//! so they never surface as an [`Error`].

use std::io;
use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while ingesting, orienting, or slicing a model
#[derive(Error, Debug)]
pub enum Error {
    /// IO error occurred while reading or staging a file
    ///
    /// **Error Code**: E1001
    ///
    /// **Common Causes**:
    /// - Temp directory not writable
    /// - Disk full during model staging
    #[error("[E1001] I/O error: {0}")]
    Io(#[from] io::Error),

    /// ZIP archive error
    ///
    /// **Error Code**: E1002
    ///
    /// **Common Causes**:
    /// - Corrupted 3MF container
    /// - Truncated upload
    ///
    /// **Suggestions**:
    /// - Verify the file is a valid 3MF (ZIP) archive
    /// - Ask the customer to re-export the file
    #[error("[E1002] ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// XML parsing error inside a 3MF model entry
    ///
    /// **Error Code**: E2001
    #[error("[E2001] XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The archive contains no 3D model entry
    ///
    /// **Error Code**: E1003
    ///
    /// **Common Causes**:
    /// - Archive is a ZIP but not a 3MF package
    /// - Model entry stored under a non-standard path
    #[error("[E1003] Missing model entry: {0}")]
    MissingModelEntry(String),

    /// Uploaded file extension is not a supported model format
    ///
    /// **Error Code**: E2002
    ///
    /// **Suggestions**:
    /// - Only `.stl` and `.3mf` uploads are sliceable
    #[error("[E2002] Unsupported model format: {0}")]
    UnsupportedFormat(String),

    /// Malformed STL content
    ///
    /// **Error Code**: E2003
    ///
    /// **Common Causes**:
    /// - ASCII STL with no `vertex` lines
    /// - Vertex count not a multiple of three
    /// - Truncated binary facet records
    #[error("[E2003] Invalid STL: {0}")]
    InvalidStl(String),

    /// Parsed model contains no usable triangles
    ///
    /// **Error Code**: E2004
    ///
    /// **Common Causes**:
    /// - 3MF package whose objects carry no `<mesh>` elements
    /// - All triangles referenced out-of-range vertices
    #[error("[E2004] Empty mesh: {0}")]
    EmptyMesh(String),

    /// XML attribute error
    ///
    /// **Error Code**: E2005
    ///
    /// **Common Causes**:
    /// - Missing required attribute
    /// - Duplicate attribute
    #[error("[E2005] XML attribute error: {0}")]
    XmlAttr(String),

    /// Parse error for numeric values
    ///
    /// **Error Code**: E3001
    #[error("[E3001] Parse error: {0}")]
    ParseError(String),

    /// Orientation snapshot failed validation
    ///
    /// **Error Code**: E3002
    ///
    /// **Common Causes**:
    /// - Non-finite quaternion or position component
    /// - Snapshot produced by an out-of-date viewer build
    ///
    /// Rejected before any slicing is attempted.
    #[error("[E3002] Invalid orientation: {0}")]
    InvalidOrientation(String),

    /// Slicer infrastructure failure
    ///
    /// **Error Code**: E5001
    ///
    /// **Common Causes**:
    /// - Temp workspace could not be created
    /// - Model could not be staged to disk
    ///
    /// Indicates environment misconfiguration rather than a bad model;
    /// distinct from slicer execution failures, which degrade to
    /// fallback metrics instead of erroring.
    #[error("[E5001] Slicer infrastructure error: {0}")]
    SlicerInfra(String),
}

impl From<std::num::ParseFloatError> for Error {
    fn from(err: std::num::ParseFloatError) -> Self {
        Error::ParseError(format!("Failed to parse floating-point number: {}", err))
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(err: std::num::ParseIntError) -> Self {
        Error::ParseError(format!("Failed to parse integer: {}", err))
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlAttr(format!("Attribute parsing failed: {}", err))
    }
}

impl Error {
    /// Create an InvalidStl error with context about which check failed
    pub fn invalid_stl(context: &str, message: &str) -> Self {
        Error::InvalidStl(format!("{}: {}", context, message))
    }

    /// Create a SlicerInfra error wrapping a failed filesystem step
    pub fn slicer_infra(step: &str, err: io::Error) -> Self {
        Error::SlicerInfra(format!("{}: {}", step, err))
    }
}
