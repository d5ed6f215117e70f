//! # quickslice
//!
//! Quick-order model ingestion, orientation, and slicing-to-price pipeline.
//!
//! An uploaded 3D model file becomes a validated, priced, print-ready job
//! in four stages:
//!
//! 1. **Geometry loading** — decode STL (binary/ASCII) or 3MF (ZIP + XML)
//!    into a flat triangle-vertex buffer.
//! 2. **Orientation** — optionally apply a client-approved rigid transform
//!    and re-serialize as binary STL.
//! 3. **Slicing** — run the external slicer CLI under a bounded concurrency
//!    pool with timeout, retry, and fallback-metric degradation.
//! 4. **Pricing** — convert print metrics plus a shipping-region lookup
//!    into a deterministic quote.
//!
//! The web layer, persistence, and payment plumbing are external
//! collaborators consumed through simple contracts; they are not part of
//! this crate.
//!
//! ## Example
//!
//! ```no_run
//! use quickslice::{Slicer, SlicerConfig, geometry, slicer::settings::SliceSettings};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let upload = std::fs::read("bracket.stl")?;
//! let model = geometry::load(&upload, "bracket.stl")?;
//! println!("{} triangles", model.triangle_count());
//!
//! let slicer = Slicer::new(SlicerConfig::from_env());
//! let settings: SliceSettings =
//!     serde_json::from_str(r#"{"layerHeightMm": 0.2, "infillPercent": 15}"#)?;
//! let metrics = slicer.slice(&upload, "bracket.stl", &settings).await?;
//! println!("{} g over {} s (fallback: {})", metrics.grams, metrics.time_sec, metrics.fallback);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod config;
pub mod error;
pub mod geometry;
pub mod orientation;
pub mod pricing;
pub mod slicer;

pub use cache::TtlCache;
pub use config::SlicerConfig;
pub use error::{Error, Result};
pub use geometry::ModelGeometry;
pub use orientation::{OrientationSnapshot, OrientedModel};
pub use pricing::{
    DeliveryLocation, ItemPrice, MaterialCatalog, PriceBreakdown, PricingConfig, PricingSettings,
    PricingSettingsCache, QuickOrderItem, QuickOrderPrice,
};
pub use pricing::shipping::{ShippingQuote, ShippingRegion};
pub use slicer::settings::{SliceSettings, SupportPattern, SupportSettings, SupportStyle};
pub use slicer::status::{SliceState, SliceStatus, StatusHandle};
pub use slicer::{SliceMetrics, Slicer};
