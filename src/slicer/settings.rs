//! Print settings accepted from the quick-order client
//!
//! Values arrive from the browser and are normalized before reaching the
//! slicer command line: the support angle is clamped to 1..=89 degrees,
//! interface layers to 1..=6, and the support style defaults from the
//! pattern when the client leaves it unset.

use serde::{Deserialize, Serialize};

/// Default support overhang threshold in degrees.
pub const DEFAULT_SUPPORT_ANGLE: f64 = 45.0;
/// Default support interface layer count.
pub const DEFAULT_INTERFACE_LAYERS: u32 = 3;

/// Per-item slicing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceSettings {
    /// Layer height in millimeters.
    pub layer_height_mm: f64,
    /// Infill density in percent.
    pub infill_percent: f64,
    /// Support material configuration.
    #[serde(default)]
    pub supports: SupportSettings,
}

impl SliceSettings {
    /// Return a copy with every bounded field clamped and the support
    /// style resolved.
    pub fn normalized(&self) -> Self {
        Self {
            layer_height_mm: self.layer_height_mm,
            infill_percent: self.infill_percent,
            supports: self.supports.normalized(),
        }
    }
}

/// Support material options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportSettings {
    /// Whether supports are generated at all.
    #[serde(default)]
    pub enabled: bool,
    /// Overhang angle threshold in degrees, clamped to 1..=89.
    #[serde(default = "default_angle")]
    pub angle_deg: f64,
    /// Support generation pattern.
    #[serde(default)]
    pub pattern: SupportPattern,
    /// Support style; defaults from the pattern when unset.
    #[serde(default)]
    pub style: Option<SupportStyle>,
    /// Interface layers between support and part, clamped to 1..=6.
    #[serde(default = "default_interface_layers")]
    pub interface_layers: u32,
}

fn default_angle() -> f64 {
    DEFAULT_SUPPORT_ANGLE
}

fn default_interface_layers() -> u32 {
    DEFAULT_INTERFACE_LAYERS
}

impl Default for SupportSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            angle_deg: DEFAULT_SUPPORT_ANGLE,
            pattern: SupportPattern::Normal,
            style: None,
            interface_layers: DEFAULT_INTERFACE_LAYERS,
        }
    }
}

impl SupportSettings {
    /// Clamp bounded fields and resolve the style from the pattern.
    pub fn normalized(&self) -> Self {
        Self {
            enabled: self.enabled,
            angle_deg: self.angle_deg.clamp(1.0, 89.0),
            pattern: self.pattern,
            style: Some(self.resolved_style()),
            interface_layers: self.interface_layers.clamp(1, 6),
        }
    }

    /// The effective style: explicit if set, otherwise `Organic` for tree
    /// supports and `Grid` for everything else.
    pub fn resolved_style(&self) -> SupportStyle {
        self.style.unwrap_or(match self.pattern {
            SupportPattern::Tree => SupportStyle::Organic,
            SupportPattern::Normal => SupportStyle::Grid,
        })
    }
}

/// Support generation pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportPattern {
    /// Conventional straight-down supports.
    #[default]
    Normal,
    /// Tree supports.
    Tree,
}

/// Support style passed to the slicer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportStyle {
    /// Grid-style support structure.
    Grid,
    /// Organic (tree-like) support structure.
    Organic,
}

impl SupportStyle {
    /// Flag value for `--support-material-style`.
    pub fn as_flag(&self) -> &'static str {
        match self {
            SupportStyle::Grid => "grid",
            SupportStyle::Organic => "organic",
        }
    }
}
