//! Shipping-region resolution
//!
//! Regions are an ordered list: the first state match wins, refined by a
//! postcode-prefix match that applies the remote surcharge. Resolution is
//! deterministic for fixed inputs.

use crate::pricing::round2;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A configured shipping region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingRegion {
    /// Short region code, e.g. `NSW`.
    pub code: String,
    /// Customer-facing label.
    pub label: String,
    /// States this region serves; matched case-insensitively, trimmed.
    #[serde(default)]
    pub states: Vec<String>,
    /// Postcode prefixes that mark a destination as remote.
    #[serde(default)]
    pub postcode_prefixes: Vec<String>,
    /// Base shipping amount.
    pub base_amount: f64,
    /// Surcharge added for remote postcodes.
    #[serde(default)]
    pub remote_surcharge: f64,
}

/// A resolved shipping cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingQuote {
    /// Code of the region that matched, or `none`.
    pub code: String,
    /// Label of the region that matched.
    pub label: String,
    /// Rounded total: base plus surcharge when remote.
    pub amount: f64,
    /// Whether the remote surcharge was applied.
    pub remote_applied: bool,
}

impl ShippingQuote {
    /// Zero-cost quote used when no shipping is configured.
    fn none() -> Self {
        Self {
            code: "none".to_string(),
            label: "No shipping configured".to_string(),
            amount: 0.0,
            remote_applied: false,
        }
    }

    fn flat(region: &ShippingRegion) -> Self {
        Self {
            code: region.code.clone(),
            label: region.label.clone(),
            amount: round2(region.base_amount),
            remote_applied: false,
        }
    }

    fn remote(region: &ShippingRegion) -> Self {
        Self {
            code: region.code.clone(),
            label: region.label.clone(),
            amount: round2(region.base_amount + region.remote_surcharge),
            remote_applied: true,
        }
    }
}

/// Resolve a destination against the configured region list.
///
/// Candidates are the regions whose `states` contain the requested state.
/// No candidates falls back to the first configured region without a
/// surcharge; a postcode-prefix match within the candidates narrows to
/// that region and applies its surcharge.
pub fn resolve(
    regions: &[ShippingRegion],
    state: Option<&str>,
    postcode: Option<&str>,
) -> ShippingQuote {
    let Some(default_region) = regions.first() else {
        warn!("no shipping regions configured, quoting zero-cost shipping");
        return ShippingQuote::none();
    };

    let candidates: Vec<&ShippingRegion> = match state {
        Some(state) => {
            let wanted = state.trim();
            regions
                .iter()
                .filter(|region| {
                    region
                        .states
                        .iter()
                        .any(|s| s.trim().eq_ignore_ascii_case(wanted))
                })
                .collect()
        }
        None => Vec::new(),
    };

    if candidates.is_empty() {
        return ShippingQuote::flat(default_region);
    }

    if let Some(postcode) = postcode.map(str::trim).filter(|p| !p.is_empty()) {
        let remote = candidates.iter().find(|region| {
            region
                .postcode_prefixes
                .iter()
                .any(|prefix| postcode.starts_with(prefix.trim()))
        });
        if let Some(region) = remote {
            return ShippingQuote::remote(region);
        }
    }

    ShippingQuote::flat(candidates[0])
}
