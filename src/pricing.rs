//! Quick-order pricing
//!
//! Converts print metrics (mass, time) plus a shipping-region lookup into
//! a deterministic per-item and order-level quote. This computation must
//! match what the customer is ultimately charged, so every derived
//! monetary value is rounded to 2 decimals when it is produced and
//! aggregation never re-rounds intermediates.
//!
//! Edge cases recover with documented safe defaults rather than failing
//! the quote: an unknown material id prices at the configured fallback
//! rate, and a missing shipping configuration yields a zero-cost quote.

pub mod shipping;

use crate::cache::TtlCache;
use crate::slicer::SliceMetrics;
use serde::{Deserialize, Serialize};
use shipping::{ShippingQuote, ShippingRegion};
use tracing::warn;

/// Round to 2 decimals, half away from zero.
///
/// The rounding mode is an assumption pending confirmation against real
/// invoices; `f64::round` rounds half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Material cost source, consumed as a black-box lookup.
pub trait MaterialCatalog {
    /// Cost per gram for a material id, or `None` when unknown.
    fn cost_per_gram(&self, material_id: &str) -> Option<f64>;
}

impl MaterialCatalog for std::collections::HashMap<String, f64> {
    fn cost_per_gram(&self, material_id: &str) -> Option<f64> {
        self.get(material_id).copied()
    }
}

/// Calculator settings, typically served through the TTL settings cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingConfig {
    /// Machine-time rate per hour.
    pub hourly_rate: f64,
    /// Flat per-item setup fee.
    pub setup_fee: f64,
    /// Floor for any single item's unit price.
    pub minimum_price: f64,
    /// Per-gram rate used when a material id is unknown.
    #[serde(default = "default_fallback_rate")]
    pub fallback_cost_per_gram: f64,
    /// Order tax rate passed through to the quote, when configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_rate: Option<f64>,
}

fn default_fallback_rate() -> f64 {
    0.10
}

/// Calculator settings and shipping regions, fetched together from the
/// configuration source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingSettings {
    /// Calculator rates and fees.
    pub config: PricingConfig,
    /// Ordered shipping-region list.
    pub regions: Vec<ShippingRegion>,
}

/// Short-TTL cache of pricing settings, shared across checkout requests
/// so a multi-item order fetches them once.
pub type PricingSettingsCache = TtlCache<PricingSettings>;

/// One priced line of a quick order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickOrderItem {
    /// Uploaded filename.
    pub filename: String,
    /// Material id for cost lookup.
    pub material_id: String,
    /// Layer height the item was sliced with.
    pub layer_height_mm: f64,
    /// Infill density the item was sliced with.
    pub infill_percent: f64,
    /// Units ordered.
    pub quantity: u32,
    /// Print metrics, real or fallback.
    pub metrics: SliceMetrics,
}

/// Delivery destination used for shipping resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryLocation {
    /// Destination state, matched against region state lists.
    #[serde(default)]
    pub state: Option<String>,
    /// Destination postcode, matched against remote prefix lists.
    #[serde(default)]
    pub postcode: Option<String>,
}

/// Cost components behind a unit price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    /// Filament mass priced, grams.
    pub grams: f64,
    /// Machine time priced, hours.
    pub hours: f64,
    /// `grams * cost_per_gram`, rounded.
    pub material_cost: f64,
    /// `hours * hourly_rate`, rounded.
    pub time_cost: f64,
    /// Flat setup fee.
    pub setup_fee: f64,
}

/// A priced item with its quantity-extended total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPrice {
    /// Price per unit, never below the configured minimum.
    pub unit_price: f64,
    /// Units ordered.
    pub quantity: u32,
    /// `round2(unit_price * quantity)`.
    pub total: f64,
    /// True when the underlying metrics were fallback estimates; the
    /// customer-facing quote must read "estimated", not "measured".
    pub estimated: bool,
    /// Cost components.
    pub breakdown: PriceBreakdown,
}

/// A full order quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickOrderPrice {
    /// Per-item prices, in input order.
    pub items: Vec<ItemPrice>,
    /// Rounded sum of item totals.
    pub subtotal: f64,
    /// Resolved shipping quote.
    pub shipping: ShippingQuote,
    /// Tax rate passed through from configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_rate: Option<f64>,
}

/// Price a quick order.
///
/// Pure over its inputs: same items, location, config, and regions always
/// produce the same quote.
pub fn price(
    items: &[QuickOrderItem],
    location: &DeliveryLocation,
    config: &PricingConfig,
    regions: &[ShippingRegion],
    materials: &dyn MaterialCatalog,
) -> QuickOrderPrice {
    let priced: Vec<ItemPrice> = items
        .iter()
        .map(|item| price_item(item, config, materials))
        .collect();

    let subtotal = round2(priced.iter().map(|item| item.total).sum());
    let shipping = shipping::resolve(
        regions,
        location.state.as_deref(),
        location.postcode.as_deref(),
    );

    QuickOrderPrice {
        items: priced,
        subtotal,
        shipping,
        tax_rate: config.tax_rate,
    }
}

fn price_item(
    item: &QuickOrderItem,
    config: &PricingConfig,
    materials: &dyn MaterialCatalog,
) -> ItemPrice {
    let rate = materials
        .cost_per_gram(&item.material_id)
        .unwrap_or_else(|| {
            warn!(
                material_id = %item.material_id,
                fallback = config.fallback_cost_per_gram,
                "unknown material id, pricing at fallback rate"
            );
            config.fallback_cost_per_gram
        });

    let grams = item.metrics.grams;
    let hours = item.metrics.time_sec as f64 / 3_600.0;

    let material_cost = round2(grams * rate);
    let time_cost = round2(hours * config.hourly_rate);
    let base = round2(material_cost + time_cost + config.setup_fee);
    let unit_price = base.max(config.minimum_price);
    let total = round2(unit_price * item.quantity as f64);

    ItemPrice {
        unit_price,
        quantity: item.quantity,
        total,
        estimated: item.metrics.fallback,
        breakdown: PriceBreakdown {
            grams,
            hours,
            material_cost,
            time_cost,
            setup_fee: config.setup_fee,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn metrics(grams: f64, time_sec: u64) -> SliceMetrics {
        SliceMetrics {
            time_sec,
            grams,
            support_grams: 0.0,
            gcode_path: None,
            fallback: false,
            error: None,
        }
    }

    fn item(grams: f64, time_sec: u64, quantity: u32) -> QuickOrderItem {
        QuickOrderItem {
            filename: "part.stl".to_string(),
            material_id: "pla".to_string(),
            layer_height_mm: 0.2,
            infill_percent: 15.0,
            quantity,
            metrics: metrics(grams, time_sec),
        }
    }

    fn config() -> PricingConfig {
        PricingConfig {
            hourly_rate: 45.0,
            setup_fee: 20.0,
            minimum_price: 35.0,
            fallback_cost_per_gram: 0.10,
            tax_rate: None,
        }
    }

    fn catalog() -> HashMap<String, f64> {
        HashMap::from([("pla".to_string(), 0.05)])
    }

    #[test]
    fn test_round2_half_away_from_zero() {
        // 0.125 is exactly representable, so the half really is a half.
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(-0.125), -0.13);
        assert_eq!(round2(2.344), 2.34);
        assert_eq!(round2(2.346), 2.35);
    }

    #[test]
    fn test_item_price_above_minimum() {
        // 100g * 0.05 + 1h * 45 + 20 setup = 70, above the 35 floor.
        let quote = price(
            &[item(100.0, 3_600, 2)],
            &DeliveryLocation::default(),
            &config(),
            &[],
            &catalog(),
        );

        let line = &quote.items[0];
        assert_eq!(line.unit_price, 70.0);
        assert_eq!(line.total, 140.0);
        assert_eq!(line.breakdown.material_cost, 5.0);
        assert_eq!(line.breakdown.time_cost, 45.0);
        assert_eq!(quote.subtotal, 140.0);
    }

    #[test]
    fn test_minimum_price_floor() {
        // 1g, 36 seconds: base well below the floor.
        let quote = price(
            &[item(1.0, 36, 1)],
            &DeliveryLocation::default(),
            &config(),
            &[],
            &catalog(),
        );
        assert_eq!(quote.items[0].unit_price, 35.0);
    }

    #[test]
    fn test_unknown_material_uses_fallback_rate() {
        let mut order_item = item(100.0, 0, 1);
        order_item.material_id = "unobtainium".to_string();

        let quote = price(
            &[order_item],
            &DeliveryLocation::default(),
            &config(),
            &[],
            &catalog(),
        );
        assert_eq!(quote.items[0].breakdown.material_cost, 10.0);
    }

    #[test]
    fn test_fallback_metrics_flow_through_as_estimated() {
        let mut order_item = item(0.0, 0, 1);
        order_item.metrics = SliceMetrics::fallback(None);

        let quote = price(
            &[order_item],
            &DeliveryLocation::default(),
            &config(),
            &[],
            &catalog(),
        );

        let line = &quote.items[0];
        assert!(line.estimated);
        // 80g * 0.05 + 1h * 45 + 20 = 69: internally consistent with the
        // fallback numbers.
        assert_eq!(line.unit_price, 69.0);
    }

    #[test]
    fn test_subtotal_sums_item_totals() {
        let quote = price(
            &[item(100.0, 3_600, 2), item(1.0, 36, 1)],
            &DeliveryLocation::default(),
            &config(),
            &[],
            &catalog(),
        );
        assert_eq!(quote.subtotal, 175.0);
    }

    #[test]
    fn test_settings_cache_serves_multi_item_order() {
        let cache = PricingSettingsCache::default();
        let mut fetches = 0;

        for _ in 0..3 {
            let settings = cache.get_or_refresh(|| {
                fetches += 1;
                PricingSettings {
                    config: config(),
                    regions: Vec::new(),
                }
            });
            let quote = price(
                &[item(100.0, 3_600, 1)],
                &DeliveryLocation::default(),
                &settings.config,
                &settings.regions,
                &catalog(),
            );
            assert_eq!(quote.items[0].unit_price, 70.0);
        }
        assert_eq!(fetches, 1);
    }

    #[test]
    fn test_missing_shipping_config_zero_quote() {
        let quote = price(
            &[item(100.0, 3_600, 1)],
            &DeliveryLocation::default(),
            &config(),
            &[],
            &catalog(),
        );
        assert_eq!(quote.shipping.amount, 0.0);
        assert_eq!(quote.shipping.code, "none");
    }
}
